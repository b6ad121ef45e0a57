use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};
use reqwest::blocking::Client;
use serde_json::json;
use tempfile::NamedTempFile;

use crate::io::non_empty_file;

pub const ELEVENLABS_URL: &str = "https://api.elevenlabs.io/v1/text-to-speech";
pub const ELEVENLABS_MODEL: &str = "eleven_multilingual_v2";
pub const EDGE_VOICE: &str = "en-GB-RyanNeural";

pub trait SpeechSynthesizer {
    fn name(&self) -> &str;
    /// Write spoken `text` as MP3 to `output`.
    fn speak(&self, text: &str, output: &Path) -> Result<()>;
}

pub struct ElevenLabsSpeech {
    client: Client,
    api_key: String,
    voice_id: String,
}

impl ElevenLabsSpeech {
    pub fn new(api_key: &str, voice_id: &str) -> Result<ElevenLabsSpeech> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .context("Failed to build ElevenLabs HTTP client")?;
        Ok(ElevenLabsSpeech {
            client,
            api_key: api_key.to_string(),
            voice_id: voice_id.to_string(),
        })
    }
}

impl SpeechSynthesizer for ElevenLabsSpeech {
    fn name(&self) -> &str {
        "ElevenLabs"
    }

    fn speak(&self, text: &str, output: &Path) -> Result<()> {
        let url = format!("{}/{}", ELEVENLABS_URL, self.voice_id);
        let response = self
            .client
            .post(&url)
            .query(&[("output_format", "mp3_44100_128")])
            .header("xi-api-key", self.api_key.as_str())
            .json(&json!({ "text": text, "model_id": ELEVENLABS_MODEL }))
            .send()
            .context("ElevenLabs request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(anyhow::anyhow!("ElevenLabs returned HTTP {}: {}", status.as_u16(), body));
        }

        let audio = response.bytes().context("Failed to read ElevenLabs audio")?;
        fs::write(output, &audio).with_context(|| format!("Failed to write {}", output.display()))
    }
}

/// The `edge-tts` command line tool.
pub struct EdgeTtsSpeech {
    pub voice: String,
}

impl Default for EdgeTtsSpeech {
    fn default() -> Self {
        EdgeTtsSpeech {
            voice: EDGE_VOICE.to_string(),
        }
    }
}

impl SpeechSynthesizer for EdgeTtsSpeech {
    fn name(&self) -> &str {
        "edge-tts"
    }

    fn speak(&self, text: &str, output: &Path) -> Result<()> {
        // long narration does not fit on a command line
        let mut script = NamedTempFile::new().context("Failed to create narration script file")?;
        script
            .write_all(text.as_bytes())
            .context("Failed to write narration script file")?;

        let result = Command::new("edge-tts")
            .args(["--voice", &self.voice])
            .arg("--file")
            .arg(script.path())
            .arg("--write-media")
            .arg(output)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .context("Failed to run edge-tts")?;

        if !result.status.success() {
            return Err(anyhow::anyhow!(
                "edge-tts failed: {}",
                String::from_utf8_lossy(&result.stderr).trim()
            ));
        }
        Ok(())
    }
}

/// Providers in order of preference. The first one that leaves a non-empty
/// audio file wins.
pub struct SpeechChain {
    providers: Vec<Box<dyn SpeechSynthesizer>>,
}

impl SpeechChain {
    pub fn new(providers: Vec<Box<dyn SpeechSynthesizer>>) -> SpeechChain {
        SpeechChain { providers }
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Name of the provider that produced `output`.
    pub fn speak(&self, text: &str, output: &Path) -> Result<String> {
        let mut failures = Vec::new();

        for provider in &self.providers {
            if output.exists() {
                fs::remove_file(output)
                    .with_context(|| format!("Failed to remove stale {}", output.display()))?;
            }
            info!("Synthesizing speech with {}", provider.name());

            let attempt = provider.speak(text, output).and_then(|()| {
                if non_empty_file(output) {
                    Ok(())
                } else {
                    Err(anyhow::anyhow!("no audio was written"))
                }
            });
            match attempt {
                Ok(()) => return Ok(provider.name().to_string()),
                Err(e) => {
                    warn!("{} failed: {:#}", provider.name(), e);
                    failures.push(format!("{}: {:#}", provider.name(), e));
                }
            }
        }

        if failures.is_empty() {
            return Err(anyhow::anyhow!("No speech provider configured"));
        }
        Err(anyhow::anyhow!("Speech synthesis failed ({})", failures.join("; ")))
    }
}
