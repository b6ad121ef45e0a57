use std::path::PathBuf;

use clap::Args;

pub const SCORE_JSON: &str = "score_data.json";
pub const MODEL_OUTPUTS_JSON: &str = "model_outputs.json";
pub const TIMELINE_JSON: &str = "timeline_for_llm.json";
pub const PROMPT_TXT: &str = "commentary_prompt.txt";
pub const COMMENTARY_RAW_TXT: &str = "commentary_raw.txt";
pub const COMMENTARY_FINAL_TXT: &str = "commentary_final.txt";
pub const COMMENTARY_AUDIO: &str = "commentary_output.mp3";
pub const FINAL_VIDEO: &str = "final_output.mp4";
pub const LATENCY_REPORT_JSON: &str = "latency_report.json";

/// Fixed sampling and layout of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Frames extracted per second of video.
    pub frame_rate: f64,
    /// Seconds per extracted clip.
    pub clip_length: f64,
    /// OCR and frame inference look at every Nth extracted frame.
    pub frame_subsample: usize,
    pub work_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            frame_rate: 1.0,
            clip_length: 6.0,
            frame_subsample: 4,
            work_dir: PathBuf::from("."),
        }
    }
}

impl PipelineConfig {
    pub fn frames_dir(&self) -> PathBuf {
        self.work_dir.join("frames")
    }

    pub fn clips_dir(&self) -> PathBuf {
        self.work_dir.join("clips")
    }

    pub fn artifact(&self, name: &str) -> PathBuf {
        self.work_dir.join(name)
    }
}

/// OpenAI-compatible chat endpoint used for commentary, summaries and questions.
#[derive(Args, Debug, Clone)]
pub struct LlmArgs {
    #[arg(long, env = "JINA_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    #[arg(long, env = "LLM_BASE_URL", default_value = "https://deepsearch.jina.ai/v1")]
    pub llm_base_url: String,

    #[arg(long, env = "LLM_MODEL", default_value = "jina-deepsearch-v1")]
    pub llm_model: String,
}

/// Keys and endpoints of the other hosted services.
#[derive(Args, Debug, Clone)]
pub struct ServiceArgs {
    #[arg(long, env = "OCRSPACE_API_KEY", hide_env_values = true)]
    pub ocrspace_api_key: Option<String>,

    #[arg(long, env = "ELEVENLABS_API_KEY", hide_env_values = true)]
    pub elevenlabs_api_key: Option<String>,

    #[arg(long, env = "ELEVENLABS_VOICE_ID", default_value = "JBFqnCBsd6RMkjVDRZzb")]
    pub elevenlabs_voice_id: String,

    /// Base URL of the vision model inference sidecar
    #[arg(long, env = "INFERENCE_URL", default_value = "http://127.0.0.1:8000")]
    pub inference_url: String,
}

/// Treat blank secrets from `.env` files as missing.
pub fn present(secret: &Option<String>) -> Option<&str> {
    secret.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_paths() {
        let config = PipelineConfig {
            work_dir: PathBuf::from("/tmp/run"),
            ..PipelineConfig::default()
        };
        assert_eq!(config.frames_dir(), PathBuf::from("/tmp/run/frames"));
        assert_eq!(
            config.artifact(TIMELINE_JSON),
            PathBuf::from("/tmp/run/timeline_for_llm.json")
        );
        assert_eq!(config.frame_subsample, 4);
    }

    #[test]
    fn test_present() {
        assert_eq!(present(&None), None);
        assert_eq!(present(&Some("  ".to_string())), None);
        assert_eq!(present(&Some(" key ".to_string())), Some("key"));
    }
}
