use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use cricket_timeline::ScoreReading;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageOutputFormat};
use log::{debug, info, warn};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::video::frame_end_time_from_path;

pub const OCR_SPACE_URL: &str = "https://api.ocr.space/parse/image";

// Bottom strip holding the broadcast score ticker
pub const CROP_TOP_RATIO: f64 = 0.83;
pub const CROP_BOTTOM_RATIO: f64 = 0.96;
/// Frames earlier than this show a full-screen intro card, so they are read uncropped.
pub const INTRO_SECONDS: f64 = 40.0;
pub const MAX_OCR_WIDTH: u32 = 1200;
const CONTRAST: f32 = 67.0;
const SHARPEN_SIGMA: f32 = 1.0;
const JPEG_QUALITY: u8 = 90;

/// Reads the raw text of a frame's scoreboard.
pub trait ScoreReader {
    fn read_text(&self, frame: &Path, crop: bool) -> Result<String>;

    /// Pause between consecutive frames.
    fn pacing(&self) -> Duration {
        Duration::ZERO
    }
}

/// Load a frame and make its scoreboard easy to read: optional crop to the
/// ticker strip, grayscale, more contrast, sharpen, at most 1200 px wide.
pub fn prepare_scoreboard_image(frame: &Path, crop: bool) -> Result<DynamicImage> {
    let mut img = image::open(frame)
        .with_context(|| format!("Failed to open frame {}", frame.display()))?;

    if crop {
        let (width, height) = img.dimensions();
        let top = (height as f64 * CROP_TOP_RATIO) as u32;
        let bottom = (height as f64 * CROP_BOTTOM_RATIO) as u32;
        img = img.crop_imm(0, top, width, bottom.saturating_sub(top).max(1));
    }

    let img = img
        .grayscale()
        .adjust_contrast(CONTRAST)
        .unsharpen(SHARPEN_SIGMA, 1);

    let (width, height) = img.dimensions();
    if width > MAX_OCR_WIDTH {
        let scaled_height = ((height as f64) * MAX_OCR_WIDTH as f64 / width as f64) as u32;
        return Ok(img.resize_exact(MAX_OCR_WIDTH, scaled_height.max(1), FilterType::Lanczos3));
    }
    Ok(img)
}

pub fn encode_jpeg_base64(img: &DynamicImage) -> Result<String> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Jpeg(JPEG_QUALITY))
        .context("Failed to encode frame as JPEG")?;
    Ok(general_purpose::STANDARD.encode(bytes))
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase")]
struct OcrSpaceResponse {
    #[serde(default)]
    parsed_results: Vec<ParsedResult>,
    #[serde(default)]
    is_errored_on_processing: bool,
    #[serde(default)]
    error_message: Option<serde_json::Value>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase")]
struct ParsedResult {
    #[serde(default)]
    parsed_text: String,
}

fn text_from_response(response: &OcrSpaceResponse) -> Result<String> {
    if response.is_errored_on_processing {
        let message = match &response.error_message {
            Some(serde_json::Value::Array(messages)) => messages
                .iter()
                .map(|m| m.as_str().map(str::to_string).unwrap_or_else(|| m.to_string()))
                .collect::<Vec<_>>()
                .join("; "),
            Some(serde_json::Value::String(message)) => message.clone(),
            Some(other) => other.to_string(),
            None => "unknown error".to_string(),
        };
        return Err(anyhow::anyhow!("OCR.Space could not process the image: {}", message));
    }
    Ok(response
        .parsed_results
        .iter()
        .map(|result| result.parsed_text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string())
}

/// OCR.Space hosted OCR, one request per frame with retry on transient failures.
pub struct OcrSpaceReader {
    client: Client,
    api_key: String,
    url: String,
    retry: RetryPolicy,
    pacing: Duration,
}

impl OcrSpaceReader {
    pub fn new(api_key: &str) -> Result<OcrSpaceReader> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to build OCR HTTP client")?;
        Ok(OcrSpaceReader {
            client,
            api_key: api_key.to_string(),
            url: OCR_SPACE_URL.to_string(),
            retry: RetryPolicy::default(),
            pacing: Duration::from_millis(1500),
        })
    }

    fn key_hint(&self) -> String {
        self.api_key.chars().take(4).collect()
    }

    fn request(&self, base64_image: &str) -> Result<String> {
        let image_field = format!("data:image/jpeg;base64,{}", base64_image);
        let mut backoff = self.retry.initial_backoff;

        for attempt in 1..=self.retry.max_attempts {
            let last = attempt == self.retry.max_attempts;
            let form = [
                ("apikey", self.api_key.as_str()),
                ("language", "eng"),
                ("base64Image", image_field.as_str()),
                ("isOverlayRequired", "false"),
                ("OCREngine", "2"),
                ("scale", "true"),
                ("detectOrientation", "true"),
            ];

            let response = match self.client.post(&self.url).form(&form).send() {
                Ok(response) => response,
                Err(e) if !last => {
                    debug!("OCR request attempt {} failed: {}", attempt, e);
                    thread::sleep(backoff);
                    backoff *= 2;
                    continue;
                }
                Err(e) => return Err(e).context("OCR request failed"),
            };

            let status = response.status();
            if status == StatusCode::FORBIDDEN {
                return Err(anyhow::anyhow!("Rate limit (403) for key {}...", self.key_hint()));
            }
            if !status.is_success() {
                let body = response.text().unwrap_or_default();
                if last {
                    return Err(anyhow::anyhow!("HTTP {}: {}", status.as_u16(), body));
                }
                debug!("OCR attempt {} got HTTP {}, retrying", attempt, status.as_u16());
                thread::sleep(backoff);
                backoff *= 2;
                continue;
            }

            let parsed: OcrSpaceResponse = response
                .json()
                .context("Invalid JSON response from OCR.Space")?;
            return text_from_response(&parsed);
        }

        Err(anyhow::anyhow!("Max retries exceeded"))
    }
}

impl ScoreReader for OcrSpaceReader {
    fn read_text(&self, frame: &Path, crop: bool) -> Result<String> {
        let img = prepare_scoreboard_image(frame, crop)?;
        let encoded = encode_jpeg_base64(&img)?;
        self.request(&encoded)
    }

    fn pacing(&self) -> Duration {
        self.pacing
    }
}

/// Local `tesseract` binary.
pub struct TesseractReader {
    pub psm: Option<String>,
}

impl TesseractReader {
    pub fn new() -> TesseractReader {
        // a single uniform block of text suits the ticker strip
        TesseractReader {
            psm: Some("6".to_string()),
        }
    }
}

pub fn run_tesseract_ocr(image_path: &Path, output_base: &Path, psm: Option<&str>) -> Result<String> {
    let mut cmd = Command::new("tesseract");
    cmd.arg(image_path).arg(output_base);
    if let Some(psm_value) = psm {
        cmd.args(["--psm", psm_value]);
    }

    let output = cmd
        .stderr(Stdio::piped())
        .stdout(Stdio::piped())
        .output()
        .context("Failed to run tesseract")?;

    if !output.status.success() {
        let error_message = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow::anyhow!("Tesseract OCR failed: {}", error_message));
    }

    let out_txt_path = output_base.with_extension("txt");
    fs::read_to_string(&out_txt_path)
        .with_context(|| format!("Failed to read OCR output file: {}", out_txt_path.display()))
}

impl ScoreReader for TesseractReader {
    fn read_text(&self, frame: &Path, crop: bool) -> Result<String> {
        let img = prepare_scoreboard_image(frame, crop)?;
        let scratch = tempfile::tempdir().context("Failed to create OCR scratch directory")?;
        let png = scratch.path().join("scoreboard.png");
        img.save(&png)
            .with_context(|| format!("Failed to write {}", png.display()))?;
        run_tesseract_ocr(&png, &scratch.path().join("scoreboard"), self.psm.as_deref())
    }
}

/// Read the scoreboard of every given frame. A frame whose OCR fails is kept
/// with its error so one bad frame never stops the batch.
pub fn process_score_frames(
    reader: &dyn ScoreReader,
    frames: &[PathBuf],
    frame_rate: f64,
) -> Vec<ScoreReading> {
    info!("Running scorecard OCR on {} frames", frames.len());
    let pacing = reader.pacing();
    let mut readings = Vec::with_capacity(frames.len());

    for (i, frame) in frames.iter().enumerate() {
        let name = frame
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let crop =
            frame_end_time_from_path(frame, frame_rate).map_or(true, |t| t >= INTRO_SECONDS);

        let reading = match reader.read_text(frame, crop) {
            Ok(text) => ScoreReading::from_text(&name, &text),
            Err(e) => {
                warn!("OCR failed for {}: {:#}", name, e);
                ScoreReading::failed(&name, format!("{:#}", e))
            }
        };
        readings.push(reading);

        if !pacing.is_zero() && i + 1 < frames.len() {
            thread::sleep(pacing);
        }
    }

    let parsed = readings
        .iter()
        .filter(|r| r.parsed.as_ref().is_some_and(|p| !p.is_unreadable()))
        .count();
    info!(
        "Scorecard OCR done: {} of {} frames had a readable score",
        parsed,
        readings.len()
    );
    readings
}
