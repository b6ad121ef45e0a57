use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use cricket_timeline::{
    frame_index_from_filename, frame_time, ClipActionEvent, Detection, FrameDetectionEvent,
    ModelOutputs, Prediction, Triggers,
};
use log::{debug, info, warn};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;

use crate::video::ClipWindow;

/// The classifier heads behind the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierHead {
    Shot,
    Umpire,
    Runout,
    /// Short-video action classifier, run on clips rather than frames.
    Clip,
}

impl ClassifierHead {
    pub fn path_segment(&self) -> &'static str {
        match self {
            ClassifierHead::Shot => "shot",
            ClassifierHead::Umpire => "umpire",
            ClassifierHead::Runout => "runout",
            ClassifierHead::Clip => "clip",
        }
    }
}

pub trait VisionModels {
    /// Make the models ready. Called once before any inference.
    fn load(&mut self) -> Result<()>;
    fn detect(&self, frame: &Path) -> Result<Vec<Detection>>;
    fn classify(&self, head: ClassifierHead, input: &Path) -> Result<Prediction>;
}

#[derive(Deserialize, Debug)]
struct DetectResponse {
    #[serde(default, alias = "yolo_detections")]
    detections: Vec<Detection>,
}

/// Models served by the local inference sidecar over HTTP.
pub struct InferenceClient {
    client: Client,
    base_url: String,
}

impl InferenceClient {
    pub fn new(base_url: &str) -> Result<InferenceClient> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to build inference HTTP client")?;
        Ok(InferenceClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn post<T: for<'de> Deserialize<'de>>(&self, endpoint: &str, input: &Path) -> Result<T> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "path": input.to_string_lossy() }))
            .send()
            .with_context(|| format!("Inference request to {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(anyhow::anyhow!("Inference {} returned HTTP {}: {}", url, status.as_u16(), body));
        }
        response
            .json()
            .with_context(|| format!("Invalid JSON from {}", url))
    }
}

impl VisionModels for InferenceClient {
    fn load(&mut self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("Inference sidecar is not reachable at {}", self.base_url))?;
        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "Inference sidecar at {} is not ready (HTTP {})",
                self.base_url,
                response.status().as_u16()
            ));
        }
        info!("Inference sidecar ready at {}", self.base_url);
        Ok(())
    }

    fn detect(&self, frame: &Path) -> Result<Vec<Detection>> {
        let response: DetectResponse = self.post("detect", frame)?;
        Ok(response.detections)
    }

    fn classify(&self, head: ClassifierHead, input: &Path) -> Result<Prediction> {
        self.post(&format!("classify/{}", head.path_segment()), input)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Replays a saved `model_outputs.json` instead of running the models.
/// Frames and clips it has no record of get no detections and no label.
#[derive(Debug, Default)]
pub struct RecordedOutputs {
    frames: HashMap<String, FrameDetectionEvent>,
    clips: HashMap<String, ClipActionEvent>,
}

impl RecordedOutputs {
    pub fn new(outputs: ModelOutputs) -> RecordedOutputs {
        RecordedOutputs {
            frames: outputs
                .frames
                .into_iter()
                .map(|frame| (frame.frame_name(), frame))
                .collect(),
            clips: outputs
                .clips
                .into_iter()
                .map(|clip| (clip.clip_name.clone(), clip))
                .collect(),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<RecordedOutputs> {
        let path_ref = path.as_ref();
        let json = fs::read_to_string(path_ref)
            .with_context(|| format!("Failed to read recorded outputs {}", path_ref.display()))?;
        let outputs: ModelOutputs = serde_json::from_str(&json)
            .with_context(|| format!("Invalid recorded outputs in {}", path_ref.display()))?;
        Ok(RecordedOutputs::new(outputs))
    }
}

impl VisionModels for RecordedOutputs {
    fn load(&mut self) -> Result<()> {
        info!(
            "Replaying recorded outputs for {} frames and {} clips",
            self.frames.len(),
            self.clips.len()
        );
        Ok(())
    }

    fn detect(&self, frame: &Path) -> Result<Vec<Detection>> {
        let name = file_name(frame);
        match self.frames.get(&name) {
            Some(recorded) => Ok(recorded.detections.clone()),
            None => {
                debug!("No recorded detections for {}", name);
                Ok(Vec::new())
            }
        }
    }

    fn classify(&self, head: ClassifierHead, input: &Path) -> Result<Prediction> {
        let name = file_name(input);
        let prediction = match head {
            ClassifierHead::Clip => self.clips.get(&name).map(|clip| clip.action.clone()),
            ClassifierHead::Shot => self.frames.get(&name).map(|f| f.shot.clone()),
            ClassifierHead::Umpire => self.frames.get(&name).map(|f| f.umpire.clone()),
            ClassifierHead::Runout => self.frames.get(&name).map(|f| f.runout.clone()),
        };
        Ok(prediction.unwrap_or_default())
    }
}

fn gated(
    models: &dyn VisionModels,
    triggered: bool,
    head: ClassifierHead,
    frame: &Path,
) -> Result<Prediction> {
    if triggered {
        models.classify(head, frame)
    } else {
        Ok(Prediction::none())
    }
}

/// Detect objects in each frame, then run only the classifier heads whose
/// subject the detector saw. Frames without a parsable name are skipped.
pub fn run_on_frames(
    models: &dyn VisionModels,
    frames: &[PathBuf],
    frame_rate: f64,
) -> Result<Vec<FrameDetectionEvent>> {
    let mut events = Vec::with_capacity(frames.len());

    for frame in frames {
        let Some(frame_index) = frame_index_from_filename(frame) else {
            warn!("Skipping frame with unexpected name: {}", frame.display());
            continue;
        };

        let detections = models
            .detect(frame)
            .with_context(|| format!("Detection failed on {}", frame.display()))?;
        let triggers = Triggers::from_detections(&detections);

        let event = FrameDetectionEvent {
            frame_index,
            frame_path: frame.to_string_lossy().to_string(),
            time_sec: frame_time(frame_index, frame_rate),
            shot: gated(models, triggers.shot, ClassifierHead::Shot, frame)?,
            umpire: gated(models, triggers.umpire, ClassifierHead::Umpire, frame)?,
            runout: gated(models, triggers.runout, ClassifierHead::Runout, frame)?,
            detections,
        };

        events.push(event.sanitized());
    }

    info!("Ran frame models on {} of {} frames", events.len(), frames.len());
    Ok(events)
}

/// Classify the action in each clip. A clip the classifier fails on is
/// left out of the timeline.
pub fn run_on_clips(models: &dyn VisionModels, clips: &[ClipWindow]) -> Vec<ClipActionEvent> {
    let mut events = Vec::with_capacity(clips.len());

    for window in clips {
        match models.classify(ClassifierHead::Clip, &window.clip_path) {
            Ok(action) => events.push(ClipActionEvent {
                clip_index: window.clip_index,
                clip_name: window.clip_name.clone(),
                start_time: window.start_time,
                end_time: window.end_time,
                action: action.clamped(),
            }),
            Err(e) => warn!("Skipping clip {}: {:#}", window.clip_name, e),
        }
    }

    info!("Classified {} of {} clips", events.len(), clips.len());
    events
}
