use std::collections::HashSet;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const NO_DETECTION: &str = "no_detection";

/// Labels that let the shot classifier run.
pub const SHOT_SUBJECTS: [&str; 4] = ["batsman", "batter", "player", "person"];
/// Labels that let the umpire-gesture classifier run.
pub const UMPIRE_SUBJECTS: [&str; 2] = ["umpire", "official"];
/// Labels that let the run-out classifier run.
pub const RUNOUT_SUBJECTS: [&str; 4] = ["stump", "stumps", "wicket", "wickets"];

/// A single `(label, confidence)` answer from a classifier head.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub confidence: f64,
}

impl Prediction {
    pub fn new(label: &str, confidence: f64) -> Prediction {
        Prediction {
            label: label.to_string(),
            confidence,
        }
    }

    /// The answer recorded when a classifier was not run.
    pub fn none() -> Prediction {
        Prediction::new(NO_DETECTION, 0.0)
    }

    pub fn is_none(&self) -> bool {
        self.label == NO_DETECTION
    }

    /// Confidence pulled into `[0, 1]`; a NaN confidence becomes 0.
    pub fn clamped(mut self) -> Prediction {
        self.confidence = if self.confidence.is_nan() {
            0.0
        } else {
            self.confidence.clamp(0.0, 1.0)
        };
        self
    }
}

impl Default for Prediction {
    fn default() -> Self {
        Prediction::none()
    }
}

fn validate_confidence(confidence: f64) -> Result<(), ValidationError> {
    if (0.0..=1.0).contains(&confidence) {
        Ok(())
    } else {
        Err(ValidationError::Confidence(confidence))
    }
}

/// One object found by the detector. Field names follow the detector's JSON.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Detection {
    #[serde(rename = "class_name", alias = "label")]
    pub label: String,
    #[serde(rename = "conf", alias = "confidence")]
    pub confidence: f64,
    /// x1, y1, x2, y2 in source pixels
    pub bbox: [f64; 4],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_id: Option<u32>,
}

impl Detection {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_confidence(self.confidence)?;
        if self.bbox.iter().all(|c| c.is_finite()) {
            Ok(())
        } else {
            Err(ValidationError::BoundingBox)
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FrameDetectionEvent {
    pub frame_index: usize,
    pub frame_path: String,
    pub time_sec: f64,
    #[serde(default, alias = "yolo_detections")]
    pub detections: Vec<Detection>,
    #[serde(default)]
    pub shot: Prediction,
    #[serde(default)]
    pub umpire: Prediction,
    #[serde(default)]
    pub runout: Prediction,
}

impl FrameDetectionEvent {
    /// Frame file name, the key score readings are stored under.
    pub fn frame_name(&self) -> String {
        Path::new(&self.frame_path)
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.frame_path.clone())
    }

    pub fn confident_detections(&self, threshold: f64) -> impl Iterator<Item = &Detection> {
        self.detections
            .iter()
            .filter(move |detection| detection.confidence > threshold)
    }

    /// Drops detections that fail validation and clamps classifier confidences.
    pub fn sanitized(mut self) -> FrameDetectionEvent {
        let frame_path = &self.frame_path;
        self.detections.retain(|detection| match detection.validate() {
            Ok(()) => true,
            Err(e) => {
                warn!("Dropping {} detection in {}: {}", detection.label, frame_path, e);
                false
            }
        });
        self.shot = self.shot.clamped();
        self.umpire = self.umpire.clamped();
        self.runout = self.runout.clamped();
        self
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ClipActionEvent {
    pub clip_index: usize,
    #[serde(default)]
    pub clip_name: String,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(alias = "video_class")]
    pub action: Prediction,
}

impl ClipActionEvent {
    /// Clip `clip_index` of a video cut into back-to-back windows of `clip_length` seconds.
    pub fn from_window(
        clip_index: usize,
        clip_name: &str,
        clip_length: f64,
        action: Prediction,
    ) -> ClipActionEvent {
        let start_time = clip_index as f64 * clip_length;
        ClipActionEvent {
            clip_index,
            clip_name: clip_name.to_string(),
            start_time,
            end_time: start_time + clip_length,
            action,
        }
    }

    /// Half-open containment: `start_time <= time_sec < end_time`.
    pub fn covers(&self, time_sec: f64) -> bool {
        self.start_time <= time_sec && time_sec < self.end_time
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(self.end_time > self.start_time) {
            return Err(ValidationError::EmptyClip {
                clip_index: self.clip_index,
                start_time: self.start_time,
                end_time: self.end_time,
            });
        }
        Ok(())
    }
}

/// Everything the vision models produced for one video.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ModelOutputs {
    pub frames: Vec<FrameDetectionEvent>,
    pub clips: Vec<ClipActionEvent>,
}

/// Which classifier heads the detector output allows to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Triggers {
    pub shot: bool,
    pub umpire: bool,
    pub runout: bool,
}

impl Triggers {
    pub fn from_detections(detections: &[Detection]) -> Triggers {
        let names: HashSet<String> = detections
            .iter()
            .map(|detection| detection.label.to_lowercase())
            .collect();
        let seen = |subjects: &[&str]| subjects.iter().any(|s| names.contains(*s));
        Triggers {
            shot: seen(&SHOT_SUBJECTS),
            umpire: seen(&UMPIRE_SUBJECTS),
            runout: seen(&RUNOUT_SUBJECTS),
        }
    }
}

/// 0-based frame index from an extracted frame name such as `frame_000001.jpg`.
/// Extraction numbers frames from 1.
pub fn frame_index_from_filename(frame_path: &Path) -> Option<usize> {
    let frame_name = frame_path.file_name()?.to_string_lossy();
    frame_name
        .strip_prefix("frame_")
        .and_then(|s| s.strip_suffix(".jpg"))
        .and_then(|s| s.parse::<usize>().ok())
        .map(|n| n.saturating_sub(1))
}

pub fn frame_time(frame_index: usize, frame_rate: f64) -> f64 {
    frame_index as f64 / frame_rate
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(label: &str, confidence: f64) -> Detection {
        Detection {
            label: label.to_string(),
            confidence,
            bbox: [0.0, 0.0, 10.0, 10.0],
            class_id: None,
        }
    }

    #[test]
    fn test_frame_index_from_filename() {
        assert_eq!(
            frame_index_from_filename(Path::new("frames/frame_000001.jpg")),
            Some(0)
        );
        assert_eq!(
            frame_index_from_filename(Path::new("frame_000120.jpg")),
            Some(119)
        );
        assert_eq!(frame_index_from_filename(Path::new("frame_abc.jpg")), None);
        assert_eq!(frame_index_from_filename(Path::new("clip_000001.mp4")), None);
    }

    #[test]
    fn test_triggers() {
        let triggers = Triggers::from_detections(&[detection("Batter", 0.9), detection("ball", 0.7)]);
        assert_eq!(
            triggers,
            Triggers {
                shot: true,
                umpire: false,
                runout: false
            }
        );
        let triggers = Triggers::from_detections(&[detection("Stumps", 0.5), detection("official", 0.5)]);
        assert!(!triggers.shot && triggers.umpire && triggers.runout);
        assert_eq!(Triggers::from_detections(&[]), Triggers::default());
    }

    #[test]
    fn test_clip_window_covers_half_open() {
        let clip = ClipActionEvent::from_window(2, "clip_000002.mp4", 6.0, Prediction::new("drive", 0.8));
        assert_eq!(clip.start_time, 12.0);
        assert_eq!(clip.end_time, 18.0);
        assert!(clip.covers(12.0));
        assert!(clip.covers(17.99));
        assert!(!clip.covers(18.0));
        assert!(!clip.covers(11.99));
    }

    #[test]
    fn test_validation() {
        assert!(detection("ball", 0.5).validate().is_ok());
        assert_eq!(
            detection("ball", 1.5).validate(),
            Err(ValidationError::Confidence(1.5))
        );
        let mut bad_box = detection("ball", 0.5);
        bad_box.bbox[2] = f64::NAN;
        assert_eq!(bad_box.validate(), Err(ValidationError::BoundingBox));

        let mut clip = ClipActionEvent::from_window(0, "clip_000000.mp4", 6.0, Prediction::none());
        assert!(clip.validate().is_ok());
        clip.end_time = clip.start_time;
        assert!(matches!(clip.validate(), Err(ValidationError::EmptyClip { .. })));
    }

    #[test]
    fn test_clip_confidence_out_of_range_is_kept() {
        let clip = ClipActionEvent::from_window(1, "clip_000001.mp4", 6.0, Prediction::new("bowled", 1.0000001));
        assert!(clip.validate().is_ok());
        assert_eq!(clip.action.clamped().confidence, 1.0);
        assert_eq!(Prediction::new("pull", -0.2).clamped().confidence, 0.0);
        assert_eq!(Prediction::new("pull", f64::NAN).clamped().confidence, 0.0);
    }

    #[test]
    fn test_sanitized_keeps_frame() {
        let mut bad_box = detection("stumps", 0.7);
        bad_box.bbox[0] = f64::INFINITY;
        let frame = FrameDetectionEvent {
            frame_index: 9,
            frame_path: "frames/frame_000010.jpg".to_string(),
            time_sec: 9.0,
            detections: vec![detection("batter", 0.9), detection("ball", 1.3), bad_box],
            shot: Prediction::new("pull", 1.02),
            umpire: Prediction::none(),
            runout: Prediction::new("run_out", 0.4),
        }
        .sanitized();

        assert_eq!(frame.detections, vec![detection("batter", 0.9)]);
        assert_eq!(frame.shot, Prediction::new("pull", 1.0));
        assert_eq!(frame.runout, Prediction::new("run_out", 0.4));
        assert!(frame.umpire.is_none());
    }

    #[test]
    fn test_reads_detector_json_names() {
        let json = r#"{
            "frame_index": 4,
            "frame_path": "frames/frame_000005.jpg",
            "time_sec": 4.0,
            "yolo_detections": [{"bbox": [1, 2, 3, 4], "conf": 0.91, "class_id": 0, "class_name": "batter"}],
            "shot": {"label": "cover_drive", "confidence": 0.77}
        }"#;
        let frame: FrameDetectionEvent = serde_json::from_str(json).unwrap();
        assert_eq!(frame.detections[0].label, "batter");
        assert_eq!(frame.detections[0].class_id, Some(0));
        assert_eq!(frame.umpire, Prediction::none());
        assert_eq!(frame.frame_name(), "frame_000005.jpg");
        assert_eq!(frame.confident_detections(0.8).count(), 1);
    }
}
