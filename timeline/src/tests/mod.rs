use crate::detection::{ClipActionEvent, FrameDetectionEvent, Prediction};
use crate::score::{score_lookup, ScoreLookup, ScoreReading};
use crate::timeline::{build_timeline, Timeline};

pub mod fixtures;
pub mod prompt_tests;
pub mod timeline_tests;

/// A frame sampled at `time_sec` with no detections and no classifier answers
pub fn bare_frame(frame_index: usize, time_sec: f64) -> FrameDetectionEvent {
    FrameDetectionEvent {
        frame_index,
        frame_path: format!("frames/frame_{:06}.jpg", frame_index + 1),
        time_sec,
        detections: Vec::new(),
        shot: Prediction::none(),
        umpire: Prediction::none(),
        runout: Prediction::none(),
    }
}

pub fn clip_window(clip_index: usize, start_time: f64, end_time: f64, label: &str) -> ClipActionEvent {
    ClipActionEvent {
        clip_index,
        clip_name: format!("clip_{:06}.mp4", clip_index),
        start_time,
        end_time,
        action: Prediction::new(label, 0.5),
    }
}

/// Score lookup built from the OCR capture fixture
pub fn fixture_scores() -> ScoreLookup {
    score_lookup(
        fixtures::load_scoreboard_captures()
            .iter()
            .map(|(frame, text)| ScoreReading::from_text(frame, text)),
    )
}

/// Timeline fused from the model output and OCR fixtures
pub fn fixture_timeline() -> Timeline {
    let outputs = fixtures::load_model_outputs();
    build_timeline(&outputs.frames, &outputs.clips, &fixture_scores())
}
