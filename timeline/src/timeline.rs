use std::cmp::Ordering;
use std::fs;
use std::path::Path;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::detection::{ClipActionEvent, FrameDetectionEvent};
use crate::error::TimelineError;
use crate::score::{ScoreLookup, StructuredScore};

/// One sampled frame with everything known about that instant.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TimelineEvent {
    pub time_sec: f64,
    pub visual: FrameDetectionEvent,
    pub score_ocr_text: Option<String>,
    pub score_parsed: Option<StructuredScore>,
    pub clip_context: Option<ClipActionEvent>,
}

fn by_time(a: &TimelineEvent, b: &TimelineEvent) -> Ordering {
    a.time_sec
        .total_cmp(&b.time_sec)
        .then(a.visual.frame_index.cmp(&b.visual.frame_index))
}

/// Timeline events in ascending time order. The order is established on
/// construction and is the only chronology narration uses.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct Timeline {
    events: Vec<TimelineEvent>,
}

impl Timeline {
    pub fn from_events(mut events: Vec<TimelineEvent>) -> Timeline {
        events.sort_by(by_time);
        Timeline { events }
    }

    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TimelineEvent> {
        self.events.iter()
    }

    /// The latest event at or before `seconds`.
    pub fn event_at(&self, seconds: f64) -> Option<&TimelineEvent> {
        let after = self.events.partition_point(|event| event.time_sec <= seconds);
        after.checked_sub(1).map(|i| &self.events[i])
    }

    /// JSON for the event at `seconds`, or a message saying nothing happened yet.
    pub fn context_at(&self, seconds: f64) -> Result<String, serde_json::Error> {
        match self.event_at(seconds) {
            Some(event) => serde_json::to_string_pretty(event),
            None => Ok(format!("No event found before time {}.", seconds)),
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), TimelineError> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let json = serde_json::to_string_pretty(self).map_err(|source| TimelineError::Json {
            path: path_str.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(|source| TimelineError::Write {
            path: path_str,
            source,
        })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Timeline, TimelineError> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let json = fs::read_to_string(&path).map_err(|source| TimelineError::Read {
            path: path_str.clone(),
            source,
        })?;
        let events: Vec<TimelineEvent> =
            serde_json::from_str(&json).map_err(|source| TimelineError::Json {
                path: path_str,
                source,
            })?;
        Ok(Timeline::from_events(events))
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = &'a TimelineEvent;
    type IntoIter = std::slice::Iter<'a, TimelineEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// Fuse frame detections, clip labels and score readings into one timeline.
///
/// Each frame gets the first clip, in order of start time (then clip index),
/// whose `[start_time, end_time)` window contains the frame time, so
/// overlapping windows resolve to the earliest-starting clip. Frames without
/// a covering clip or without a score reading keep those fields empty.
/// Clips whose window is empty are skipped; clip confidences are clamped to [0, 1].
pub fn build_timeline(
    frame_events: &[FrameDetectionEvent],
    clip_events: &[ClipActionEvent],
    score_lookup: &ScoreLookup,
) -> Timeline {
    let mut clips: Vec<&ClipActionEvent> = clip_events
        .iter()
        .filter(|clip| match clip.validate() {
            Ok(()) => true,
            Err(e) => {
                warn!("Skipping clip {}: {}", clip.clip_index, e);
                false
            }
        })
        .collect();
    clips.sort_by(|a, b| {
        a.start_time
            .total_cmp(&b.start_time)
            .then(a.clip_index.cmp(&b.clip_index))
    });

    let events = frame_events
        .iter()
        .map(|frame| {
            let clip_context = clips
                .iter()
                .find(|clip| clip.covers(frame.time_sec))
                .map(|clip| ClipActionEvent {
                    action: clip.action.clone().clamped(),
                    ..(*clip).clone()
                });
            let score = score_lookup.get(&frame.frame_name());
            TimelineEvent {
                time_sec: frame.time_sec,
                visual: frame.clone(),
                score_ocr_text: score.and_then(|s| s.ocr_text.clone()),
                score_parsed: score.and_then(|s| s.parsed.clone()),
                clip_context,
            }
        })
        .collect::<Vec<_>>();

    debug!(
        "Built timeline from {} frames, {} clips, {} score readings",
        frame_events.len(),
        clips.len(),
        score_lookup.len()
    );
    Timeline::from_events(events)
}
