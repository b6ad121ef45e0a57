use tempfile::tempdir;

use super::fixtures::load_model_outputs;
use super::{bare_frame, clip_window, fixture_scores, fixture_timeline};
use crate::error::TimelineError;
use crate::score::ScoreLookup;
use crate::timeline::{build_timeline, Timeline};

#[test]
fn test_fixture_timeline_is_fused() {
    let timeline = fixture_timeline();
    let times: Vec<f64> = timeline.iter().map(|e| e.time_sec).collect();
    assert_eq!(times, vec![0.0, 4.0, 8.0, 12.0, 16.0]);

    let labels: Vec<Option<&str>> = timeline
        .iter()
        .map(|e| e.clip_context.as_ref().map(|c| c.action.label.as_str()))
        .collect();
    // the 12s clip has an empty window and is dropped
    assert_eq!(
        labels,
        vec![
            Some("cover_drive"),
            Some("cover_drive"),
            Some("bowled"),
            None,
            None
        ]
    );

    let events = timeline.events();
    let opening = events[0].score_parsed.as_ref().unwrap();
    assert_eq!(opening.team1_name.as_deref(), Some("IND"));
    assert_eq!(opening.team1_score.runs, Some(0));
    assert_eq!(opening.extra_info.as_ref().unwrap().striker, "Rohit");

    let wicket = events[2].score_parsed.as_ref().unwrap();
    assert_eq!(wicket.team1_score.wickets, Some(1));
    assert_eq!(wicket.team1_score.overs.as_deref(), Some("1.3"));
    assert_eq!(wicket.team2_name.as_deref(), Some("AUS"));

    assert_eq!(events[3].score_ocr_text.as_deref(), Some("REPLAY"));
    assert!(events[3].score_parsed.as_ref().unwrap().is_unreadable());
    assert!(events[4].score_parsed.as_ref().unwrap().is_unreadable());
}

#[test]
fn test_output_sorted_for_any_input_order() {
    let outputs = load_model_outputs();
    let scores = fixture_scores();
    let expected = build_timeline(&outputs.frames, &outputs.clips, &scores);

    let mut frames = outputs.frames.clone();
    for rotation in 0..frames.len() {
        frames.rotate_left(1);
        let timeline = build_timeline(&frames, &outputs.clips, &scores);
        assert_eq!(timeline, expected, "rotation {}", rotation);
    }
    frames.reverse();
    assert_eq!(build_timeline(&frames, &outputs.clips, &scores), expected);
}

#[test]
fn test_equal_times_order_by_frame_index() {
    let frames = vec![bare_frame(7, 3.0), bare_frame(2, 3.0), bare_frame(5, 1.0)];
    let timeline = build_timeline(&frames, &[], &ScoreLookup::new());
    let indexes: Vec<usize> = timeline.iter().map(|e| e.visual.frame_index).collect();
    assert_eq!(indexes, vec![5, 2, 7]);
}

#[test]
fn test_single_clip_window() {
    let frames: Vec<_> = (0..10).map(|i| bare_frame(i, i as f64)).collect();
    let clips = vec![clip_window(0, 2.0, 8.0, "pull")];
    let timeline = build_timeline(&frames, &clips, &ScoreLookup::new());

    assert_eq!(timeline.len(), 10);
    for event in &timeline {
        let attached = event.clip_context.is_some();
        let inside = (2.0..8.0).contains(&event.time_sec);
        assert_eq!(attached, inside, "t = {}", event.time_sec);
    }
}

#[test]
fn test_contexts_always_cover_event_time() {
    let frames: Vec<_> = (0..80).map(|i| bare_frame(i, i as f64 * 0.5)).collect();
    let clips: Vec<_> = (0..6)
        .map(|i| clip_window(i, i as f64 * 6.0, (i + 1) as f64 * 6.0, "drive"))
        .collect();
    let timeline = build_timeline(&frames, &clips, &ScoreLookup::new());

    for event in &timeline {
        match &event.clip_context {
            Some(clip) => assert!(clip.covers(event.time_sec)),
            None => assert!(event.time_sec >= 36.0, "t = {} left without a clip", event.time_sec),
        }
    }
}

#[test]
fn test_save_and_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("timeline_for_llm.json");
    let timeline = fixture_timeline();

    timeline.save(&path).unwrap();
    let loaded = Timeline::load(&path).unwrap();
    assert_eq!(loaded, timeline);

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 5);
    assert_eq!(json[1]["visual"]["detections"][0]["class_name"], "batter");
}

#[test]
fn test_load_restores_time_order() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("timeline.json");
    let mut events = fixture_timeline().events().to_vec();
    events.reverse();
    std::fs::write(&path, serde_json::to_string(&events).unwrap()).unwrap();

    let loaded = Timeline::load(&path).unwrap();
    assert_eq!(loaded.events()[0].time_sec, 0.0);
    assert_eq!(loaded.event_at(9.5).unwrap().time_sec, 8.0);
}

#[test]
fn test_load_errors() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.json");
    assert!(matches!(
        Timeline::load(&missing),
        Err(TimelineError::Read { .. })
    ));

    let broken = dir.path().join("broken.json");
    std::fs::write(&broken, "{not json").unwrap();
    assert!(matches!(
        Timeline::load(&broken),
        Err(TimelineError::Json { .. })
    ));
}
