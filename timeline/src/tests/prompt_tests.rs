use super::{bare_frame, fixture_timeline};
use crate::prompt::compile_commentary_prompt;
use crate::score::ScoreLookup;
use crate::timeline::{build_timeline, Timeline};

fn event_block(prompt: &str, number: usize) -> &str {
    let start = prompt
        .find(&format!("EVENT {}:", number))
        .unwrap_or_else(|| panic!("no EVENT {} in prompt", number));
    let rest = &prompt[start..];
    let end = rest[1..].find("EVENT ").map(|i| i + 1).unwrap_or(rest.len());
    &rest[..end]
}

#[test]
fn test_fixture_prompt_blocks() {
    let prompt = compile_commentary_prompt(&fixture_timeline());

    let first = event_block(&prompt, 1);
    assert!(first.contains("Time (s): 0.0 (Next event in 4.0s -> Aim for approx 10 words)"));
    assert!(first.contains("Scoreboard snapshot: IND: 0/0 in 0.1 overs | AUS"));
    assert!(first.contains("cover_drive (confidence=0.62)"));
    assert!(first.contains("High-Confidence Visuals (>0.8): None"));

    let third = event_block(&prompt, 3);
    assert!(third.contains("Scoreboard snapshot: IND: 4/1 in 1.3 overs | AUS"));
    assert!(third.contains("bowled (confidence=0.58)"));
    assert!(third.contains("batter (0.94), stumps (0.88)"));
    assert!(!third.contains("umpire (0.41)"));

    let fourth = event_block(&prompt, 4);
    assert!(fourth.contains("Scoreboard snapshot: Unknown score"));
    assert!(fourth.contains("Unknown (confidence=0.00)"));

    let last = event_block(&prompt, 5);
    assert!(last.contains("Time (s): 16.0 (Next event in 5.0s -> Aim for approx 13 words)"));
    assert!(last.contains("crowd (0.81)"));
    assert!(!prompt.contains("EVENT 6:"));
}

#[test]
fn test_classifier_heads_never_reach_prompt() {
    let prompt = compile_commentary_prompt(&fixture_timeline());
    assert!(!prompt.contains("defense"));
    assert!(!prompt.contains("not_run_out"));
    assert!(!prompt.contains("0.71"));
}

#[test]
fn test_events_follow_timeline_order() {
    let prompt = compile_commentary_prompt(&fixture_timeline());
    let positions: Vec<usize> = (1..=5)
        .map(|n| prompt.find(&format!("EVENT {}:", n)).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
    assert!(prompt.starts_with("You are given a time-ordered sequence"));
    assert!(prompt.trim_end().ends_with("No 'Event 1', 'Event 2' labels."));
}

#[test]
fn test_missing_score_renders_none() {
    let timeline = build_timeline(&[bare_frame(0, 0.0), bare_frame(3, 1.5)], &[], &ScoreLookup::new());
    let prompt = compile_commentary_prompt(&timeline);
    assert_eq!(prompt.matches("Scoreboard snapshot: None").count(), 2);
    // 1.5 s gives 4 words, raised to the minimum
    assert!(prompt.contains("Next event in 1.5s -> Aim for approx 5 words"));
}

#[test]
fn test_empty_timeline_prompt() {
    let prompt = compile_commentary_prompt(&Timeline::default());
    assert!(!prompt.contains("EVENT 1:"));
    assert!(prompt.contains("HARD RULES:"));
    assert!(prompt.contains("TASK:"));
}
