use crate::score::{StructuredScore, TeamScore};
use crate::timeline::Timeline;

/// Pacing hint for the final event, which has no successor to measure against.
pub const LAST_EVENT_SECONDS: f64 = 5.0;
/// Roughly 150 spoken words per minute.
pub const WORDS_PER_SECOND: f64 = 2.5;
pub const MIN_WORDS: usize = 5;
/// Detections at or below this confidence are not shown to the narrator.
pub const VISUAL_CONFIDENCE: f64 = 0.80;

const PREAMBLE: &str = "\
You are given a time-ordered sequence of events from a cricket innings.
Each event corresponds to a sampled frame and includes:
- SCOREBOARD OCR (parsed runs/wickets/overs for the batting team).
- YOLO detections describing the visual scene on the field.
- An optional video-model label that gives a vague flavour of the shot type.

HARD RULES:
1. Treat the SCOREBOARD OCR as the ONLY source of truth for runs, wickets, and overs.
2. Completely IGNORE all classifier outputs such as shot predictions, umpire gestures, and runout predictions. \
Assume they are 'NOT AVAILABLE' and never use them to decide outcomes.
3. PROCESSED VISUALS: High-confidence YOLO detections (>80%) are provided. You MAY use these to colour the visual scene \
(e.g., 'Player detected', 'Bat detected'). Use them to add flavour but do NOT over-trust them and never use them to decide runs or wickets.
4. When scorecard information is missing or unreliable at a time, do NOT invent exact scores. \
Use safe, neutral commentary (for example, a dot ball or a generic defensive shot).
5. When YOLO detections are empty, still write realistic but conservative commentary with no dramatic events.
6. Do NOT mention OCR, detectors, models, confidence, probabilities, JSON, or any technical details.

Your goal is to write continuous, live-style commentary over the innings, in chronological order, \
without labelling commentary as 'Ball 1', 'Ball 2', etc.
";

const TASK: &str = "
TASK:
1. Analyze the SCOREBOARD changes to track the flow of the game.
2. Write a PASSIONATE, CONTINUOUS commentary trace. Don't just list events.
3. **FILL THE SILENCE**: If the score doesn't change for a while, TALK about the tenseness, the fielding, or the bowler's strategy. \
Do not let the commentary die down.
4. **REACT**: If a wicket falls or a boundary is hit, I want to see capital letters and exclamation marks! \
'AND HE'S BOWLED HIM! UNBELIEVABLE SCENES!'
5. **PACING (CRITICAL):** Pay close attention to the 'Aim for X words' hint.
   - If the duration is short (2s), write a quick burst.
   - If the duration is long (10s), elaborate on the atmosphere.
6. Keep it chronological but fluid. No 'Event 1', 'Event 2' labels.";

pub const COMMENTATOR_SYSTEM_PROMPT: &str = "\
You are a HIGH-ENERGY, EMOTIONAL professional live cricket commentator.
You receive time-ordered structured data from a cricket innings. \
The only reliable source of runs, wickets, and overs is the SCOREBOARD OCR. \
YOLO detections and any video-model labels are used only for visual description.

HARD CONSTRAINTS:
- Completely IGNORE all shot-classification, umpire-gesture, and runout classifier outputs. \
Act as if those predictions are not available.
- Use SCOREBOARD OCR to determine how the score changes over time. \
If the score is missing or unchanged for a period, do not invent exact numbers; \
instead, use safe, neutral commentary.
- PROCESSED VISUALS: Use them ONLY for flavor. If a visual doesn't add drama, IGNORE IT.
- Never mention OCR, detectors, models, probabilities, JSON, or any technical terms.

OUTPUT STYLE & EMOTION:
- **HIGH ENERGY**: You must sound excited! The match is alive!
- **SHOUTING**: Use UPPERCASE for big moments! 'THAT IS HUGE!', 'WHAT A SHOT!', 'OUT! HE IS GONE!'
- **NO ROBOTIC LISTS**: Do not say 'I see a player'. Say 'The fielder is sprinting!'.
- **FILL GAPS**: If the score is stuck, talk about the tension, the crowd, the strategy.
- **CONTINUOUS FLOW**: Do NOT label 'Ball 1', 'Ball 2'. Write a flowing narrative stream.

CRITICAL: YOUR OUTPUT MUST BE UNDER 9000 CHARACTERS. \
Summarize if needed, but KEEP THE ENERGY HIGH.";

pub const EDITOR_SYSTEM_PROMPT: &str =
    "You are an expert editor. Compress the text as requested.";

/// Input beyond this many characters is not sent for summarization.
pub const SUMMARY_INPUT_CAP: usize = 60_000;

/// Advisory word budget for an event that stays on screen for `duration` seconds.
pub fn word_budget(duration: f64) -> usize {
    let words = (duration * WORDS_PER_SECOND).round();
    if words.is_finite() && words > MIN_WORDS as f64 {
        words as usize
    } else {
        MIN_WORDS
    }
}

fn format_team(team: Option<&str>, score: &TeamScore) -> Option<String> {
    let team = team?;
    if score.is_empty() {
        return Some(team.to_string());
    }
    // wickets are only meaningful next to runs
    let mut s = format!("{}:", team);
    if let Some(runs) = score.runs {
        s.push_str(&format!(" {}", runs));
        if let Some(wickets) = score.wickets {
            s.push_str(&format!("/{}", wickets));
        }
    }
    if let Some(overs) = score.overs.as_deref().filter(|o| !o.is_empty()) {
        s.push_str(&format!(" in {} overs", overs));
    }
    Some(s)
}

/// `"IND: 240/3 in 45.2 overs | AUS"`; fields that were not read are left out.
pub fn format_score(score: &StructuredScore) -> String {
    let parts: Vec<String> = [
        format_team(score.team1_name.as_deref(), &score.team1_score),
        format_team(score.team2_name.as_deref(), &score.team2_score),
    ]
    .into_iter()
    .flatten()
    .collect();

    if parts.is_empty() {
        "Unknown score".to_string()
    } else {
        parts.join(" | ")
    }
}

/// Build the single commentary prompt for a whole timeline.
pub fn compile_commentary_prompt(timeline: &Timeline) -> String {
    let events = timeline.events();
    let mut lines = vec![PREAMBLE.to_string()];

    for (i, event) in events.iter().enumerate() {
        let duration = events
            .get(i + 1)
            .map(|next| next.time_sec - event.time_sec)
            .unwrap_or(LAST_EVENT_SECONDS);
        let max_words = word_budget(duration);

        let score = event
            .score_parsed
            .as_ref()
            .map(format_score)
            .unwrap_or_else(|| "None".to_string());

        let (action_label, action_conf) = match &event.clip_context {
            Some(clip) => (clip.action.label.as_str(), clip.action.confidence),
            None => ("Unknown", 0.0),
        };

        let visuals: Vec<String> = event
            .visual
            .confident_detections(VISUAL_CONFIDENCE)
            .map(|d| format!("{} ({:.2})", d.label, d.confidence))
            .collect();
        let visuals = if visuals.is_empty() {
            "None".to_string()
        } else {
            visuals.join(", ")
        };

        lines.push(format!("\nEVENT {}:", i + 1));
        lines.push(format!(
            " - Time (s): {:.1} (Next event in {:.1}s -> Aim for approx {} words)",
            event.time_sec, duration, max_words
        ));
        lines.push(format!(" - Scoreboard snapshot: {}", score));
        lines.push(format!(
            " - Video model label (flavour only): {} (confidence={:.2})",
            action_label, action_conf
        ));
        lines.push(format!(" - High-Confidence Visuals (>0.8): {}", visuals));
    }

    lines.push(TASK.to_string());
    lines.join("\n")
}

/// Request to shrink commentary below `max_chars` characters.
pub fn compile_summary_prompt(text: &str, max_chars: usize) -> String {
    let length = text.chars().count();
    let capped: String = text.chars().take(SUMMARY_INPUT_CAP).collect();
    format!(
        "The following cricket commentary is too long ({} chars). \
Compress it to under {} characters while preserving the flow and key events. \
Keep the tone exciting and professional. Do not remove the end.\n\nTEXT:\n{}",
        length, max_chars, capped
    )
}

/// Question about the match at a given moment, answered from the timeline context.
pub fn compile_analyst_prompt(question: &str, timestamp: f64, context: &str) -> String {
    format!(
        "You are an expert Cricket Analyst explaining the match to a viewer.\n\
CONTEXT (Events happening around {}s):\n{}\n\n\
USER QUESTION: {}\n\n\
TASK: Answer the user's question based strictly on the provided context. \
Keep it short (max 2 sentences) and helpful. \
If the context doesn't have the answer, say you are analyzing live data.",
        timestamp, context, question
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(team1: Option<&str>, t1: TeamScore, team2: Option<&str>) -> StructuredScore {
        StructuredScore {
            team1_name: team1.map(str::to_string),
            team2_name: team2.map(str::to_string),
            team1_score: t1,
            ..StructuredScore::default()
        }
    }

    #[test]
    fn test_word_budget() {
        assert_eq!(word_budget(0.0), 5);
        assert_eq!(word_budget(1.0), 5);
        assert_eq!(word_budget(4.0), 10);
        assert_eq!(word_budget(4.2), 11);
        assert_eq!(word_budget(5.0), 13);
        assert_eq!(word_budget(f64::NAN), 5);
    }

    #[test]
    fn test_format_score_full() {
        let s = score(
            Some("IND"),
            TeamScore {
                runs: Some(240),
                wickets: Some(3),
                overs: Some("45.2".to_string()),
            },
            Some("AUS"),
        );
        assert_eq!(format_score(&s), "IND: 240/3 in 45.2 overs | AUS");
    }

    #[test]
    fn test_format_score_partial() {
        let runs_only = score(
            Some("IND"),
            TeamScore {
                runs: Some(17),
                ..TeamScore::default()
            },
            None,
        );
        assert_eq!(format_score(&runs_only), "IND: 17");

        let overs_only = score(
            Some("SL"),
            TeamScore {
                overs: Some("3.4".to_string()),
                ..TeamScore::default()
            },
            None,
        );
        assert_eq!(format_score(&overs_only), "SL: in 3.4 overs");

        assert_eq!(format_score(&StructuredScore::default()), "Unknown score");
    }

    #[test]
    fn test_summary_prompt_caps_input() {
        let long = "a".repeat(SUMMARY_INPUT_CAP + 10);
        let prompt = compile_summary_prompt(&long, 9000);
        assert!(prompt.contains(&format!("({} chars)", SUMMARY_INPUT_CAP + 10)));
        assert!(prompt.contains("under 9000 characters"));
        assert!(prompt.ends_with(&"a".repeat(SUMMARY_INPUT_CAP)));
        assert!(!prompt.ends_with(&"a".repeat(SUMMARY_INPUT_CAP + 1)));
    }

    #[test]
    fn test_analyst_prompt() {
        let prompt = compile_analyst_prompt("Who is batting?", 42.0, "{\"time_sec\": 40.0}");
        assert!(prompt.contains("around 42s"));
        assert!(prompt.contains("USER QUESTION: Who is batting?"));
        assert!(prompt.contains("{\"time_sec\": 40.0}"));
    }
}
