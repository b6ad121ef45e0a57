use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

// Broadcast ticker, e.g.
// "IND 240/3 P 45.2/50 Toss AUS Kohli 88(91) Rahul 40(52) AUS"
static BROADCAST_OVERLAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b(?P<team>[A-Z]{2,3})\s+",
        r"(?P<runs>\d+)\s*[-/]\s*(?P<wickets>\d+)\s+",
        r"(?P<phase>[A-Z])?\s*",
        r"(?P<overs>\d+(?:\.\d+)?)\s*/\s*(?P<maxovers>\d+)\s+",
        r"Toss\s+(?P<toss>[A-Z]{2,3})\s+",
        r"(?P<striker>[A-Za-z]+)\s+(?P<sruns>\d+)\s*\((?P<sballs>\d+)\)\s+",
        r"(?P<nonstriker>[A-Za-z]+)\s+(?P<nsruns>\d+)\s*\((?P<nsballs>\d+)\)\s+",
        r"(?P<bowl>[A-Z]{2,3})",
    ))
    .expect("broadcast overlay pattern is valid")
});

// Summary card, e.g. "IND 240/3 (45.2) vs AUS"
static SUMMARY_CARD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b(?P<team>[A-Z]{2,3})\s+",
        r"(?P<runs>\d+)\s*[-/]\s*(?P<wickets>\d+)\s*",
        r"\(\s*(?P<overs>\d+(?:\.\d+)?)\s*\)",
        r"(?:\s*vs?\.?\s+(?P<bowl>[A-Z]{2,3})\b)?",
    ))
    .expect("summary card pattern is valid")
});

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamScore {
    pub runs: Option<u32>,
    pub wickets: Option<u32>,
    /// Literal over count as shown on screen. "4.3" is four overs and three balls.
    pub overs: Option<String>,
}

impl TeamScore {
    pub fn is_empty(&self) -> bool {
        self.runs.is_none() && self.wickets.is_none() && self.overs.is_none()
    }
}

/// Batting detail only the broadcast ticker carries.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InningsDetail {
    pub max_overs: u32,
    pub toss: String,
    pub striker: String,
    pub striker_runs: u32,
    pub striker_balls: u32,
    pub nonstriker: String,
    pub nonstriker_runs: u32,
    pub nonstriker_balls: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredScore {
    pub team1_name: Option<String>,
    pub team2_name: Option<String>,
    #[serde(default)]
    pub team1_score: TeamScore,
    #[serde(default)]
    pub team2_score: TeamScore,
    #[serde(default)]
    pub raw_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_info: Option<InningsDetail>,
}

impl StructuredScore {
    /// True when nothing was recognised; the score is unreadable at this instant.
    pub fn is_unreadable(&self) -> bool {
        self.team1_name.is_none()
            && self.team2_name.is_none()
            && self.team1_score.is_empty()
            && self.team2_score.is_empty()
    }
}

/// One OCR pass over one frame. `error` is set when the OCR service failed,
/// otherwise `parsed` holds the (possibly empty) interpretation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScoreReading {
    pub frame: String,
    pub ocr_text: Option<String>,
    pub parsed: Option<StructuredScore>,
    pub error: Option<String>,
}

impl ScoreReading {
    pub fn from_text(frame: &str, text: &str) -> ScoreReading {
        let text = text.trim();
        ScoreReading {
            frame: frame.to_string(),
            ocr_text: Some(text.to_string()),
            parsed: Some(parse_score_text(text)),
            error: None,
        }
    }

    pub fn failed(frame: &str, error: impl Into<String>) -> ScoreReading {
        ScoreReading {
            frame: frame.to_string(),
            ocr_text: None,
            parsed: None,
            error: Some(error.into()),
        }
    }
}

pub type ScoreLookup = HashMap<String, ScoreReading>;

/// Index readings by frame file name. Readings without a frame name are dropped.
pub fn score_lookup(readings: impl IntoIterator<Item = ScoreReading>) -> ScoreLookup {
    readings
        .into_iter()
        .filter(|reading| !reading.frame.is_empty())
        .map(|reading| (reading.frame.clone(), reading))
        .collect()
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn number(caps: &Captures, name: &str) -> Option<u32> {
    caps.name(name).and_then(|m| m.as_str().parse().ok())
}

fn text(caps: &Captures, name: &str) -> Option<String> {
    caps.name(name).map(|m| m.as_str().to_string())
}

/// Turn raw scoreboard OCR text into a structured score.
///
/// Never fails: text that matches neither overlay layout gives a structure
/// with every score field empty and `raw_text` kept for diagnostics.
/// The bowling side only contributes its name; its runs, wickets and overs
/// are not shown on the ticker during an innings and stay empty.
pub fn parse_score_text(raw: &str) -> StructuredScore {
    let raw_text = normalize_whitespace(raw);
    let mut out = StructuredScore::default();

    if let Some(caps) = BROADCAST_OVERLAY.captures(&raw_text) {
        fill_batting_side(&mut out, &caps);
        out.extra_info = Some(InningsDetail {
            max_overs: number(&caps, "maxovers").unwrap_or_default(),
            toss: text(&caps, "toss").unwrap_or_default(),
            striker: text(&caps, "striker").unwrap_or_default(),
            striker_runs: number(&caps, "sruns").unwrap_or_default(),
            striker_balls: number(&caps, "sballs").unwrap_or_default(),
            nonstriker: text(&caps, "nonstriker").unwrap_or_default(),
            nonstriker_runs: number(&caps, "nsruns").unwrap_or_default(),
            nonstriker_balls: number(&caps, "nsballs").unwrap_or_default(),
        });
    } else if let Some(caps) = SUMMARY_CARD.captures(&raw_text) {
        fill_batting_side(&mut out, &caps);
    }

    out.raw_text = raw_text;
    out
}

fn fill_batting_side(out: &mut StructuredScore, caps: &Captures) {
    out.team1_name = text(caps, "team");
    out.team1_score = TeamScore {
        runs: number(caps, "runs"),
        wickets: number(caps, "wickets"),
        overs: text(caps, "overs"),
    };
    out.team2_name = text(caps, "bowl");
    out.team2_score = TeamScore::default();
}
