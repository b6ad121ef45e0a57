use std::fs;
use std::path::Path;

use crate::detection::ModelOutputs;

/// Load a test fixture by file name
pub fn load_fixture(fixture_name: &str) -> String {
    let path = Path::new("src/tests/fixtures").join(fixture_name);
    fs::read_to_string(path)
        .unwrap_or_else(|_| panic!("Failed to load test fixture: {}", fixture_name))
}

/// Recorded vision model output for a short stretch of an innings
pub fn load_model_outputs() -> ModelOutputs {
    serde_json::from_str(&load_fixture("model_outputs.json"))
        .expect("model_outputs.json fixture is valid")
}

/// Scoreboard OCR captures, one `frame<TAB>text` pair per line, `\n` escaped
pub fn load_scoreboard_captures() -> Vec<(String, String)> {
    load_fixture("scoreboard_ocr.txt")
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('\t'))
        .map(|(frame, text)| (frame.to_string(), text.replace("\\n", "\n")))
        .collect()
}
