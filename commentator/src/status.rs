use std::path::PathBuf;

use serde::Serialize;

pub const TOTAL_STEPS: u32 = 7;

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    #[default]
    Idle,
    Processing,
    Completed,
    Error,
}

/// Progress of the current pipeline run.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RunStatus {
    pub state: RunState,
    pub message: String,
    pub step: u32,
    pub total_steps: u32,
    pub result_path: Option<PathBuf>,
    pub logs: Vec<String>,
}

impl Default for RunStatus {
    fn default() -> Self {
        RunStatus {
            state: RunState::Idle,
            message: "Ready".to_string(),
            step: 0,
            total_steps: TOTAL_STEPS,
            result_path: None,
            logs: Vec::new(),
        }
    }
}

/// `Some(3)` for "Step 3/7: ...".
fn step_number(message: &str) -> Option<u32> {
    let rest = message.strip_prefix("Step ")?;
    let (step, _) = rest.split_once('/')?;
    step.parse().ok()
}

impl RunStatus {
    pub fn reset(&mut self) {
        *self = RunStatus::default();
    }

    pub fn begin(&mut self) {
        self.reset();
        self.state = RunState::Processing;
        self.message = "Starting...".to_string();
    }

    pub fn progress(&mut self, message: &str) {
        if let Some(step) = step_number(message) {
            self.step = step;
        }
        self.message = message.to_string();
        self.logs.push(message.to_string());
    }

    pub fn complete(&mut self, result_path: PathBuf) {
        self.state = RunState::Completed;
        self.message = "Processing Complete!".to_string();
        self.step = self.total_steps;
        self.result_path = Some(result_path);
    }

    pub fn fail(&mut self, message: &str) {
        self.state = RunState::Error;
        self.message = message.to_string();
        self.logs.push(format!("Error: {}", message));
    }
}

/// Receives each progress message of a run.
pub trait ProgressSink {
    fn notify(&mut self, message: &str);
}

impl<F: FnMut(&str)> ProgressSink for F {
    fn notify(&mut self, message: &str) {
        self(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let mut status = RunStatus::default();
        assert_eq!(status.state, RunState::Idle);

        status.begin();
        status.progress("Step 1/7: Analyzing video structure...");
        status.progress("Step 2/7: OCR Skipped");
        status.progress("Commentary generation failed.");
        assert_eq!(status.state, RunState::Processing);
        assert_eq!(status.step, 2);
        assert_eq!(status.message, "Commentary generation failed.");
        assert_eq!(status.logs.len(), 3);

        status.fail("Merge failed.");
        assert_eq!(status.state, RunState::Error);
        assert_eq!(status.logs.last().unwrap(), "Error: Merge failed.");

        status.begin();
        assert_eq!(status.step, 0);
        assert!(status.logs.is_empty());
        assert_eq!(status.state, RunState::Processing);

        status.complete(PathBuf::from("final_output.mp4"));
        assert_eq!(status.step, TOTAL_STEPS);
        assert_eq!(status.result_path, Some(PathBuf::from("final_output.mp4")));
    }

    #[test]
    fn test_serializes_lowercase_state() {
        let json = serde_json::to_value(RunStatus::default()).unwrap();
        assert_eq!(json["state"], "idle");
        assert_eq!(json["total_steps"], 7);
    }

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |message: &str| seen.push(message.to_string());
            sink.notify("Step 5/7: Generating Commentary Script...");
        }
        assert_eq!(seen, vec!["Step 5/7: Generating Commentary Script..."]);
        assert_eq!(step_number("Step 12/7"), Some(12));
        assert_eq!(step_number("Merge failed."), None);
    }
}
