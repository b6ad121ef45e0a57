use log::{debug, info, warn};
use serde::Serialize;

use crate::error::{GovernorError, NarrationError};

/// Something that can rewrite text to fit a character budget, usually a
/// language model. It is allowed to fail or to give up without shrinking.
pub trait Summarizer {
    fn summarize(&self, text: &str, max_chars: usize) -> Result<String, NarrationError>;
}

impl<F> Summarizer for F
where
    F: Fn(&str, usize) -> Result<String, NarrationError>,
{
    fn summarize(&self, text: &str, max_chars: usize) -> Result<String, NarrationError> {
        self(text, max_chars)
    }
}

/// Character budgets for narration handed to speech synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NarrationLimits {
    /// Text at or under this length is accepted as is.
    pub soft_limit: usize,
    /// Length requested from the summarizer; lower than `soft_limit` so a
    /// slight overshoot still lands under it.
    pub summary_target: usize,
    /// Text still longer than this after summarizing is cut to `soft_limit`.
    pub ceiling: usize,
    pub max_iterations: u32,
}

impl Default for NarrationLimits {
    fn default() -> Self {
        NarrationLimits {
            soft_limit: 9500,
            summary_target: 9000,
            ceiling: 9800,
            max_iterations: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LengthState {
    Fresh,
    /// Summarized this many times so far.
    Compressing(u32),
    Done,
    HardTruncated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GovernedNarration {
    pub text: String,
    /// Summarizer calls made, successful or not.
    pub attempts: u32,
    /// Summarizer calls whose output was adopted.
    pub rounds: u32,
    /// `Done` or `HardTruncated`.
    pub state: LengthState,
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// First `max_chars` characters of `text`, cut back to the last full stop in
/// that window when there is one past the first character.
pub fn truncate_at_sentence(text: &str, max_chars: usize) -> String {
    let window: String = text.chars().take(max_chars).collect();
    match window.rfind('.') {
        Some(pos) if pos > 0 => window[..=pos].to_string(),
        _ => window,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LengthGovernor {
    limits: NarrationLimits,
}

impl LengthGovernor {
    pub fn new(limits: NarrationLimits) -> LengthGovernor {
        LengthGovernor { limits }
    }

    /// Bring `text` within the narration limits.
    ///
    /// Summarizes at most `max_iterations` times, stopping early when the
    /// summarizer fails, returns nothing or does not shrink the text. Text that
    /// is still over the ceiling afterwards is hard-truncated, so the result
    /// never exceeds `ceiling` characters. Only empty input is an error.
    pub fn enforce<S>(&self, text: &str, summarizer: &S) -> Result<GovernedNarration, GovernorError>
    where
        S: Summarizer + ?Sized,
    {
        if text.trim().is_empty() {
            return Err(GovernorError::EmptyNarration);
        }
        let limits = self.limits;
        let mut current = text.to_string();
        let mut state = LengthState::Fresh;
        let mut attempts = 0;
        let mut rounds = 0;

        while char_len(&current) > limits.soft_limit && attempts < limits.max_iterations {
            attempts += 1;
            let length = char_len(&current);
            info!(
                "Commentary long ({} chars). Summarizing (Attempt {})...",
                length, attempts
            );

            match summarizer.summarize(&current, limits.summary_target) {
                Ok(summary) if !summary.trim().is_empty() && char_len(&summary) < length => {
                    current = summary;
                    rounds += 1;
                    state = LengthState::Compressing(rounds);
                }
                Ok(summary) => {
                    warn!(
                        "Summarization didn't reduce length ({} -> {} chars), moving to hard truncation",
                        length,
                        char_len(&summary)
                    );
                    break;
                }
                Err(e) => {
                    warn!("Summarization failed: {}, moving to hard truncation", e);
                    break;
                }
            }
        }

        let state = if char_len(&current) > limits.ceiling {
            info!(
                "Still too long ({} chars, {:?}). Forcing hard truncation to {} chars",
                char_len(&current),
                state,
                limits.soft_limit
            );
            current = truncate_at_sentence(&current, limits.soft_limit);
            LengthState::HardTruncated
        } else {
            debug!("Narration accepted at {} chars ({:?})", char_len(&current), state);
            LengthState::Done
        };

        Ok(GovernedNarration {
            text: current,
            attempts,
            rounds,
            state,
        })
    }
}
