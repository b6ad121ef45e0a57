// Data models and the pure stages of the commentary pipeline
pub mod detection;
pub mod error;
pub mod governor;
pub mod prompt;
pub mod score;
pub mod timeline;

// Re-export tests for integration testing
#[cfg(test)]
pub mod tests;

// Re-export key types and functions for easier access
pub use crate::detection::{
    frame_index_from_filename, frame_time, ClipActionEvent, Detection, FrameDetectionEvent,
    ModelOutputs, Prediction, Triggers,
};
pub use crate::error::{GovernorError, NarrationError, TimelineError, ValidationError};
pub use crate::governor::{
    truncate_at_sentence, GovernedNarration, LengthGovernor, LengthState, NarrationLimits,
    Summarizer,
};
pub use crate::prompt::{
    compile_analyst_prompt, compile_commentary_prompt, compile_summary_prompt, format_score,
    word_budget,
};
pub use crate::score::{parse_score_text, score_lookup, ScoreLookup, ScoreReading, StructuredScore};
pub use crate::timeline::{build_timeline, Timeline, TimelineEvent};
