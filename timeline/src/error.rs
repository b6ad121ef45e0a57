use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("Failed to read timeline file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write timeline file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid timeline JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Shape violations in records handed over by the vision models.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("confidence {0} is outside [0, 1]")]
    Confidence(f64),

    #[error("bounding box has non-finite coordinates")]
    BoundingBox,

    #[error("clip {clip_index} ends at {end_time}s, not after its start at {start_time}s")]
    EmptyClip {
        clip_index: usize,
        start_time: f64,
        end_time: f64,
    },
}

/// Failure of a language model call. Generation treats every variant as fatal,
/// summarization treats every variant as "stop compressing".
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NarrationError {
    #[error("no API key configured for the language model")]
    MissingApiKey,

    #[error("language model request timed out")]
    Timeout,

    #[error("language model returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("language model returned no text")]
    EmptyResponse,

    #[error("language model response could not be read: {0}")]
    InvalidResponse(String),

    #[error("network error talking to the language model: {0}")]
    Network(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GovernorError {
    #[error("narration is empty, nothing to synthesize")]
    EmptyNarration,
}
