use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading the trigger configuration
#[derive(Debug, Error)]
pub enum TriggerConfigError {
    #[error("Failed to read trigger config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed trigger config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Trigger '{0}' has no responses")]
    EmptyResponses(String),

    /// Every message contains the empty string, so such a trigger would
    /// answer everything. It is refused at load instead of being accepted as
    /// a catch-all.
    #[error("Trigger '{0}' has an empty substring")]
    EmptySubstring(String),

    #[error("Duplicate trigger id: {0}")]
    DuplicateId(String),

    #[error("Trigger '{id}' response #{index} is {len} characters (max {max})")]
    ResponseTooLong {
        id: String,
        index: usize,
        len: usize,
        max: usize,
    },
}
