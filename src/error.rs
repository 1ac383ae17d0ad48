//! Error types for the recorder and replay engine.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for clickloop operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while capturing, editing, persisting or replaying clicks.
#[derive(Debug, Error)]
pub enum Error {
    /// A listener is already running.
    #[error("listener is already running")]
    AlreadyRunning,

    /// A listener is not running.
    #[error("listener is not running")]
    NotRunning,

    /// The injector failed to perform a click, scroll or move.
    #[error("input injection failed: {0}")]
    Injection(String),

    /// A persisted macro file could not be parsed.
    #[error("malformed macro file {}: {reason}", path.display())]
    MalformedData {
        /// File that failed to load.
        path: PathBuf,
        /// Parser message.
        reason: String,
    },

    /// A manual field edit did not parse as the field's type.
    #[error("invalid value {value:?} for field `{field}`: {reason}")]
    InvalidFieldEdit {
        /// Field name as it appears in the persisted format.
        field: String,
        /// Rejected text.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Record index outside the current sequence.
    #[error("no record at index {index} (sequence has {len})")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Sequence length at the time of the request.
        len: usize,
    },

    /// Step time outside the accepted range.
    #[error("invalid step time {0}: expected 0.001..=10.0 seconds")]
    InvalidStepTime(f64),

    /// Configuration file could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Thread-related error.
    #[error("thread error: {0}")]
    ThreadError(String),

    /// Filesystem error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
