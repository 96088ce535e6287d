//! Error types for ostinato-core.

use thiserror::Error;

/// Error type for project validation and timeline operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid project: {0}")]
    InvalidProject(String),

    #[error("Invalid tempo: {0}. Must be finite and positive")]
    InvalidTempo(f64),

    #[error("Invalid clip '{filekey}' on track {track}: {reason}")]
    InvalidClip {
        track: usize,
        filekey: String,
        reason: String,
    },

    #[error("Invalid {key} automation on track {track}: {reason}")]
    InvalidEffect {
        track: usize,
        key: String,
        reason: String,
    },
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
