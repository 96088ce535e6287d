//! Error types for ostinato-pitch.

use thiserror::Error;

/// Error type for the pitch-shift pass.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Cannot pitch-shift an empty track")]
    EmptyTrack,

    #[error("Pitch shift failed for '{filekey}'")]
    Dsp {
        filekey: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
