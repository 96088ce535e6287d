//! Error types for ostinato-export.

use std::io;
use thiserror::Error;

/// Export error type
#[derive(Error, Debug)]
pub enum ExportError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Project failed input validation
    #[error("Invalid project: {0}")]
    Project(#[from] ostinato_core::Error),

    /// Unsupported format or feature not enabled
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Encoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Rendering error
    #[error("Render error: {0}")]
    Render(String),

    /// Invalid audio data
    #[error("Invalid audio data: {0}")]
    InvalidData(String),
}

/// Result type for export operations
pub type Result<T> = std::result::Result<T, ExportError>;

// From trait implementations for external library errors at API boundary

#[cfg(feature = "wav")]
impl From<hound::Error> for ExportError {
    fn from(e: hound::Error) -> Self {
        ExportError::Io(io::Error::other(e))
    }
}

#[cfg(feature = "stems")]
impl From<zip::result::ZipError> for ExportError {
    fn from(e: zip::result::ZipError) -> Self {
        ExportError::Encoding(e.to_string())
    }
}
