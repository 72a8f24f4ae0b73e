//! Error types for sheetpipe-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in sheetpipe-core
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid A1-style cell reference
    #[error("Invalid cell reference: {0}")]
    InvalidReference(String),

    /// IO error writing to the output sink
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
