//! XLS error types

use thiserror::Error;

/// Result type for XLS operations
pub type XlsResult<T> = std::result::Result<T, XlsError>;

/// Errors that can occur during XLS to CSV conversion
#[derive(Debug, Error)]
pub enum XlsError {
    /// IO error (also covers CFB errors, which surface as std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid file format
    #[error("Invalid XLS format: {0}")]
    InvalidFormat(String),

    /// Unsupported BIFF version
    #[error("Unsupported XLS version: {0}")]
    UnsupportedVersion(String),

    /// Record parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Failure while decoding a specific sheet
    #[error("Failed to decode sheet '{name}': {source}")]
    Sheet {
        name: String,
        #[source]
        source: Box<XlsError>,
    },
}

impl XlsError {
    /// Attach the sheet name to an error surfaced mid-decode.
    pub fn in_sheet(self, name: &str) -> Self {
        XlsError::Sheet {
            name: name.to_string(),
            source: Box::new(self),
        }
    }
}
