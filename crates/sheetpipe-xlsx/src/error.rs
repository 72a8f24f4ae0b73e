//! XLSX error types

use thiserror::Error;

/// Result type for XLSX operations
pub type XlsxResult<T> = std::result::Result<T, XlsxError>;

/// Errors that can occur during XLSX to CSV conversion
#[derive(Debug, Error)]
pub enum XlsxError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP container error
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Invalid file format
    #[error("Invalid XLSX format: {0}")]
    InvalidFormat(String),

    /// A required package part is missing
    #[error("Missing package part: {0}")]
    MissingPart(String),

    /// Core error (cell reference resolution)
    #[error("Core error: {0}")]
    Core(#[from] sheetpipe_core::Error),

    /// Failure while decoding a specific sheet
    #[error("Failed to decode sheet '{name}': {source}")]
    Sheet {
        name: String,
        #[source]
        source: Box<XlsxError>,
    },
}

impl XlsxError {
    /// Attach the sheet name to an error surfaced mid-decode.
    pub fn in_sheet(self, name: &str) -> Self {
        XlsxError::Sheet {
            name: name.to_string(),
            source: Box::new(self),
        }
    }
}
