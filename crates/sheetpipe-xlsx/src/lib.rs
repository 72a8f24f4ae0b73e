//! # sheetpipe-xlsx
//!
//! Streaming XLSX (Office Open XML) to CSV conversion.
//!
//! The worksheet XML is walked with a pull parser and never materialized:
//! cell events flow straight into the CSV reconstruction, so memory use is
//! bounded by one row plus the shared string table regardless of file size.
//! Only the first worksheet is converted.

pub mod error;
pub mod package;
pub mod sheet;
pub mod styles;
pub mod to_csv;

pub use error::{XlsxError, XlsxResult};
pub use to_csv::sheet_to_csv;
