//! # sheetpipe-xls
//!
//! Streaming XLS (BIFF8) to CSV conversion.
//!
//! The legacy Excel binary format is a flat record stream inside a
//! Compound File Binary container. Records are decoded one at a time and
//! folded straight into CSV output; only the shared string table and one
//! row's worth of cursor state are ever held in memory. Only the first
//! worksheet is converted.

pub mod biff;
pub mod error;
pub mod stream;
pub mod to_csv;

pub use error::{XlsError, XlsResult};
pub use to_csv::workbook_to_csv;
