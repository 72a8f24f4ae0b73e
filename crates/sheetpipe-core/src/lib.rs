//! # sheetpipe-core
//!
//! Shared building blocks for the sheetpipe streaming converters:
//! - [`format`] - Cell value display formatting (numbers, dates)
//! - [`strings`] - Shared string table resolution
//! - [`reference`] - A1-style cell reference parsing
//! - [`row`] - CSV field escaping and row padding/baseline tracking
//!
//! Both format decoders (`sheetpipe-xlsx`, `sheetpipe-xls`) compose these
//! pieces; neither materializes a workbook. One row's worth of state plus
//! the shared string table is all that ever lives in memory.

pub mod error;
pub mod format;
pub mod number_format;
pub mod reference;
pub mod row;
pub mod strings;

pub use error::{Error, Result};
pub use number_format::NumberFormat;
pub use row::Baseline;
pub use strings::SharedStrings;
