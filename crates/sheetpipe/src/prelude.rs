//! Convenience re-exports.
//!
//! ```
//! use sheetpipe::prelude::*;
//! ```

pub use crate::{convert_file, convert_to_csv, detect_format, Error, Format, Result};
