//! # sheetpipe
//!
//! Streaming spreadsheet to CSV conversion.
//!
//! Sheetpipe converts the first worksheet of an Excel workbook (XLSX or
//! legacy XLS) to CSV without materializing the sheet: rows are written
//! as soon as they complete, and memory use is bounded by the shared
//! string table plus one row of cursor state.
//!
//! ## Example
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufWriter;
//!
//! # fn main() -> sheetpipe::Result<()> {
//! let input = File::open("report.xlsx")?;
//! let mut output = BufWriter::new(File::create("report.csv")?);
//! sheetpipe::convert_to_csv(input, &mut output)?;
//! # Ok(())
//! # }
//! ```

pub mod prelude;

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "xlsx")]
    #[error(transparent)]
    Xlsx(#[from] sheetpipe_xlsx::XlsxError),

    #[cfg(feature = "xls")]
    #[error(transparent)]
    Xls(#[from] sheetpipe_xls::XlsError),

    #[error("unrecognized input (expected an XLSX or XLS workbook)")]
    UnknownFormat,

    #[error("{0} support is not enabled in this build")]
    Disabled(&'static str),
}

/// The container formats sheetpipe can decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Office Open XML workbook (a ZIP archive).
    Xlsx,
    /// Legacy binary workbook (a compound file).
    Xls,
}

impl Format {
    pub fn name(&self) -> &'static str {
        match self {
            Format::Xlsx => "XLSX",
            Format::Xls => "XLS",
        }
    }
}

const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];
const CFB_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Sniff the container format from the input's magic bytes.
///
/// The reader is rewound to its start afterwards. Returns `None` when the
/// leading bytes match neither container.
pub fn detect_format<R: Read + Seek>(reader: &mut R) -> Result<Option<Format>> {
    let mut magic = [0u8; 8];
    let format = match reader.read_exact(&mut magic) {
        Ok(()) => {
            if magic[..4] == ZIP_MAGIC {
                Some(Format::Xlsx)
            } else if magic == CFB_MAGIC {
                Some(Format::Xls)
            } else {
                None
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => None,
        Err(e) => return Err(e.into()),
    };
    reader.seek(SeekFrom::Start(0))?;
    Ok(format)
}

/// Convert the first worksheet of a workbook to CSV.
///
/// The input format is sniffed from magic bytes, so a `.xls` file that is
/// really a ZIP archive dispatches to the XLSX decoder and vice versa.
pub fn convert_to_csv<R: Read + Seek, W: Write>(mut reader: R, out: &mut W) -> Result<()> {
    let format = detect_format(&mut reader)?.ok_or(Error::UnknownFormat)?;
    match format {
        #[cfg(feature = "xlsx")]
        Format::Xlsx => Ok(sheetpipe_xlsx::sheet_to_csv(reader, out)?),
        #[cfg(feature = "xls")]
        Format::Xls => Ok(sheetpipe_xls::workbook_to_csv(reader, out)?),
        #[allow(unreachable_patterns)]
        other => Err(Error::Disabled(other.name())),
    }
}

/// Convert a workbook file to CSV.
pub fn convert_file<P: AsRef<Path>, W: Write>(path: P, out: &mut W) -> Result<()> {
    let file = File::open(path)?;
    convert_to_csv(file, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    #[test]
    fn test_detect_zip() {
        let mut input = Cursor::new(b"PK\x03\x04rest of archive".to_vec());
        assert_eq!(detect_format(&mut input).unwrap(), Some(Format::Xlsx));
        // Rewound for the decoder
        assert_eq!(input.position(), 0);
    }

    #[test]
    fn test_detect_compound_file() {
        let mut bytes = CFB_MAGIC.to_vec();
        bytes.extend_from_slice(&[0; 8]);
        let mut input = Cursor::new(bytes);
        assert_eq!(detect_format(&mut input).unwrap(), Some(Format::Xls));
    }

    #[test]
    fn test_detect_unknown() {
        let mut input = Cursor::new(b"name,count\nwidgets,2\n".to_vec());
        assert_eq!(detect_format(&mut input).unwrap(), None);
    }

    #[test]
    fn test_detect_short_input() {
        let mut input = Cursor::new(b"PK".to_vec());
        assert_eq!(detect_format(&mut input).unwrap(), None);
    }

    #[test]
    fn test_convert_unknown_format_rejected() {
        let mut out = Vec::new();
        let result = convert_to_csv(Cursor::new(b"plain text".to_vec()), &mut out);
        assert!(matches!(result, Err(Error::UnknownFormat)));
    }
}
