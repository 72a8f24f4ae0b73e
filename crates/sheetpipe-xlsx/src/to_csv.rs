//! Sheet events to CSV.
//!
//! The reconstruction fold: tracks the row/column cursor, fills gaps the
//! sparse event stream leaves implicit (skipped rows, skipped columns),
//! establishes the column-count baseline from the header row, and writes
//! each row to the sink the moment it completes.

use std::io::{Read, Seek, Write};

use crate::error::{XlsxError, XlsxResult};
use crate::package::XlsxPackage;
use crate::sheet::{parse_sheet, SheetContext, SheetSink};
use sheetpipe_core::{reference, row, Baseline};

/// Streaming CSV emitter for one worksheet's event sequence.
pub struct SheetToCsv<'a, W: Write> {
    out: &'a mut W,
    baseline: Baseline,
    /// Width of the header row, fixed at the end of row 0.
    header_width: i64,
    current_row: i64,
    current_col: i64,
    first_cell_of_row: bool,
}

impl<'a, W: Write> SheetToCsv<'a, W> {
    pub fn new(out: &'a mut W) -> Self {
        SheetToCsv {
            out,
            baseline: Baseline::new(),
            header_width: -1,
            current_row: -1,
            current_col: -1,
            first_cell_of_row: true,
        }
    }
}

impl<W: Write> SheetSink for SheetToCsv<'_, W> {
    fn row_start(&mut self, row: u32) -> XlsxResult<()> {
        // Source skipped whole rows: emit a blank padded line for each so
        // output row positions stay faithful to the grid
        let skipped = row as i64 - self.current_row - 1;
        self.baseline.blank_rows(self.out, skipped)?;

        self.first_cell_of_row = true;
        self.current_row = row as i64;
        self.current_col = -1;
        Ok(())
    }

    fn cell(&mut self, cell_ref: Option<&str>, value: Option<&str>) -> XlsxResult<()> {
        if self.first_cell_of_row {
            self.first_cell_of_row = false;
        } else {
            self.out.write_all(b",")?;
        }

        // Synthesize a missing reference from the cursor
        let synthesized;
        let cell_ref = match cell_ref {
            Some(r) => r,
            None => {
                let col = (self.current_col + 1).max(0) as u16;
                synthesized = reference::format(self.current_row.max(0) as u32, col);
                &synthesized
            }
        };

        // Emit a comma for every column the stream skipped over
        let this_col = reference::column_of(cell_ref)? as i64;
        let missed = this_col - self.current_col - 1;
        for _ in 0..missed {
            self.out.write_all(b",")?;
        }

        // A value-less cell contributes nothing (and does not move the
        // cursor)
        let value = match value {
            Some(v) => v,
            None => return Ok(()),
        };

        self.current_col = this_col;

        if row::is_numeric_text(value) {
            self.out.write_all(value.as_bytes())?;
        } else {
            self.out.write_all(row::escape_quoted(value).as_bytes())?;
        }
        Ok(())
    }

    fn row_end(&mut self, row: u32) -> XlsxResult<()> {
        if row == 0 {
            self.header_width = self.current_col + 1;
        }
        self.baseline.raise(self.header_width);
        self.baseline.finish_row(self.out, self.current_col)?;
        Ok(())
    }
}

/// Convert the first worksheet of an XLSX workbook to CSV.
///
/// `reader` must be the full package (random access is required by the ZIP
/// container); `out` receives finished CSV rows incrementally.
pub fn sheet_to_csv<R: Read + Seek, W: Write>(reader: R, out: &mut W) -> XlsxResult<()> {
    let mut package = XlsxPackage::open(reader)?;

    let shared_strings = package.shared_strings()?;
    let formats = package.number_formats()?;
    let date_1904 = package.date_1904()?;
    let (sheet_name, sheet_path) = package.first_sheet()?;

    log::debug!("converting sheet '{sheet_name}' ({sheet_path})");

    let ctx = SheetContext {
        shared_strings: &shared_strings,
        formats: &formats,
        date_1904,
    };

    let mut sink = SheetToCsv::new(out);
    let part = package.sheet_part(&sheet_path)?;
    parse_sheet(std::io::BufReader::new(part), &ctx, &mut sink)
        .map_err(|e| e.in_sheet(&sheet_name))
}
