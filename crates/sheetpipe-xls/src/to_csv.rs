//! Workbook events to CSV.
//!
//! The reconstruction fold over [`Event`]s: captures workbook globals
//! (shared strings, number formats, date mode) while the globals substream
//! streams past, then renders the first worksheet's cells row by row.
//! Every field is quoted; numeric cells are normalized (integral values
//! print without decimal places) rather than display-formatted, except for
//! formula results, which render through their cell's number format.

use std::collections::HashMap;
use std::io::{Read, Seek, Write};

use sheetpipe_core::format::{format_number, xls_number};
use sheetpipe_core::row::escape_quoted;
use sheetpipe_core::{Baseline, NumberFormat, SharedStrings};

use crate::error::{XlsError, XlsResult};
use crate::stream::{Cell, CellValue, Event, EventReader, FormulaResult};

/// Streaming CSV emitter folding workbook events.
struct WorkbookToCsv<'a, W: Write> {
    out: &'a mut W,
    shared_strings: SharedStrings,
    /// FORMAT records: format id to format code.
    formats: HashMap<u16, NumberFormat>,
    /// XF records in order of appearance; each carries its format id.
    cell_styles: Vec<u16>,
    date_1904: bool,
    sheet_names: Vec<String>,
    /// -1 before any worksheet, 0 inside the first.
    sheet_index: i64,
    baseline: Baseline,
    /// Cells seen in row 0, which fix the baseline.
    header_cells: i64,
    /// Highest column rendered (or consumed) in the current row.
    last_col: i64,
    /// A formula cell whose string result is still to arrive.
    pending_formula: Option<(u32, u32)>,
}

enum Flow {
    Continue,
    /// First worksheet fully rendered; remaining input is irrelevant.
    Done,
}

impl<'a, W: Write> WorkbookToCsv<'a, W> {
    fn new(out: &'a mut W) -> Self {
        WorkbookToCsv {
            out,
            shared_strings: SharedStrings::default(),
            formats: HashMap::new(),
            cell_styles: Vec::new(),
            date_1904: false,
            sheet_names: Vec::new(),
            sheet_index: -1,
            baseline: Baseline::new(),
            header_cells: 0,
            last_col: -1,
            pending_formula: None,
        }
    }

    /// The number format of a cell, through its XF (cell style) index.
    fn format_of(&self, xf: u16) -> NumberFormat {
        let format_id = match self.cell_styles.get(xf as usize) {
            Some(id) => *id,
            None => return NumberFormat::General,
        };
        match self.formats.get(&format_id) {
            Some(format) => format.clone(),
            None => NumberFormat::from_id(format_id as u32),
        }
    }

    /// Write one field: separator comma for any column but the first, then
    /// the quoted text.
    fn emit_field(&mut self, col: u32, text: &str) -> XlsResult<()> {
        if col > 0 {
            self.out.write_all(b",")?;
        }
        self.out.write_all(escape_quoted(text).as_bytes())?;
        Ok(())
    }

    fn apply(&mut self, event: Event) -> XlsResult<Flow> {
        match event {
            Event::SheetName(name) => self.sheet_names.push(name),
            Event::SharedStrings(strings) => self.shared_strings.load(strings),
            Event::DateMode1904(mode) => self.date_1904 = mode,
            Event::NumberFormat { id, code } => {
                self.formats.insert(id, NumberFormat::from_code(code));
            }
            Event::CellStyle { format_id } => self.cell_styles.push(format_id),
            Event::WorksheetStart => {
                self.sheet_index += 1;
                if self.sheet_index > 0 {
                    return Ok(Flow::Done);
                }
                self.last_col = -1;
            }
            Event::WorksheetEnd => {
                if self.sheet_index == 0 {
                    if self.pending_formula.is_some() {
                        log::warn!("formula string result missing at end of sheet");
                    }
                    return Ok(Flow::Done);
                }
            }
            Event::Cell(cell) => {
                if self.sheet_index == 0 {
                    self.cell(cell)?;
                }
            }
            Event::MissingCell { col, .. } => {
                if self.sheet_index == 0 {
                    self.emit_field(col, "")?;
                    self.last_col = col as i64;
                }
            }
            Event::FormulaString(text) => {
                if self.sheet_index == 0 {
                    let (_, col) = self.pending_formula.take().ok_or_else(|| {
                        XlsError::Parse("STRING record with no preceding string formula".into())
                    })?;
                    self.emit_field(col, &text)?;
                    self.last_col = col as i64;
                }
            }
            Event::EndOfRow { .. } => {
                if self.sheet_index == 0 {
                    self.baseline.finish_row(self.out, self.last_col)?;
                    self.last_col = -1;
                }
            }
        }
        Ok(Flow::Continue)
    }

    fn cell(&mut self, cell: Cell) -> XlsResult<()> {
        // Row 0 fixes the baseline: one field per real cell record
        if cell.row == 0 {
            self.header_cells += 1;
            self.baseline.raise(self.header_cells);
        }

        let text = match cell.value {
            CellValue::SharedString(index) => {
                // A LABELSST before (or without) the SST renders empty
                self.shared_strings.get(index as usize).to_string()
            }
            CellValue::InlineString(text) => text,
            CellValue::Number(value) => xls_number(value),
            CellValue::Blank | CellValue::BoolErr => String::new(),
            CellValue::Formula(FormulaResult::Number(value)) => {
                format_number(value, &self.format_of(cell.xf), self.date_1904)
            }
            CellValue::Formula(
                FormulaResult::Bool | FormulaResult::Error | FormulaResult::EmptyString,
            ) => String::new(),
            CellValue::Formula(FormulaResult::StringPending) => {
                if let Some((row, col)) = self.pending_formula {
                    return Err(XlsError::Parse(format!(
                        "string formula at ({}, {}) while the one at ({row}, {col}) \
                         is still awaiting its STRING record",
                        cell.row, cell.col
                    )));
                }
                // Nothing to render yet; the STRING record completes it
                self.pending_formula = Some((cell.row, cell.col));
                self.last_col = cell.col as i64;
                return Ok(());
            }
        };

        self.emit_field(cell.col, &text)?;
        self.last_col = cell.col as i64;
        Ok(())
    }

    /// Name of the sheet currently being decoded, for error context.
    fn current_sheet(&self) -> Option<&str> {
        if self.sheet_index < 0 {
            return None;
        }
        self.sheet_names
            .get(self.sheet_index as usize)
            .map(String::as_str)
    }

    fn wrap(&self, error: XlsError) -> XlsError {
        match self.current_sheet() {
            Some(name) => error.in_sheet(name),
            None => error,
        }
    }
}

/// Convert the first worksheet of an XLS workbook to CSV.
///
/// `reader` must be the full compound file (the container directory requires
/// random access); `out` receives finished CSV rows incrementally.
pub fn workbook_to_csv<R: Read + Seek, W: Write>(reader: R, out: &mut W) -> XlsResult<()> {
    let mut compound = cfb::CompoundFile::open(reader)?;

    // BIFF8 writes "Workbook"; some producers use the BIFF5 name "Book"
    // (the BOF version check still rejects actual BIFF5 content)
    let stream_name = ["/Workbook", "/Book"]
        .into_iter()
        .find(|path| compound.exists(path))
        .ok_or_else(|| XlsError::InvalidFormat("no workbook stream in container".into()))?;
    let stream = compound.open_stream(stream_name)?;

    let mut events = EventReader::new(std::io::BufReader::new(stream));
    let mut converter = WorkbookToCsv::new(out);

    loop {
        let event = match events.next_event() {
            Ok(Some(event)) => event,
            Ok(None) => return Ok(()),
            Err(error) => return Err(converter.wrap(error)),
        };
        match converter.apply(event) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Done) => return Ok(()),
            Err(error) => return Err(converter.wrap(error)),
        }
    }
}
