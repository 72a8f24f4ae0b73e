//! Typed event stream over a BIFF8 workbook stream.
//!
//! [`EventReader`] translates raw BIFF records into [`Event`]s and
//! synthesizes the grid structure the flat record stream leaves implicit:
//! an [`Event::EndOfRow`] when a row's cells end (including one per row the
//! source skips entirely) and an [`Event::MissingCell`] for every column gap
//! between consecutive cells of a row. The consumer can then fold events
//! into output without tracking row/column cursors of its own.

use std::collections::VecDeque;
use std::io::Read;

use crate::biff::parser::{read_f64, read_rk, read_u16, read_u32, read_u8};
use crate::biff::strings::{parse_sst, read_short_string, read_unicode_string};
use crate::biff::{self, records, BiffRecord, RecordReader};
use crate::error::{XlsError, XlsResult};

/// A decoded cell record.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub row: u32,
    pub col: u32,
    /// Index into the workbook's XF (cell style) table.
    pub xf: u16,
    pub value: CellValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// LABELSST: index into the shared string table.
    SharedString(u32),
    /// LABEL: string stored inline in the cell record.
    InlineString(String),
    /// NUMBER, RK, MULRK.
    Number(f64),
    /// BLANK, MULBLANK.
    Blank,
    /// BOOLERR (booleans and error codes are not rendered).
    BoolErr,
    /// FORMULA with its cached result.
    Formula(FormulaResult),
}

/// The cached result stored in a FORMULA record.
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaResult {
    Number(f64),
    Bool,
    Error,
    /// Cached empty-string result; no STRING record follows.
    EmptyString,
    /// The string value arrives in the STRING record that follows.
    StringPending,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// BOF of a worksheet substream.
    WorksheetStart,
    /// EOF of a worksheet substream (emitted after any pending EndOfRow).
    WorksheetEnd,
    /// BOUNDSHEET: sheet name, in workbook order.
    SheetName(String),
    /// The shared string table, fully decoded.
    SharedStrings(Vec<String>),
    /// DATEMODE: true if the workbook uses the 1904 date system.
    DateMode1904(bool),
    /// FORMAT: a number format code and its id.
    NumberFormat { id: u16, code: String },
    /// XF: one cell style, carrying its number format id. Styles are
    /// indexed by order of appearance.
    CellStyle { format_id: u16 },
    /// A decoded cell.
    Cell(Cell),
    /// Synthesized for each column gap between cells of a row.
    MissingCell { row: u32, col: u32 },
    /// Synthesized when a row's cells end; rows the source skips entirely
    /// produce one of these each.
    EndOfRow { row: u32 },
    /// STRING: the cached string result of the preceding FORMULA.
    FormulaString(String),
}

/// Streaming translator from BIFF records to [`Event`]s.
pub struct EventReader<R: Read> {
    records: RecordReader<R>,
    queue: VecDeque<Event>,
    last_row: i64,
    last_col: i64,
    row_open: bool,
    in_worksheet: bool,
    exhausted: bool,
}

impl<R: Read> EventReader<R> {
    pub fn new(inner: R) -> Self {
        EventReader {
            records: RecordReader::new(inner),
            queue: VecDeque::new(),
            last_row: -1,
            last_col: -1,
            row_open: false,
            in_worksheet: false,
            exhausted: false,
        }
    }

    pub fn next_event(&mut self) -> XlsResult<Option<Event>> {
        loop {
            if let Some(event) = self.queue.pop_front() {
                return Ok(Some(event));
            }
            if self.exhausted {
                return Ok(None);
            }
            match self.records.next_record()? {
                Some(record) => self.translate(record)?,
                None => {
                    self.exhausted = true;
                    // Stream ended without a closing EOF record
                    if self.in_worksheet {
                        self.close_worksheet();
                    }
                }
            }
        }
    }

    fn translate(&mut self, record: BiffRecord) -> XlsResult<()> {
        let data = &record.data[..];
        match record.record_type {
            records::BOF => {
                let (version, dt) = biff::parse_bof(data)?;
                if version != records::BIFF8_VERSION {
                    return Err(XlsError::UnsupportedVersion(format!(
                        "BIFF version 0x{version:04X} (only BIFF8 is supported)"
                    )));
                }
                if dt == records::BOF_WORKSHEET {
                    self.in_worksheet = true;
                    self.last_row = -1;
                    self.last_col = -1;
                    self.row_open = false;
                    self.queue.push_back(Event::WorksheetStart);
                } else {
                    // Globals, chart and macro substreams carry no cells
                    self.in_worksheet = false;
                }
            }
            records::EOF => {
                if self.in_worksheet {
                    self.close_worksheet();
                }
            }
            records::BOUNDSHEET => {
                let mut offset = 0;
                let _stream_position = read_u32(data, &mut offset)?;
                let _visibility = read_u8(data, &mut offset)?;
                let _sheet_type = read_u8(data, &mut offset)?;
                let name = read_short_string(data, &mut offset)?;
                self.queue.push_back(Event::SheetName(name));
            }
            records::SST => {
                self.queue.push_back(Event::SharedStrings(parse_sst(data)?));
            }
            records::DATEMODE => {
                let mut offset = 0;
                let mode = read_u16(data, &mut offset)?;
                self.queue.push_back(Event::DateMode1904(mode == 1));
            }
            records::FORMAT => {
                let mut offset = 0;
                let id = read_u16(data, &mut offset)?;
                let code = read_unicode_string(data, &mut offset)?;
                self.queue.push_back(Event::NumberFormat { id, code });
            }
            records::XF => {
                if data.len() >= 4 {
                    let mut offset = 2;
                    let format_id = read_u16(data, &mut offset)?;
                    self.queue.push_back(Event::CellStyle { format_id });
                } else {
                    log::warn!("XF record too short ({} bytes), skipping", data.len());
                }
            }
            records::STRING if self.in_worksheet => {
                let mut offset = 0;
                let text = read_unicode_string(data, &mut offset)?;
                self.queue.push_back(Event::FormulaString(text));
            }
            records::LABELSST
            | records::LABEL
            | records::NUMBER
            | records::RK
            | records::MULRK
            | records::BLANK
            | records::MULBLANK
            | records::BOOLERR
            | records::FORMULA
                if self.in_worksheet =>
            {
                for cell in parse_cells(record.record_type, data)? {
                    self.push_cell(cell);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close_worksheet(&mut self) {
        self.in_worksheet = false;
        if self.row_open {
            self.queue.push_back(Event::EndOfRow {
                row: self.last_row as u32,
            });
            self.row_open = false;
        }
        self.queue.push_back(Event::WorksheetEnd);
    }

    /// Queue a cell, synthesizing EndOfRow/MissingCell events for any
    /// rows and columns the stream jumped over.
    fn push_cell(&mut self, cell: Cell) {
        let row = cell.row as i64;
        let col = cell.col as i64;

        if row < self.last_row || (row == self.last_row && col <= self.last_col) {
            log::warn!("out-of-order cell record at ({}, {})", cell.row, cell.col);
            self.queue.push_back(Event::Cell(cell));
            return;
        }

        if row > self.last_row {
            if self.row_open {
                self.queue.push_back(Event::EndOfRow {
                    row: self.last_row as u32,
                });
            }
            // One EndOfRow per fully skipped row keeps grid positions intact
            for skipped in (self.last_row + 1)..row {
                self.queue.push_back(Event::EndOfRow {
                    row: skipped as u32,
                });
            }
            self.last_row = row;
            self.last_col = -1;
            self.row_open = true;
        }

        for gap in (self.last_col + 1)..col {
            self.queue.push_back(Event::MissingCell {
                row: cell.row,
                col: gap as u32,
            });
        }
        self.last_col = col;
        self.queue.push_back(Event::Cell(cell));
    }
}

/// Decode one cell record body into cells (MULRK and MULBLANK expand to
/// several).
fn parse_cells(record_type: u16, data: &[u8]) -> XlsResult<Vec<Cell>> {
    let mut offset = 0;
    let row = read_u16(data, &mut offset)? as u32;

    match record_type {
        records::MULRK => {
            let first_col = read_u16(data, &mut offset)? as u32;
            // Body: row, colFirst, then (xf, rk) pairs, then colLast
            let count = (data.len().saturating_sub(6)) / 6;
            let mut cells = Vec::with_capacity(count);
            for i in 0..count {
                let xf = read_u16(data, &mut offset)?;
                let value = read_rk(data, &mut offset)?;
                cells.push(Cell {
                    row,
                    col: first_col + i as u32,
                    xf,
                    value: CellValue::Number(value),
                });
            }
            Ok(cells)
        }
        records::MULBLANK => {
            let first_col = read_u16(data, &mut offset)? as u32;
            let count = (data.len().saturating_sub(6)) / 2;
            let mut cells = Vec::with_capacity(count);
            for i in 0..count {
                let xf = read_u16(data, &mut offset)?;
                cells.push(Cell {
                    row,
                    col: first_col + i as u32,
                    xf,
                    value: CellValue::Blank,
                });
            }
            Ok(cells)
        }
        _ => {
            let col = read_u16(data, &mut offset)? as u32;
            let xf = read_u16(data, &mut offset)?;
            let value = match record_type {
                records::LABELSST => {
                    CellValue::SharedString(read_u32(data, &mut offset)?)
                }
                records::LABEL => {
                    CellValue::InlineString(read_unicode_string(data, &mut offset)?)
                }
                records::NUMBER => CellValue::Number(read_f64(data, &mut offset)?),
                records::RK => CellValue::Number(read_rk(data, &mut offset)?),
                records::BLANK => CellValue::Blank,
                records::BOOLERR => CellValue::BoolErr,
                records::FORMULA => CellValue::Formula(parse_formula_result(data, offset)?),
                _ => {
                    return Err(XlsError::Parse(format!(
                        "unexpected cell record type 0x{record_type:04X}"
                    )))
                }
            };
            Ok(vec![Cell {
                row,
                col,
                xf,
                value,
            }])
        }
    }
}

/// Decode the 8-byte cached result field of a FORMULA record.
///
/// If the last two bytes are 0xFFFF the first byte selects a non-numeric
/// result type; otherwise the field is an IEEE 754 double.
fn parse_formula_result(data: &[u8], offset: usize) -> XlsResult<FormulaResult> {
    if data.len() < offset + 8 {
        return Err(XlsError::Parse("FORMULA record too short".into()));
    }
    let field = &data[offset..offset + 8];
    if field[6] == 0xFF && field[7] == 0xFF {
        match field[0] {
            0x00 => Ok(FormulaResult::StringPending),
            0x01 => Ok(FormulaResult::Bool),
            0x02 => Ok(FormulaResult::Error),
            0x03 => Ok(FormulaResult::EmptyString),
            other => Err(XlsError::Parse(format!(
                "unknown FORMULA result type 0x{other:02X}"
            ))),
        }
    } else {
        let mut o = offset;
        Ok(FormulaResult::Number(read_f64(data, &mut o)?))
    }
}
