//! Streaming worksheet tokenizer.
//!
//! Walks a worksheet part with a pull parser and drives a [`SheetSink`]
//! with row-start / cell / row-end events. Cell values are resolved and
//! display-formatted here (shared strings, inline strings, booleans,
//! errors, cached formula results, number formats), so the sink only ever
//! sees final text.

use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use crate::package::decode_excel_escapes;
use sheetpipe_core::{format, NumberFormat, SharedStrings};

/// Receiver for sheet events, one worksheet at a time, rows in order.
pub trait SheetSink {
    /// A row begins (`row` is 0-based).
    fn row_start(&mut self, row: u32) -> XlsxResult<()>;

    /// A cell within the current row. `reference` is the A1-style
    /// reference if the source carried one; `value` is the formatted
    /// display text, absent for value-less cells.
    fn cell(&mut self, reference: Option<&str>, value: Option<&str>) -> XlsxResult<()>;

    /// The current row ends.
    fn row_end(&mut self, row: u32) -> XlsxResult<()>;
}

/// Resolution context shared by every cell of the sheet.
pub struct SheetContext<'a> {
    pub shared_strings: &'a SharedStrings,
    pub formats: &'a [NumberFormat],
    pub date_1904: bool,
}

impl SheetContext<'_> {
    fn format_of(&self, style_index: Option<u32>) -> &NumberFormat {
        style_index
            .and_then(|s| self.formats.get(s as usize))
            .unwrap_or(&NumberFormat::General)
    }
}

// Cell value type, from the `t` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
enum CellType {
    #[default]
    Number,
    SharedString,
    InlineString,
    FormulaString,
    Boolean,
    Error,
}

impl CellType {
    fn from_attr(t: &str) -> Self {
        match t {
            "s" => CellType::SharedString,
            "inlineStr" => CellType::InlineString,
            "str" => CellType::FormulaString,
            "b" => CellType::Boolean,
            "e" => CellType::Error,
            _ => CellType::Number,
        }
    }
}

/// Attributes of a `<c>` element: (reference, type, style index).
fn cell_attrs(e: &quick_xml::events::BytesStart<'_>) -> (Option<String>, CellType, Option<u32>) {
    let mut reference = None;
    let mut cell_type = CellType::Number;
    let mut style = None;
    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"r" => {
                reference = attr.unescape_value().ok().map(|v| v.to_string());
            }
            b"t" => {
                if let Ok(v) = attr.unescape_value() {
                    cell_type = CellType::from_attr(&v);
                }
            }
            b"s" => {
                style = attr
                    .unescape_value()
                    .ok()
                    .and_then(|v| v.parse::<u32>().ok());
            }
            _ => {}
        }
    }
    (reference, cell_type, style)
}

/// The 1-based `r` attribute of a `<row>` element.
fn row_attr(e: &quick_xml::events::BytesStart<'_>) -> Option<u32> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == b"r" {
            return attr
                .unescape_value()
                .ok()
                .and_then(|v| v.parse::<u32>().ok());
        }
    }
    None
}

/// Walk one worksheet part, pushing events into `sink`.
pub fn parse_sheet<R: BufRead, S: SheetSink>(
    reader: R,
    ctx: &SheetContext<'_>,
    sink: &mut S,
) -> XlsxResult<()> {
    let mut xml_reader = Reader::from_reader(reader);
    xml_reader.trim_text(true);

    let mut buf = Vec::new();

    let mut current_row: i64 = -1;
    let mut in_row = false;

    // Per-cell state
    let mut cell_ref: Option<String> = None;
    let mut cell_type = CellType::Number;
    let mut cell_style: Option<u32> = None;
    let mut cell_value: Option<String> = None;
    let mut in_cell = false;
    let mut in_value = false;
    let mut in_inline_text = false;

    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"row" => {
                    // `r` is 1-based; a missing attribute means the row
                    // right after the previous one
                    let row = match row_attr(&e) {
                        Some(r) if r > 0 => (r - 1) as i64,
                        _ => current_row + 1,
                    };
                    current_row = row;
                    in_row = true;
                    sink.row_start(row as u32)?;
                }
                b"c" if in_row => {
                    let (reference, ty, style) = cell_attrs(&e);
                    cell_ref = reference;
                    cell_type = ty;
                    cell_style = style;
                    cell_value = None;
                    in_cell = true;
                }
                b"v" if in_cell => {
                    in_value = true;
                }
                b"t" if in_cell && cell_type == CellType::InlineString => {
                    in_inline_text = true;
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"row" => {
                    let row = match row_attr(&e) {
                        Some(r) if r > 0 => (r - 1) as i64,
                        _ => current_row + 1,
                    };
                    current_row = row;
                    sink.row_start(row as u32)?;
                    sink.row_end(row as u32)?;
                }
                b"c" if in_row => {
                    // Self-closing cell: present but value-less
                    let (reference, _, _) = cell_attrs(&e);
                    sink.cell(reference.as_deref(), None)?;
                }
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"row" if in_row => {
                    in_row = false;
                    sink.row_end(current_row as u32)?;
                }
                b"c" if in_cell => {
                    in_cell = false;
                    let formatted = format_cell_value(
                        ctx,
                        cell_type,
                        cell_style,
                        cell_value.take().as_deref(),
                    );
                    sink.cell(cell_ref.as_deref(), formatted.as_deref())?;
                }
                b"v" => {
                    in_value = false;
                }
                b"t" => {
                    in_inline_text = false;
                }
                b"sheetData" => {
                    // Nothing after sheetData matters to the conversion
                    break;
                }
                _ => {}
            },
            Ok(Event::Text(e)) if in_value || in_inline_text => {
                if let Ok(text) = e.unescape() {
                    cell_value.get_or_insert_with(String::new).push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

/// Resolve a raw cell payload to its display text.
fn format_cell_value(
    ctx: &SheetContext<'_>,
    cell_type: CellType,
    style: Option<u32>,
    raw: Option<&str>,
) -> Option<String> {
    let raw = raw?;
    let text = match cell_type {
        CellType::SharedString => {
            let idx: usize = raw.trim().parse().ok()?;
            ctx.shared_strings.get(idx).to_string()
        }
        CellType::InlineString | CellType::FormulaString => {
            decode_excel_escapes(raw)
        }
        CellType::Boolean => {
            if raw.trim() == "0" {
                "FALSE".to_string()
            } else {
                "TRUE".to_string()
            }
        }
        CellType::Error => raw.to_string(),
        CellType::Number => {
            let value: f64 = match raw.trim().parse() {
                Ok(v) => v,
                // Malformed numeric payload: surface it raw rather than fail
                Err(_) => return Some(raw.to_string()),
            };
            format::format_number(value, ctx.format_of(style), ctx.date_1904)
        }
    };
    Some(text)
}
