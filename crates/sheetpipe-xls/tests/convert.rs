//! End-to-end conversion tests against synthesized BIFF8 workbooks.
//!
//! Each test builds a raw BIFF record stream, wraps it in a real compound
//! file container, and asserts the exact CSV bytes.

use std::io::{Cursor, Write};

use pretty_assertions::assert_eq;
use sheetpipe_xls::{workbook_to_csv, XlsError};

mod biff {
    pub const BOF: u16 = 0x0809;
    pub const EOF: u16 = 0x000A;
    pub const BOUNDSHEET: u16 = 0x0085;
    pub const SST: u16 = 0x00FC;
    pub const DATEMODE: u16 = 0x0022;
    pub const FORMAT: u16 = 0x041E;
    pub const XF: u16 = 0x00E0;
    pub const LABELSST: u16 = 0x00FD;
    pub const LABEL: u16 = 0x0204;
    pub const NUMBER: u16 = 0x0203;
    pub const RK: u16 = 0x027E;
    pub const FORMULA: u16 = 0x0006;
    pub const STRING: u16 = 0x0207;

    pub const GLOBALS: u16 = 0x0005;
    pub const WORKSHEET: u16 = 0x0010;
}

fn record(record_type: u16, body: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&record_type.to_le_bytes());
    bytes.extend_from_slice(&(body.len() as u16).to_le_bytes());
    bytes.extend_from_slice(body);
    bytes
}

fn bof(dt: u16) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&0x0600u16.to_le_bytes());
    body.extend_from_slice(&dt.to_le_bytes());
    record(biff::BOF, &body)
}

fn boundsheet(name: &str) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&0u32.to_le_bytes()); // stream offset (unused)
    body.push(0); // visible
    body.push(0); // worksheet
    body.push(name.len() as u8);
    body.push(0); // compressed characters
    body.extend_from_slice(name.as_bytes());
    record(biff::BOUNDSHEET, &body)
}

fn sst(strings: &[&str]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&(strings.len() as u32).to_le_bytes());
    body.extend_from_slice(&(strings.len() as u32).to_le_bytes());
    for s in strings {
        body.extend_from_slice(&(s.len() as u16).to_le_bytes());
        body.push(0);
        body.extend_from_slice(s.as_bytes());
    }
    record(biff::SST, &body)
}

fn format_record(id: u16, code: &str) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&id.to_le_bytes());
    body.extend_from_slice(&(code.len() as u16).to_le_bytes());
    body.push(0);
    body.extend_from_slice(code.as_bytes());
    record(biff::FORMAT, &body)
}

fn xf(format_id: u16) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&0u16.to_le_bytes()); // font
    body.extend_from_slice(&format_id.to_le_bytes());
    body.extend_from_slice(&[0; 16]); // style bits (unused)
    record(biff::XF, &body)
}

fn cell_header(row: u16, col: u16, xf: u16) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&row.to_le_bytes());
    body.extend_from_slice(&col.to_le_bytes());
    body.extend_from_slice(&xf.to_le_bytes());
    body
}

fn label(row: u16, col: u16, text: &str) -> Vec<u8> {
    let mut body = cell_header(row, col, 0);
    body.extend_from_slice(&(text.len() as u16).to_le_bytes());
    body.push(0);
    body.extend_from_slice(text.as_bytes());
    record(biff::LABEL, &body)
}

fn labelsst(row: u16, col: u16, index: u32) -> Vec<u8> {
    let mut body = cell_header(row, col, 0);
    body.extend_from_slice(&index.to_le_bytes());
    record(biff::LABELSST, &body)
}

fn number(row: u16, col: u16, xf_index: u16, value: f64) -> Vec<u8> {
    let mut body = cell_header(row, col, xf_index);
    body.extend_from_slice(&value.to_le_bytes());
    record(biff::NUMBER, &body)
}

fn rk_int(row: u16, col: u16, value: i32) -> Vec<u8> {
    let mut body = cell_header(row, col, 0);
    body.extend_from_slice(&(((value << 2) as u32) | 0x02).to_le_bytes());
    record(biff::RK, &body)
}

fn formula_number(row: u16, col: u16, xf_index: u16, value: f64) -> Vec<u8> {
    let mut body = cell_header(row, col, xf_index);
    body.extend_from_slice(&value.to_le_bytes());
    body.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 0]); // flags + chn + cce
    record(biff::FORMULA, &body)
}

fn formula_string_pending(row: u16, col: u16) -> Vec<u8> {
    let mut body = cell_header(row, col, 0);
    body.extend_from_slice(&[0x00, 0, 0, 0, 0, 0, 0xFF, 0xFF]);
    body.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 0]);
    record(biff::FORMULA, &body)
}

fn string_result(text: &str) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&(text.len() as u16).to_le_bytes());
    body.push(0);
    body.extend_from_slice(text.as_bytes());
    record(biff::STRING, &body)
}

struct Workbook {
    globals: Vec<u8>,
    sheets: Vec<Vec<u8>>,
}

impl Workbook {
    fn new() -> Self {
        Workbook {
            globals: Vec::new(),
            sheets: Vec::new(),
        }
    }

    fn global(mut self, record: Vec<u8>) -> Self {
        self.globals.extend(record);
        self
    }

    fn sheet(mut self, cells: Vec<Vec<u8>>) -> Self {
        self.sheets.push(cells.into_iter().flatten().collect());
        self
    }

    /// Assemble the BIFF stream and wrap it in a compound file.
    fn build(self) -> Vec<u8> {
        let mut stream = Vec::new();
        stream.extend(bof(biff::GLOBALS));
        stream.extend(self.globals);
        stream.extend(record(biff::EOF, &[]));
        for sheet in self.sheets {
            stream.extend(bof(biff::WORKSHEET));
            stream.extend(sheet);
            stream.extend(record(biff::EOF, &[]));
        }
        wrap_in_cfb("/Workbook", &stream)
    }
}

fn wrap_in_cfb(stream_name: &str, stream: &[u8]) -> Vec<u8> {
    let cursor = Cursor::new(Vec::new());
    let mut compound = cfb::CompoundFile::create(cursor).unwrap();
    {
        let mut s = compound.create_stream(stream_name).unwrap();
        s.write_all(stream).unwrap();
    }
    compound.flush().unwrap();
    compound.into_inner().into_inner()
}

fn convert(container: Vec<u8>) -> Result<String, XlsError> {
    let mut out = Vec::new();
    workbook_to_csv(Cursor::new(container), &mut out)?;
    Ok(String::from_utf8(out).unwrap())
}

#[test]
fn test_labels_and_numbers_all_quoted() {
    let container = Workbook::new()
        .global(boundsheet("Sheet1"))
        .sheet(vec![
            label(0, 0, "name"),
            label(0, 1, "count"),
            label(1, 0, "widgets"),
            number(1, 1, 0, 1_000_000.0),
        ])
        .build();

    assert_eq!(
        convert(container).unwrap(),
        "\"name\",\"count\"\n\"widgets\",\"1000000\"\n"
    );
}

#[test]
fn test_shared_strings_resolved() {
    let container = Workbook::new()
        .global(boundsheet("Sheet1"))
        .global(sst(&["alpha", "beta"]))
        .sheet(vec![labelsst(0, 0, 1), labelsst(0, 1, 0)])
        .build();

    assert_eq!(convert(container).unwrap(), "\"beta\",\"alpha\"\n");
}

#[test]
fn test_shared_string_without_table_is_empty() {
    let container = Workbook::new()
        .global(boundsheet("Sheet1"))
        .sheet(vec![labelsst(0, 0, 3), label(0, 1, "b")])
        .build();

    assert_eq!(convert(container).unwrap(), "\"\",\"b\"\n");
}

#[test]
fn test_skipped_rows_and_column_gaps() {
    let container = Workbook::new()
        .global(boundsheet("Sheet1"))
        .sheet(vec![
            label(0, 0, "A"),
            label(0, 1, "B"),
            label(0, 2, "C"),
            // rows 1-2 absent; row 3 starts at column 2
            label(3, 2, "x"),
        ])
        .build();

    assert_eq!(
        convert(container).unwrap(),
        "\"A\",\"B\",\"C\"\n,,\n,,\n\"\",\"\",\"x\"\n"
    );
}

#[test]
fn test_short_rows_padded_to_header_width() {
    let container = Workbook::new()
        .global(boundsheet("Sheet1"))
        .sheet(vec![
            label(0, 0, "A"),
            label(0, 1, "B"),
            label(0, 2, "C"),
            label(1, 0, "only"),
        ])
        .build();

    assert_eq!(
        convert(container).unwrap(),
        "\"A\",\"B\",\"C\"\n\"only\",,\n"
    );
}

#[test]
fn test_rk_and_fractional_numbers() {
    let container = Workbook::new()
        .global(boundsheet("Sheet1"))
        .sheet(vec![rk_int(0, 0, 42), number(0, 1, 0, 3.25)])
        .build();

    assert_eq!(convert(container).unwrap(), "\"42\",\"3.25\"\n");
}

#[test]
fn test_formula_cached_number_uses_cell_format() {
    let container = Workbook::new()
        .global(boundsheet("Sheet1"))
        .global(format_record(164, "yyyy-mm-dd"))
        .global(xf(164))
        .sheet(vec![formula_number(0, 0, 0, 45000.0)])
        .build();

    assert_eq!(convert(container).unwrap(), "\"2023-03-15\"\n");
}

#[test]
fn test_plain_number_is_normalized_not_date_formatted() {
    let container = Workbook::new()
        .global(boundsheet("Sheet1"))
        .global(format_record(164, "yyyy-mm-dd"))
        .global(xf(164))
        .sheet(vec![number(0, 0, 0, 45000.0)])
        .build();

    assert_eq!(convert(container).unwrap(), "\"45000\"\n");
}

#[test]
fn test_formula_string_result_via_string_record() {
    let container = Workbook::new()
        .global(boundsheet("Sheet1"))
        .sheet(vec![
            label(0, 0, "h"),
            formula_string_pending(1, 0),
            string_result("joined"),
            label(1, 1, "tail"),
        ])
        .build();

    assert_eq!(convert(container).unwrap(), "\"h\"\n\"joined\",\"tail\"\n");
}

#[test]
fn test_orphan_string_record_fails_with_sheet_name() {
    let container = Workbook::new()
        .global(boundsheet("Broken"))
        .sheet(vec![string_result("stray")])
        .build();

    let err = convert(container).unwrap_err();
    match err {
        XlsError::Sheet { name, source } => {
            assert_eq!(name, "Broken");
            assert!(matches!(*source, XlsError::Parse(_)));
        }
        other => panic!("expected sheet error, got {other:?}"),
    }
}

#[test]
fn test_only_first_worksheet_converted() {
    let container = Workbook::new()
        .global(boundsheet("First"))
        .global(boundsheet("Second"))
        .sheet(vec![label(0, 0, "first")])
        .sheet(vec![label(0, 0, "second")])
        .build();

    assert_eq!(convert(container).unwrap(), "\"first\"\n");
}

#[test]
fn test_quotes_escaped_in_output() {
    let container = Workbook::new()
        .global(boundsheet("Sheet1"))
        .sheet(vec![label(0, 0, "say \"hi\""), label(0, 1, "\"wrapped\"")])
        .build();

    assert_eq!(
        convert(container).unwrap(),
        "\"say \"\"hi\"\"\",\"wrapped\"\n"
    );
}

#[test]
fn test_biff5_rejected() {
    let mut stream = Vec::new();
    let mut body = Vec::new();
    body.extend_from_slice(&0x0500u16.to_le_bytes());
    body.extend_from_slice(&biff::GLOBALS.to_le_bytes());
    stream.extend(record(biff::BOF, &body));
    stream.extend(record(biff::EOF, &[]));

    let container = wrap_in_cfb("/Workbook", &stream);
    assert!(matches!(
        convert(container),
        Err(XlsError::UnsupportedVersion(_))
    ));
}

#[test]
fn test_container_without_workbook_stream_rejected() {
    let container = wrap_in_cfb("/SomethingElse", &[]);
    assert!(matches!(convert(container), Err(XlsError::InvalidFormat(_))));
}

#[test]
fn test_non_compound_input_rejected() {
    let junk = b"this is not a spreadsheet".to_vec();
    assert!(convert(junk).is_err());
}
