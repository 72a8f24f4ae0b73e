//! Number-format extraction from `xl/styles.xml`.
//!
//! The converter ignores every styling concern except the number format:
//! custom `<numFmt>` codes plus the `numFmtId` of each `<xf>` in
//! `<cellXfs>`, which cells reference through their `s` attribute.

use std::collections::HashMap;
use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use sheetpipe_core::NumberFormat;

/// Parse styles XML into one `NumberFormat` per cell XF index.
pub fn read_number_formats<R: BufRead>(reader: R) -> XlsxResult<Vec<NumberFormat>> {
    let mut xml_reader = Reader::from_reader(reader);
    xml_reader.trim_text(true);

    let mut buf = Vec::new();
    let mut custom_codes: HashMap<u32, String> = HashMap::new();
    let mut xf_format_ids: Vec<u32> = Vec::new();
    let mut in_cell_xfs = false;

    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) => match e.name().as_ref() {
                b"numFmt" => {
                    let mut id = None;
                    let mut code = None;
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"numFmtId" => {
                                id = attr
                                    .unescape_value()
                                    .ok()
                                    .and_then(|v| v.parse::<u32>().ok());
                            }
                            b"formatCode" => {
                                code = attr.unescape_value().ok().map(|v| v.to_string());
                            }
                            _ => {}
                        }
                    }
                    if let (Some(id), Some(code)) = (id, code) {
                        custom_codes.insert(id, code);
                    }
                }
                b"cellXfs" => {
                    in_cell_xfs = true;
                }
                b"xf" if in_cell_xfs => {
                    let mut num_fmt_id = 0u32;
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"numFmtId" {
                            num_fmt_id = attr
                                .unescape_value()
                                .ok()
                                .and_then(|v| v.parse::<u32>().ok())
                                .unwrap_or(0);
                        }
                    }
                    xf_format_ids.push(num_fmt_id);
                }
                _ => {}
            },
            Ok(Event::End(e)) if e.name().as_ref() == b"cellXfs" => {
                in_cell_xfs = false;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    let mut formats: Vec<NumberFormat> = xf_format_ids
        .iter()
        .map(|&id| resolve_format(id, &custom_codes))
        .collect();
    if formats.is_empty() {
        formats.push(NumberFormat::General);
    }
    Ok(formats)
}

/// Resolve a numFmtId to a format: custom codes first, built-ins otherwise.
fn resolve_format(id: u32, custom_codes: &HashMap<u32, String>) -> NumberFormat {
    match custom_codes.get(&id) {
        Some(code) => NumberFormat::from_code(code.clone()),
        None => NumberFormat::from_id(id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const STYLES: &str = r#"<?xml version="1.0"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="1">
    <numFmt numFmtId="164" formatCode="yyyy/mm/dd"/>
  </numFmts>
  <cellXfs count="3">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
    <xf numFmtId="14" applyNumberFormat="1"/>
    <xf numFmtId="164" applyNumberFormat="1"/>
  </cellXfs>
</styleSheet>"#;

    #[test]
    fn test_read_number_formats() {
        let formats = read_number_formats(Cursor::new(STYLES)).unwrap();
        assert_eq!(formats.len(), 3);
        assert_eq!(formats[0], NumberFormat::General);
        assert_eq!(formats[1], NumberFormat::BuiltIn(14));
        assert_eq!(formats[2], NumberFormat::Custom("yyyy/mm/dd".into()));
        assert!(formats[1].is_date());
        assert!(formats[2].is_date());
    }

    #[test]
    fn test_empty_styles_default_to_general() {
        let formats =
            read_number_formats(Cursor::new("<styleSheet></styleSheet>")).unwrap();
        assert_eq!(formats, vec![NumberFormat::General]);
    }
}
