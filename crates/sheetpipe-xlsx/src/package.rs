//! XLSX package access.
//!
//! Opens the ZIP container and exposes the parts the converter needs: the
//! shared string table, the number-format styles, the workbook's date mode,
//! and the raw stream of the first worksheet.

use std::collections::HashMap;
use std::io::{BufReader, Read, Seek};

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use sheetpipe_core::SharedStrings;

/// An opened XLSX package.
pub struct XlsxPackage<R: Read + Seek> {
    archive: zip::ZipArchive<R>,
}

impl<R: Read + Seek> XlsxPackage<R> {
    /// Open a package from any `Read + Seek` source.
    pub fn open(reader: R) -> XlsxResult<Self> {
        let mut archive = zip::ZipArchive::new(reader)?;

        // Verify this is an XLSX file
        if archive.by_name("[Content_Types].xml").is_err() {
            return Err(XlsxError::InvalidFormat(
                "Missing [Content_Types].xml".into(),
            ));
        }

        Ok(XlsxPackage { archive })
    }

    /// Read the shared strings table (absence is valid: empty table).
    pub fn shared_strings(&mut self) -> XlsxResult<SharedStrings> {
        let mut strings = SharedStrings::new();

        let file = match self.archive.by_name("xl/sharedStrings.xml") {
            Ok(f) => f,
            Err(_) => return Ok(strings),
        };

        let reader = BufReader::new(file);
        let mut xml_reader = Reader::from_reader(reader);
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut current_string = String::new();
        let mut in_si = false;
        let mut in_t = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"si" => {
                        in_si = true;
                        current_string.clear();
                    }
                    b"t" if in_si => {
                        in_t = true;
                    }
                    _ => {}
                },
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"si" => {
                        strings.push(decode_excel_escapes(&current_string));
                        current_string.clear();
                        in_si = false;
                    }
                    b"t" => {
                        in_t = false;
                    }
                    _ => {}
                },
                Ok(Event::Text(e)) if in_t => {
                    if let Ok(text) = e.unescape() {
                        current_string.push_str(&text);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(strings)
    }

    /// Read the per-style number formats from `xl/styles.xml`.
    ///
    /// A missing styles part is valid and leaves every cell on General.
    pub fn number_formats(&mut self) -> XlsxResult<Vec<sheetpipe_core::NumberFormat>> {
        let file = match self.archive.by_name("xl/styles.xml") {
            Ok(f) => f,
            Err(_) => return Ok(vec![sheetpipe_core::NumberFormat::General]),
        };
        crate::styles::read_number_formats(BufReader::new(file))
    }

    /// Whether the workbook uses the 1904 date system.
    pub fn date_1904(&mut self) -> XlsxResult<bool> {
        let file = match self.archive.by_name("xl/workbook.xml") {
            Ok(f) => f,
            Err(_) => return Ok(false),
        };

        let reader = BufReader::new(file);
        let mut xml_reader = Reader::from_reader(reader);
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e))
                    if e.name().as_ref() == b"workbookPr" =>
                {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"date1904" {
                            if let Ok(v) = attr.unescape_value() {
                                return Ok(v == "1" || v == "true");
                            }
                        }
                    }
                    return Ok(false);
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(false)
    }

    /// Locate the first worksheet: returns `(sheet_name, part_path)`.
    pub fn first_sheet(&mut self) -> XlsxResult<(String, String)> {
        let sheets = self.read_workbook_xml()?;
        let rels = self.read_workbook_rels()?;

        for (name, r_id) in sheets {
            if let Some(path) = rels.get(&r_id) {
                return Ok((name, path.clone()));
            }
        }

        Err(XlsxError::MissingPart("no worksheet in workbook".into()))
    }

    /// Open a worksheet part for streaming.
    pub fn sheet_part(&mut self, path: &str) -> XlsxResult<impl Read + '_> {
        self.archive
            .by_name(path)
            .map_err(|_| XlsxError::MissingPart(path.to_string()))
    }

    /// Read workbook.xml to get sheet names and rIds (in workbook order).
    fn read_workbook_xml(&mut self) -> XlsxResult<Vec<(String, String)>> {
        let file = self
            .archive
            .by_name("xl/workbook.xml")
            .map_err(|_| XlsxError::MissingPart("xl/workbook.xml".into()))?;

        let reader = BufReader::new(file);
        let mut xml_reader = Reader::from_reader(reader);
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut sheets = Vec::new();

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"sheet" => {
                    let mut name = None;
                    let mut r_id = None;

                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"name" => {
                                name = attr.unescape_value().ok().map(|s| s.to_string());
                            }
                            b"r:id" => {
                                r_id = attr.unescape_value().ok().map(|s| s.to_string());
                            }
                            _ => {}
                        }
                    }

                    if let (Some(name), Some(r_id)) = (name, r_id) {
                        sheets.push((name, r_id));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(sheets)
    }

    /// Read workbook.xml.rels to map rIds to worksheet part paths.
    fn read_workbook_rels(&mut self) -> XlsxResult<HashMap<String, String>> {
        let file = self
            .archive
            .by_name("xl/_rels/workbook.xml.rels")
            .map_err(|_| XlsxError::MissingPart("xl/_rels/workbook.xml.rels".into()))?;

        let reader = BufReader::new(file);
        let mut xml_reader = Reader::from_reader(reader);
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut rels = HashMap::new();

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e))
                    if e.name().as_ref() == b"Relationship" =>
                {
                    let mut id = None;
                    let mut target = None;
                    let mut rel_type = None;

                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"Id" => {
                                id = attr.unescape_value().ok().map(|s| s.to_string());
                            }
                            b"Target" => {
                                target = attr.unescape_value().ok().map(|s| s.to_string());
                            }
                            b"Type" => {
                                rel_type = attr.unescape_value().ok().map(|s| s.to_string());
                            }
                            _ => {}
                        }
                    }

                    if let (Some(id), Some(target), Some(rel_type)) = (id, target, rel_type) {
                        if rel_type.ends_with("/worksheet") {
                            // Target is relative to xl/ unless absolute
                            let full_path = if let Some(stripped) = target.strip_prefix('/') {
                                stripped.to_string()
                            } else {
                                format!("xl/{target}")
                            };
                            rels.insert(id, full_path);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(rels)
    }
}

/// Decode Excel's `_xHHHH_` escape sequences in strings.
///
/// Excel uses these to smuggle control characters through XML:
/// `_x000d_` = CR, `_x000a_` = LF, `_x0009_` = Tab, `_x005f_` = underscore.
pub fn decode_excel_escapes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '_' {
            let mut hex_chars = String::new();
            let mut is_escape = false;

            if chars.peek() == Some(&'x') {
                chars.next();

                for _ in 0..4 {
                    if let Some(&ch) = chars.peek() {
                        if ch.is_ascii_hexdigit() {
                            hex_chars.push(ch);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }

                if hex_chars.len() == 4 && chars.peek() == Some(&'_') {
                    chars.next();
                    if let Ok(code) = u32::from_str_radix(&hex_chars, 16) {
                        if let Some(decoded) = char::from_u32(code) {
                            result.push(decoded);
                            is_escape = true;
                        }
                    }
                }
            }

            if !is_escape {
                result.push('_');
                if !hex_chars.is_empty() {
                    result.push('x');
                    result.push_str(&hex_chars);
                }
            }
        } else {
            result.push(c);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_excel_escapes() {
        assert_eq!(decode_excel_escapes("a_x000a_b"), "a\nb");
        assert_eq!(decode_excel_escapes("tab_x0009_here"), "tab\there");
        assert_eq!(decode_excel_escapes("plain"), "plain");
        assert_eq!(decode_excel_escapes("under_score"), "under_score");
        assert_eq!(decode_excel_escapes("_x00zz_"), "_x00zz_");
    }
}
