//! A1-style cell reference parsing and formatting.
//!
//! Cell references combine column letters (A-XFD) with 1-based row numbers.
//! Internally both row and column are 0-based.

use crate::error::{Error, Result};

/// Convert column letters to a 0-based column index (A=0, B=1, ..., XFD=16383).
pub fn letters_to_column(letters: &str) -> Result<u16> {
    if letters.is_empty() {
        return Err(Error::InvalidReference("empty column letters".into()));
    }

    let mut col: u32 = 0;
    for c in letters.chars() {
        let c = c.to_ascii_uppercase();
        if !c.is_ascii_uppercase() {
            return Err(Error::InvalidReference(format!(
                "invalid column letter '{c}' in '{letters}'"
            )));
        }
        col = col * 26 + (c as u32 - 'A' as u32 + 1);
        if col > 16384 {
            return Err(Error::InvalidReference(format!(
                "column '{letters}' out of range"
            )));
        }
    }

    Ok((col - 1) as u16)
}

/// Convert a 0-based column index to column letters (0 -> "A").
pub fn column_to_letters(mut col: u16) -> String {
    let mut letters = String::new();
    loop {
        letters.insert(0, (b'A' + (col % 26) as u8) as char);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    letters
}

/// Parse an A1-style reference (e.g. "BC23") into 0-based (row, col).
pub fn parse(reference: &str) -> Result<(u32, u16)> {
    let s = reference.trim();
    let split = s
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| Error::InvalidReference(format!("no row number in '{s}'")))?;
    if split == 0 {
        return Err(Error::InvalidReference(format!(
            "no column letters in '{s}'"
        )));
    }

    let col = letters_to_column(&s[..split])?;
    let row: u32 = s[split..]
        .parse()
        .map_err(|_| Error::InvalidReference(format!("invalid row number in '{s}'")))?;
    if row == 0 {
        return Err(Error::InvalidReference(format!("row 0 in '{s}'")));
    }

    Ok((row - 1, col))
}

/// Format 0-based (row, col) as an A1-style reference (0, 0 -> "A1").
pub fn format(row: u32, col: u16) -> String {
    let mut s = column_to_letters(col);
    s.push_str(&(row + 1).to_string());
    s
}

/// Parse only the column portion of a reference ("BC23" -> 54).
pub fn column_of(reference: &str) -> Result<u16> {
    parse(reference).map(|(_, col)| col)
}
