//! BIFF8 Unicode string decoding.
//!
//! BIFF8 strings carry a header (character count plus a flags byte) and
//! then character data that is either compressed Latin-1 (one byte per
//! character) or UTF-16LE, with optional rich-text runs and extended
//! (phonetic) data appended after the characters:
//! - Flags bit 0 (`fHighByte`): 0 = compressed, 1 = UTF-16LE
//! - Flags bit 2 (`fExtSt`): 4-byte extended data size follows the header
//! - Flags bit 3 (`fRichSt`): 2-byte rich-text run count follows the header

use super::parser::{read_u16, read_u32, read_u8};
use crate::error::{XlsError, XlsResult};

/// Read a BIFF8 "short" string (1-byte length prefix, used in BOUNDSHEET).
pub fn read_short_string(data: &[u8], offset: &mut usize) -> XlsResult<String> {
    let char_count = read_u8(data, offset)? as u16;
    let flags = read_u8(data, offset)?;
    read_character_data(data, offset, char_count, flags)
}

/// Read a BIFF8 Unicode string with a 2-byte length prefix (used in SST,
/// LABEL, STRING, FORMAT).
pub fn read_unicode_string(data: &[u8], offset: &mut usize) -> XlsResult<String> {
    let char_count = read_u16(data, offset)?;
    let flags = read_u8(data, offset)?;

    let is_rich = (flags & 0x08) != 0;
    let has_ext = (flags & 0x04) != 0;

    let run_count = if is_rich { read_u16(data, offset)? } else { 0 };
    let ext_size = if has_ext { read_u32(data, offset)? } else { 0 };

    let text = read_character_data(data, offset, char_count, flags)?;

    // Skip rich text runs (4 bytes each) and extended string data
    if is_rich {
        *offset += run_count as usize * 4;
    }
    if has_ext {
        *offset += ext_size as usize;
    }

    Ok(text)
}

/// Read character data (no header) given char_count and the flags byte.
fn read_character_data(
    data: &[u8],
    offset: &mut usize,
    char_count: u16,
    flags: u8,
) -> XlsResult<String> {
    let is_wide = (flags & 0x01) != 0;
    let count = char_count as usize;

    if is_wide {
        let byte_len = count * 2;
        if *offset + byte_len > data.len() {
            return Err(XlsError::Parse(format!(
                "string data too short: need {} bytes at offset {}, have {}",
                byte_len,
                *offset,
                data.len() - *offset
            )));
        }
        let mut units = Vec::with_capacity(count);
        for i in 0..count {
            let lo = data[*offset + i * 2];
            let hi = data[*offset + i * 2 + 1];
            units.push(u16::from_le_bytes([lo, hi]));
        }
        *offset += byte_len;
        String::from_utf16(&units)
            .map_err(|e| XlsError::Parse(format!("invalid UTF-16 string: {e}")))
    } else {
        if *offset + count > data.len() {
            return Err(XlsError::Parse(format!(
                "string data too short: need {} bytes at offset {}, have {}",
                count,
                *offset,
                data.len() - *offset
            )));
        }
        let s: String = data[*offset..*offset + count]
            .iter()
            .map(|&b| b as char)
            .collect();
        *offset += count;
        Ok(s)
    }
}

/// Parse the entire SST (Shared String Table) from a concatenated buffer
/// (SST body + all CONTINUE bodies already joined).
///
/// The body starts with `total_refs` (u32) and `unique_count` (u32),
/// followed by `unique_count` Unicode string entries.
pub fn parse_sst(data: &[u8]) -> XlsResult<Vec<String>> {
    let mut offset = 0;

    let _total_refs = read_u32(data, &mut offset)?;
    let unique_count = read_u32(data, &mut offset)? as usize;

    let mut strings = Vec::with_capacity(unique_count.min(1 << 20));

    for i in 0..unique_count {
        match read_unicode_string(data, &mut offset) {
            Ok(s) => strings.push(s),
            Err(e) => {
                // Some files have SST padding or truncation issues near the
                // end; keep what we have
                log::warn!("SST parse error at string {i}/{unique_count}: {e}");
                break;
            }
        }
    }

    Ok(strings)
}
