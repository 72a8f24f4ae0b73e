//! BIFF8 (Binary Interchange File Format) record framing.
//!
//! A BIFF8 stream is a sequence of records, each with a 4-byte header
//! (2-byte record type + 2-byte body length) followed by the body.
//! CONTINUE records (type 0x003C) extend the body of the preceding record
//! beyond the 8224-byte per-record limit; [`RecordReader`] merges them
//! transparently.
//!
//! Records are produced one at a time so the converter's memory use stays
//! bounded by the largest single record (in practice the SST), not the
//! stream length.

pub mod parser;
pub mod records;
pub mod strings;

use std::io::Read;

use crate::error::{XlsError, XlsResult};

/// A single BIFF8 record (with CONTINUE bodies already merged).
#[derive(Debug)]
pub struct BiffRecord {
    /// Record type ID (e.g. `records::SST`, `records::NUMBER`).
    pub record_type: u16,
    /// Record body bytes (CONTINUE records have been concatenated).
    pub data: Vec<u8>,
}

/// Lazy record reader over a raw BIFF8 byte stream.
pub struct RecordReader<R: Read> {
    inner: R,
    /// Header of a record already consumed while checking for CONTINUE.
    lookahead: Option<(u16, usize)>,
    done: bool,
}

impl<R: Read> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        RecordReader {
            inner,
            lookahead: None,
            done: false,
        }
    }

    /// Read the next 4-byte header, or `None` at end of stream.
    fn read_header(&mut self) -> XlsResult<Option<(u16, usize)>> {
        let mut header = [0u8; 4];
        match self.inner.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(XlsError::Io(e)),
        }
        let record_type = u16::from_le_bytes([header[0], header[1]]);
        let body_len = u16::from_le_bytes([header[2], header[3]]) as usize;
        Ok(Some((record_type, body_len)))
    }

    fn read_body(&mut self, len: usize) -> XlsResult<Vec<u8>> {
        let mut body = vec![0u8; len];
        if len > 0 {
            self.inner.read_exact(&mut body)?;
        }
        Ok(body)
    }

    /// Produce the next record, with any CONTINUE bodies merged in.
    pub fn next_record(&mut self) -> XlsResult<Option<BiffRecord>> {
        if self.done {
            return Ok(None);
        }

        let (record_type, body_len) = match self.lookahead.take() {
            Some(h) => h,
            None => match self.read_header()? {
                Some(h) => h,
                None => {
                    self.done = true;
                    return Ok(None);
                }
            },
        };

        // An orphaned CONTINUE (no preceding record) is dropped
        if record_type == records::CONTINUE {
            self.read_body(body_len)?;
            return self.next_record();
        }

        let mut data = self.read_body(body_len)?;

        // Absorb trailing CONTINUE records into this body
        loop {
            match self.read_header()? {
                Some((records::CONTINUE, len)) => {
                    let extra = self.read_body(len)?;
                    data.extend_from_slice(&extra);
                }
                Some(other) => {
                    self.lookahead = Some(other);
                    break;
                }
                None => {
                    self.done = true;
                    break;
                }
            }
        }

        Ok(Some(BiffRecord { record_type, data }))
    }
}

/// Extract the BOF record fields from a record body.
///
/// Returns `(version, substream_type)`:
/// - `version` should be `0x0600` for BIFF8
/// - `substream_type`: 0x0005 = workbook globals, 0x0010 = worksheet
pub fn parse_bof(data: &[u8]) -> XlsResult<(u16, u16)> {
    if data.len() < 4 {
        return Err(XlsError::InvalidFormat("BOF record too short".into()));
    }
    let version = u16::from_le_bytes([data[0], data[1]]);
    let dt = u16::from_le_bytes([data[2], data[3]]);
    Ok((version, dt))
}
