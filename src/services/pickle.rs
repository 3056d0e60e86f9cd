//! Aligned little-endian field container used for navigation history.
//!
//! A pickle is a `u32` payload size followed by the payload. Every field in
//! the payload starts on a 4-byte boundary; variable-length fields carry an
//! `i32` length prefix and are zero-padded up to the next boundary.

use crate::types::errors::{DecodeError, EncodeError};

const HEADER_SIZE: usize = 4;
const ALIGNMENT: usize = 4;

fn padding_for(len: usize) -> usize {
    (ALIGNMENT - len % ALIGNMENT) % ALIGNMENT
}

/// Builds a pickle field by field.
pub struct PickleWriter {
    buf: Vec<u8>,
}

impl PickleWriter {
    pub fn new() -> Self {
        Self {
            buf: vec![0u8; HEADER_SIZE],
        }
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_i32(i32::from(value));
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_bytes(&mut self, field: &'static str, bytes: &[u8]) -> Result<(), EncodeError> {
        self.write_length(field, bytes.len())?;
        self.buf.extend_from_slice(bytes);
        self.pad(bytes.len());
        Ok(())
    }

    pub fn write_string(&mut self, field: &'static str, value: &str) -> Result<(), EncodeError> {
        self.write_bytes(field, value.as_bytes())
    }

    /// Writes `value` as UTF-16LE code units, prefixed by the unit count.
    pub fn write_string16(&mut self, field: &'static str, value: &str) -> Result<(), EncodeError> {
        let units: Vec<u16> = value.encode_utf16().collect();
        self.write_length(field, units.len())?;
        for unit in &units {
            self.buf.extend_from_slice(&unit.to_le_bytes());
        }
        self.pad(units.len() * 2);
        Ok(())
    }

    /// Fills in the header and returns the finished pickle.
    pub fn finish(mut self) -> Result<Vec<u8>, EncodeError> {
        let payload_len = self.buf.len() - HEADER_SIZE;
        let size = u32::try_from(payload_len).map_err(|_| EncodeError::TooLong {
            field: "pickle payload",
            len: payload_len,
        })?;
        self.buf[..HEADER_SIZE].copy_from_slice(&size.to_le_bytes());
        Ok(self.buf)
    }

    fn write_length(&mut self, field: &'static str, len: usize) -> Result<(), EncodeError> {
        let prefix = i32::try_from(len).map_err(|_| EncodeError::TooLong { field, len })?;
        self.write_i32(prefix);
        Ok(())
    }

    fn pad(&mut self, written: usize) {
        self.buf.resize(self.buf.len() + padding_for(written), 0);
    }
}

impl Default for PickleWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads fields back out of a pickle, in the order they were written.
///
/// Borrows the source bytes; nothing is copied until a caller asks for an
/// owned value.
pub struct PickleReader<'a> {
    payload: &'a [u8],
    pos: usize,
}

impl<'a> PickleReader<'a> {
    /// Validates the header and positions the reader at the first field.
    pub fn new(bytes: &'a [u8]) -> Result<Self, DecodeError> {
        let header = bytes
            .get(..HEADER_SIZE)
            .ok_or(DecodeError::Truncated("pickle header"))?;
        let mut size = [0u8; HEADER_SIZE];
        size.copy_from_slice(header);
        let size = u32::from_le_bytes(size) as usize;
        let payload = HEADER_SIZE
            .checked_add(size)
            .and_then(|end| bytes.get(HEADER_SIZE..end))
            .ok_or(DecodeError::InvalidLength {
                field: "pickle payload",
                len: size as i64,
            })?;
        Ok(Self { payload, pos: 0 })
    }

    /// Bytes of payload not consumed yet.
    pub fn remaining(&self) -> usize {
        self.payload.len() - self.pos
    }

    pub fn read_bool(&mut self, field: &'static str) -> Result<bool, DecodeError> {
        Ok(self.read_i32(field)? != 0)
    }

    pub fn read_i32(&mut self, field: &'static str) -> Result<i32, DecodeError> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4, field)?);
        Ok(i32::from_le_bytes(raw))
    }

    pub fn read_i64(&mut self, field: &'static str) -> Result<i64, DecodeError> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8, field)?);
        Ok(i64::from_le_bytes(raw))
    }

    pub fn read_bytes(&mut self, field: &'static str) -> Result<&'a [u8], DecodeError> {
        let len = self.read_length(field)?;
        let bytes = self.take(len, field)?;
        self.skip_padding(len);
        Ok(bytes)
    }

    pub fn read_string(&mut self, field: &'static str) -> Result<String, DecodeError> {
        let bytes = self.read_bytes(field)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidText(field))
    }

    pub fn read_string16(&mut self, field: &'static str) -> Result<String, DecodeError> {
        let units = self.read_length(field)?;
        let byte_len = units.checked_mul(2).ok_or(DecodeError::InvalidLength {
            field,
            len: units as i64,
        })?;
        let bytes = self.take(byte_len, field)?;
        self.skip_padding(byte_len);
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16(&units).map_err(|_| DecodeError::InvalidText(field))
    }

    fn read_length(&mut self, field: &'static str) -> Result<usize, DecodeError> {
        let len = self.read_i32(field)?;
        usize::try_from(len).map_err(|_| DecodeError::InvalidLength {
            field,
            len: i64::from(len),
        })
    }

    fn take(&mut self, len: usize, field: &'static str) -> Result<&'a [u8], DecodeError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.payload.len())
            .ok_or(DecodeError::Truncated(field))?;
        let bytes = &self.payload[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    // The final field of a payload may omit its padding.
    fn skip_padding(&mut self, read: usize) {
        self.pos = (self.pos + padding_for(read)).min(self.payload.len());
    }
}
