use crate::error::{BBLError, Result};
use crate::parser::helpers::sign_extend_14bit;
use crate::types::FrameMarker;

/// Varints never need more than 5 bytes to carry 32 bits
const MAX_VARINT_BYTES: usize = 5;

/// Forward-only byte reader over `[start, end)` of a log buffer
pub struct BBLDataStream<'a> {
    data: &'a [u8],
    pub pos: usize,
    end: usize,
    pub eof: bool,
}

impl<'a> BBLDataStream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_range(data, 0, data.len())
    }

    /// Reader limited to `data[start..end]`; offsets stay absolute.
    pub fn with_range(data: &'a [u8], start: usize, end: usize) -> Self {
        let end = end.min(data.len());
        let pos = start.min(end);
        Self {
            data,
            pos,
            end,
            eof: pos >= end,
        }
    }

    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.end);
        self.eof = self.pos >= self.end;
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn remaining(&self) -> usize {
        self.end - self.pos
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        if self.pos < self.end {
            let byte = self.data[self.pos];
            self.pos += 1;
            self.eof = self.pos >= self.end;
            Ok(byte)
        } else {
            self.eof = true;
            Err(BBLError::UnexpectedEof)
        }
    }

    /// Look at the next byte without consuming it; `None` at the end.
    pub fn peek_byte(&self) -> Option<u8> {
        if self.pos < self.end {
            Some(self.data[self.pos])
        } else {
            None
        }
    }

    /// Read up to the next line feed, dropping a trailing carriage return.
    pub fn read_line(&mut self) -> Option<&'a [u8]> {
        if self.pos >= self.end {
            return None;
        }

        let start = self.pos;
        let line_end = self.data[start..self.end]
            .iter()
            .position(|&b| b == b'\n')
            .map(|offset| start + offset)
            .unwrap_or(self.end);

        self.set_position((line_end + 1).min(self.end));

        let mut line = &self.data[start..line_end];
        if let Some((&b'\r', rest)) = line.split_last() {
            line = rest;
        }
        Some(line)
    }

    pub fn read_raw_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        if count > self.remaining() {
            self.set_position(self.end);
            return Err(BBLError::UnexpectedEof);
        }
        let bytes = &self.data[self.pos..self.pos + count];
        self.set_position(self.pos + count);
        Ok(bytes)
    }

    /// Read an unsigned variable-byte integer (7 bits per byte, low groups first)
    pub fn read_unsigned_vb(&mut self) -> Result<u32> {
        let mut result = 0u64;
        let mut shift = 0;

        for _ in 0..MAX_VARINT_BYTES {
            let b = self.read_byte()?;
            result |= ((b & 0x7f) as u64) << shift;

            if b & 0x80 == 0 {
                return Ok(result as u32);
            }

            shift += 7;
        }

        // Too long for 32 bits: swallow the rest of the run so the caller can move on
        while let Some(b) = self.peek_byte() {
            self.pos += 1;
            if b & 0x80 == 0 {
                break;
            }
        }
        self.eof = self.pos >= self.end;

        Ok(result as u32)
    }

    /// Read a zigzag-encoded signed variable-byte integer
    pub fn read_signed_vb(&mut self) -> Result<i32> {
        let unsigned = self.read_unsigned_vb()?;
        Ok(zigzag_decode(unsigned))
    }

    /// Read a varint, sign-extend its low 14 bits and negate the result
    pub fn read_neg_14bit(&mut self) -> Result<i32> {
        let unsigned = self.read_unsigned_vb()?;
        Ok(-sign_extend_14bit((unsigned & 0x3fff) as u16))
    }

    /// Scan forward to the next byte that is a known frame marker.
    ///
    /// The stream is left positioned on the marker so the next peek sees it.
    pub fn skip_to_next_marker(&mut self) -> Option<FrameMarker> {
        while let Some(byte) = self.peek_byte() {
            if let Some(marker) = FrameMarker::from_byte(byte) {
                return Some(marker);
            }
            self.pos += 1;
        }
        self.eof = true;
        None
    }
}

/// Map 0, 1, 2, 3, 4 .. onto 0, -1, 1, -2, 2 ..
pub fn zigzag_decode(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}
