//! Bit-level reader for the Elias-coded field encodings
//!
//! Bits are consumed MSB-first, one byte at a time, from the underlying
//! [`BBLDataStream`]. Call [`BBLBitStream::byte_align`] before handing the
//! byte stream back to byte-granular readers.

use crate::error::{BBLError, Result};
use crate::parser::stream::{zigzag_decode, BBLDataStream};

pub struct BBLBitStream<'s, 'a> {
    stream: &'s mut BBLDataStream<'a>,
    current: u8,
    /// Unread bits left in `current`
    bits_left: u8,
}

impl<'s, 'a> BBLBitStream<'s, 'a> {
    pub fn new(stream: &'s mut BBLDataStream<'a>) -> Self {
        Self {
            stream,
            current: 0,
            bits_left: 0,
        }
    }

    pub fn read_bit(&mut self) -> Result<u32> {
        if self.bits_left == 0 {
            self.current = self.stream.read_byte()?;
            self.bits_left = 8;
        }
        self.bits_left -= 1;
        Ok(((self.current >> self.bits_left) & 0x01) as u32)
    }

    pub fn read_bits(&mut self, count: u32) -> Result<u32> {
        if count > 32 {
            return Err(BBLError::InvalidFrame(format!(
                "bit read of {} bits exceeds 32",
                count
            )));
        }
        let mut result = 0u64;
        for _ in 0..count {
            result = (result << 1) | self.read_bit()? as u64;
        }
        Ok(result as u32)
    }

    /// Drop the rest of a partially consumed byte.
    pub fn byte_align(&mut self) {
        self.bits_left = 0;
    }

    pub fn read_elias_delta_u32(&mut self) -> Result<u32> {
        let mut length_bits = 0u32;
        while length_bits <= 5 && self.read_bit()? == 0 {
            length_bits += 1;
        }
        if length_bits > 5 {
            return Ok(0);
        }

        let length_low = self.read_bits(length_bits)?;
        let length = ((1u32 << length_bits) | length_low) - 1;
        if length > 31 {
            return Ok(0);
        }

        let low = self.read_bits(length)?;
        let value = (((1u64 << length) | low as u64) - 1) as u32;
        self.read_escape(value)
    }

    pub fn read_elias_delta_s32(&mut self) -> Result<i32> {
        Ok(zigzag_decode(self.read_elias_delta_u32()?))
    }

    pub fn read_elias_gamma_u32(&mut self) -> Result<u32> {
        let mut zeros = 0u32;
        while zeros <= 31 && self.read_bit()? == 0 {
            zeros += 1;
        }
        if zeros > 31 {
            return Ok(0);
        }

        let low = self.read_bits(zeros)?;
        let value = (((1u64 << zeros) | low as u64) - 1) as u32;
        self.read_escape(value)
    }

    pub fn read_elias_gamma_s32(&mut self) -> Result<i32> {
        Ok(zigzag_decode(self.read_elias_gamma_u32()?))
    }

    // u32::MAX cannot be written as value + 1; the encoder sends MAX - 1 plus one flag bit
    fn read_escape(&mut self, value: u32) -> Result<u32> {
        if value == u32::MAX - 1 && self.read_bit()? == 1 {
            return Ok(u32::MAX);
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_bits_msb_first() {
        let data = [0b1010_0000, 0xFF];
        let mut stream = BBLDataStream::new(&data);
        let mut bits = BBLBitStream::new(&mut stream);
        assert_eq!(bits.read_bit().unwrap(), 1);
        assert_eq!(bits.read_bit().unwrap(), 0);
        assert_eq!(bits.read_bits(2).unwrap(), 0b10);
        bits.byte_align();
        assert_eq!(bits.read_bits(8).unwrap(), 0xFF);
        assert!(bits.read_bit().is_err());
    }

    #[test]
    fn test_byte_align_returns_to_byte_reads() {
        let data = [0b1100_0000, 0x07];
        let mut stream = BBLDataStream::new(&data);
        {
            let mut bits = BBLBitStream::new(&mut stream);
            assert_eq!(bits.read_bits(2).unwrap(), 0b11);
            bits.byte_align();
        }
        assert_eq!(stream.read_unsigned_vb().unwrap(), 7);
    }

    #[test]
    fn test_elias_gamma() {
        // 1 -> value 0; 010 -> value 1; 011 -> value 2; 00100 -> value 3
        let data = [0b1010_0110, 0b0100_0000];
        let mut stream = BBLDataStream::new(&data);
        let mut bits = BBLBitStream::new(&mut stream);
        assert_eq!(bits.read_elias_gamma_u32().unwrap(), 0);
        assert_eq!(bits.read_elias_gamma_u32().unwrap(), 1);
        assert_eq!(bits.read_elias_gamma_u32().unwrap(), 2);
        assert_eq!(bits.read_elias_gamma_u32().unwrap(), 3);
    }

    #[test]
    fn test_elias_delta() {
        // 1 -> value 0; 0100 -> value 1 (length 2, low bit 0)
        // 0101 -> value 2; 01100 -> value 3 (length 3, low bits 00)
        let data = [0b1010_0010, 0b1011_0000];
        let mut stream = BBLDataStream::new(&data);
        let mut bits = BBLBitStream::new(&mut stream);
        assert_eq!(bits.read_elias_delta_u32().unwrap(), 0);
        assert_eq!(bits.read_elias_delta_u32().unwrap(), 1);
        assert_eq!(bits.read_elias_delta_u32().unwrap(), 2);
        assert_eq!(bits.read_elias_delta_u32().unwrap(), 3);
    }

    #[test]
    fn test_elias_signed_uses_zigzag() {
        // gamma 010 -> 1 -> -1; gamma 011 -> 2 -> 1
        let data = [0b0100_1100];
        let mut stream = BBLDataStream::new(&data);
        let mut bits = BBLBitStream::new(&mut stream);
        assert_eq!(bits.read_elias_gamma_s32().unwrap(), -1);
        assert_eq!(bits.read_elias_gamma_s32().unwrap(), 1);
    }

    #[test]
    fn test_elias_gamma_all_zero_bits_is_invalid() {
        let data = [0u8; 5];
        let mut stream = BBLDataStream::new(&data);
        let mut bits = BBLBitStream::new(&mut stream);
        assert_eq!(bits.read_elias_gamma_u32().unwrap(), 0);
    }
}
