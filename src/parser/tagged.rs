//! Tagged multi-field encodings
//!
//! Each reader decodes a whole group of residuals from one leading selector
//! byte. The caller applies predictors to the residuals afterwards.

use crate::error::Result;
use crate::parser::helpers::*;
use crate::parser::stream::BBLDataStream;

/// Largest group any tagged encoding produces
pub const MAX_GROUP_FIELDS: usize = 8;

/// Pending low nibble left over by a 4-bit field of a Tag8_4S16 group
#[derive(Debug, Default, Clone, Copy)]
pub struct NibbleBuffer {
    pending: Option<u8>,
}

impl NibbleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn take(&mut self) -> Option<u8> {
        self.pending.take()
    }

    pub fn store(&mut self, byte: u8) {
        self.pending = Some(byte & 0x0f);
    }
}

impl<'a> BBLDataStream<'a> {
    /// Read a Tag8_8SVB group of `count` (1..=8) fields.
    ///
    /// A lone field has no selector byte and is a plain signed varint.
    pub fn read_tag8_8svb(&mut self, values: &mut [i32], count: usize) -> Result<()> {
        if count == 1 {
            values[0] = self.read_signed_vb()?;
            return Ok(());
        }

        let selector = self.read_byte()?;
        for (i, value) in values.iter_mut().take(count.min(8)).enumerate() {
            *value = if selector & (1 << i) != 0 {
                self.read_signed_vb()?
            } else {
                0
            };
        }
        Ok(())
    }

    /// Read a Tag2_3S32 group of three fields
    pub fn read_tag2_3s32(&mut self, values: &mut [i32]) -> Result<()> {
        let lead_byte = self.read_byte()?;

        match lead_byte >> 6 {
            0 => read_packed_2bit(lead_byte, values),
            1 => {
                // 4-bit fields
                values[0] = sign_extend_4bit(lead_byte & 0x0f);
                let byte1 = self.read_byte()?;
                values[1] = sign_extend_4bit(byte1 >> 4);
                values[2] = sign_extend_4bit(byte1 & 0x0f);
            }
            2 => {
                // 6-bit fields
                values[0] = sign_extend_6bit(lead_byte & 0x3f);
                let byte1 = self.read_byte()?;
                values[1] = sign_extend_6bit(byte1 & 0x3f);
                let byte2 = self.read_byte()?;
                values[2] = sign_extend_6bit(byte2 & 0x3f);
            }
            _ => self.read_sized_triplet(lead_byte, values)?,
        }

        Ok(())
    }

    /// Read a Tag2_3SVariable group of three fields
    pub fn read_tag2_3svariable(&mut self, values: &mut [i32]) -> Result<()> {
        let lead_byte = self.read_byte()?;

        match lead_byte >> 6 {
            0 => read_packed_2bit(lead_byte, values),
            1 => {
                // 5-5-4 bit fields
                values[0] = sign_extend_5bit((lead_byte & 0x3e) >> 1);
                let byte1 = self.read_byte()?;
                values[1] = sign_extend_5bit(((lead_byte & 0x01) << 4) | (byte1 >> 4));
                values[2] = sign_extend_4bit(byte1 & 0x0f);
            }
            2 => {
                // 8-7-7 bit fields
                let byte1 = self.read_byte()?;
                values[0] = sign_extend_8bit(((lead_byte & 0x3f) << 2) | (byte1 >> 6));
                let byte2 = self.read_byte()?;
                values[1] = sign_extend_7bit(((byte1 & 0x3f) << 1) | (byte2 >> 7));
                values[2] = sign_extend_7bit(byte2 & 0x7f);
            }
            _ => self.read_sized_triplet(lead_byte, values)?,
        }

        Ok(())
    }

    /// Read a Tag8_4S16 group of four fields.
    ///
    /// The nibble buffer starts empty for every group; 8 and 16-bit fields
    /// that follow an odd number of 4-bit fields straddle byte boundaries.
    pub fn read_tag8_4s16(&mut self, values: &mut [i32]) -> Result<()> {
        let selector = self.read_byte()?;
        let mut nibbles = NibbleBuffer::new();

        for (i, value) in values.iter_mut().take(4).enumerate() {
            *value = match (selector >> (i * 2)) & 0x03 {
                0 => 0,
                1 => match nibbles.take() {
                    Some(low) => sign_extend_4bit(low),
                    None => {
                        let byte = self.read_byte()?;
                        nibbles.store(byte);
                        sign_extend_4bit(byte >> 4)
                    }
                },
                2 => match nibbles.take() {
                    Some(low) => {
                        let byte = self.read_byte()?;
                        nibbles.store(byte);
                        sign_extend_8bit((low << 4) | (byte >> 4))
                    }
                    None => sign_extend_8bit(self.read_byte()?),
                },
                _ => match nibbles.take() {
                    Some(low) => {
                        let byte1 = self.read_byte()?;
                        let byte2 = self.read_byte()?;
                        nibbles.store(byte2);
                        sign_extend_16bit(
                            ((low as u16) << 12) | ((byte1 as u16) << 4) | ((byte2 as u16) >> 4),
                        )
                    }
                    None => {
                        let byte1 = self.read_byte()?;
                        let byte2 = self.read_byte()?;
                        sign_extend_16bit(((byte1 as u16) << 8) | byte2 as u16)
                    }
                },
            };
        }

        Ok(())
    }

    /// Three fields whose byte widths come from 2-bit size codes, LSB first
    fn read_sized_triplet(&mut self, lead_byte: u8, values: &mut [i32]) -> Result<()> {
        let mut selector = lead_byte;
        for value in values.iter_mut().take(3) {
            let width = (selector & 0x03) as usize + 1;
            let bytes = self.read_raw_bytes(width)?;
            let raw = bytes
                .iter()
                .rev()
                .fold(0u32, |acc, &byte| (acc << 8) | byte as u32);
            *value = match width {
                1 => sign_extend_8bit(raw as u8),
                2 => sign_extend_16bit(raw as u16),
                3 => sign_extend_24bit(raw),
                _ => raw as i32,
            };
            selector >>= 2;
        }
        Ok(())
    }
}

fn read_packed_2bit(lead_byte: u8, values: &mut [i32]) {
    values[0] = sign_extend_2bit((lead_byte >> 4) & 0x03);
    values[1] = sign_extend_2bit((lead_byte >> 2) & 0x03);
    values[2] = sign_extend_2bit(lead_byte & 0x03);
}
