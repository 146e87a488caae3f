//! Sign extension helpers
//!
//! The tagged encodings pack two's-complement values into odd bit widths.
//! Each helper takes the raw bits right-aligned and widens them to i32.

/// Sign-extend the low `bits` bits of `value` to i32
#[inline]
pub fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

/// Sign-extend a 2-bit value to i32
pub fn sign_extend_2bit(value: u8) -> i32 {
    sign_extend(value as u32 & 0x03, 2)
}

/// Sign-extend a 4-bit value to i32
pub fn sign_extend_4bit(value: u8) -> i32 {
    sign_extend(value as u32 & 0x0f, 4)
}

/// Sign-extend a 5-bit value to i32
pub fn sign_extend_5bit(value: u8) -> i32 {
    sign_extend(value as u32 & 0x1f, 5)
}

/// Sign-extend a 6-bit value to i32
pub fn sign_extend_6bit(value: u8) -> i32 {
    sign_extend(value as u32 & 0x3f, 6)
}

/// Sign-extend a 7-bit value to i32
pub fn sign_extend_7bit(value: u8) -> i32 {
    sign_extend(value as u32 & 0x7f, 7)
}

/// Sign-extend an 8-bit value to i32
pub fn sign_extend_8bit(value: u8) -> i32 {
    value as i8 as i32
}

/// Sign-extend a 14-bit two's-complement value to i32
pub fn sign_extend_14bit(value: u16) -> i32 {
    sign_extend(value as u32 & 0x3fff, 14)
}

/// Sign-extend a 16-bit value to i32
pub fn sign_extend_16bit(value: u16) -> i32 {
    value as i16 as i32
}

/// Sign-extend a 24-bit value to i32
pub fn sign_extend_24bit(value: u32) -> i32 {
    sign_extend(value & 0x00ff_ffff, 24)
}
