//! # M-Bus Data Encoding and Decoding
//!
//! This module provides functions for decoding the data types carried in
//! M-Bus record payloads: packed decimal (BCD), little-endian binary integers,
//! 32-bit reals, compact dates (type G), compact date-times (types F and I)
//! and text.

use crate::error::DecodeError;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// Largest BCD payload that fits an u64 (18 digits).
const MAX_BCD_BYTES: usize = 9;

/// Decodes packed decimal, least significant byte first, high nibble is the tens digit.
pub fn decode_bcd(input: &[u8]) -> Result<u64, DecodeError> {
    if input.len() > MAX_BCD_BYTES {
        return Err(DecodeError::InvalidPayloadLength(input.len()));
    }

    let mut value = 0u64;
    for &byte in input.iter().rev() {
        let high = byte >> 4;
        let low = byte & 0x0F;
        if high > 9 || low > 9 {
            return Err(DecodeError::InvalidDigit { byte });
        }
        value = value * 100 + u64::from(high) * 10 + u64::from(low);
    }

    Ok(value)
}

/// Encodes a value as `width` bytes of packed decimal, least significant byte first.
/// Digits that do not fit in `width` bytes are dropped.
pub fn encode_bcd(mut value: u64, width: usize) -> Vec<u8> {
    let mut result = vec![0u8; width];

    for byte in result.iter_mut() {
        let ones = (value % 10) as u8;
        value /= 10;
        let tens = (value % 10) as u8;
        value /= 10;
        *byte = (tens << 4) | ones;
    }

    result
}

/// Decodes a little-endian two's complement integer of 1, 2, 3, 4, 6 or 8 bytes.
pub fn decode_int(input: &[u8]) -> Result<i64, DecodeError> {
    let unsigned = decode_uint(input)?;
    let bits = input.len() * 8;
    if bits == 64 {
        return Ok(unsigned as i64);
    }

    let sign_bit = 1u64 << (bits - 1);
    if unsigned & sign_bit != 0 {
        Ok((unsigned | !((1u64 << bits) - 1)) as i64)
    } else {
        Ok(unsigned as i64)
    }
}

/// Decodes a little-endian unsigned integer of 1, 2, 3, 4, 6 or 8 bytes.
pub fn decode_uint(input: &[u8]) -> Result<u64, DecodeError> {
    match input.len() {
        1 | 2 | 3 | 4 | 6 | 8 => Ok(input
            .iter()
            .rev()
            .fold(0u64, |acc, b| (acc << 8) | u64::from(*b))),
        len => Err(DecodeError::InvalidPayloadLength(len)),
    }
}

/// Decodes a little-endian IEEE 754 single precision value.
pub fn decode_real32(input: &[u8]) -> Result<f32, DecodeError> {
    match input {
        [a, b, c, d] => Ok(f32::from_le_bytes([*a, *b, *c, *d])),
        _ => Err(DecodeError::InvalidPayloadLength(input.len())),
    }
}

/// Decodes text sent last character first.
pub fn decode_text(input: &[u8]) -> String {
    input
        .iter()
        .rev()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '?'
            }
        })
        .collect()
}

/// Date as carried by a type G (CP16) field. Not necessarily a calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompactDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl CompactDate {
    /// The all-ones pattern meters send for "has not happened yet".
    pub const UNSET: CompactDate = CompactDate {
        year: 2127,
        month: 15,
        day: 31,
    };

    pub fn is_unset(&self) -> bool {
        *self == Self::UNSET
    }

    pub fn to_naive_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(i32::from(self.year), u32::from(self.month), u32::from(self.day))
    }

    /// True for the unset sentinel and for real calendar dates.
    pub fn is_plausible(&self) -> bool {
        self.is_unset() || self.to_naive_date().is_some()
    }
}

impl fmt::Display for CompactDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Date and time as carried by type F (CP32) and type I (CP48) fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompactDateTime {
    pub date: CompactDate,
    pub hour: u8,
    pub minute: u8,
    pub second: Option<u8>,
    pub summer_time: bool,
    /// The meter flagged the time as not valid.
    pub invalid: bool,
}

impl fmt::Display for CompactDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:02}:{:02}", self.date, self.hour, self.minute)?;
        if let Some(second) = self.second {
            write!(f, ":{second:02}")?;
        }
        Ok(())
    }
}

fn split_date(day_byte: u8, month_byte: u8) -> CompactDate {
    let year = ((day_byte & 0xE0) >> 5) | ((month_byte & 0xF0) >> 1);
    CompactDate {
        year: 2000 + u16::from(year),
        month: month_byte & 0x0F,
        day: day_byte & 0x1F,
    }
}

/// Decodes a type G date (2 bytes).
pub fn decode_date(input: &[u8]) -> Result<CompactDate, DecodeError> {
    match input {
        [day_byte, month_byte] => Ok(split_date(*day_byte, *month_byte)),
        _ => Err(DecodeError::InvalidPayloadLength(input.len())),
    }
}

/// Decodes a type F (4 bytes) or type I (6 bytes) date-time.
///
/// A set invalid bit still decodes; the result carries `invalid = true`.
pub fn decode_date_time(input: &[u8]) -> Result<CompactDateTime, DecodeError> {
    match input {
        [minute, hour, day, month] => Ok(CompactDateTime {
            date: split_date(*day, *month),
            hour: hour & 0x1F,
            minute: minute & 0x3F,
            second: None,
            summer_time: hour & 0x80 != 0,
            invalid: minute & 0x80 != 0,
        }),
        [second, minute, hour, day, month, _] => Ok(CompactDateTime {
            date: split_date(*day, *month),
            hour: hour & 0x1F,
            minute: minute & 0x3F,
            second: Some(second & 0x3F),
            summer_time: hour & 0x80 != 0,
            invalid: minute & 0x80 != 0,
        }),
        _ => Err(DecodeError::InvalidPayloadLength(input.len())),
    }
}
