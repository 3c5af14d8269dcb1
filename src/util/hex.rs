//! # Hex Utilities
//!
//! Telegrams usually travel as hex text (log files, MQTT payloads, the
//! command line). These helpers turn that text into bytes and back into
//! something readable for logs.
//!
//! ```rust
//! use mbus_fields::util::hex::{decode_hex, format_hex_compact};
//!
//! let data = decode_hex("2E 44 93 44").unwrap();
//! assert_eq!(data, [0x2E, 0x44, 0x93, 0x44]);
//! assert_eq!(format_hex_compact(&data), "2e 44 93 44");
//! ```

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HexError {
    #[error("Invalid hex character: {0:?}")]
    InvalidCharacter(char),

    #[error("Odd number of hex characters: {0}")]
    OddLength(usize),

    #[error("Empty hex string")]
    EmptyString,
}

/// Decode telegram hex text.
///
/// Whitespace and the separators `:`, `-` and `_` are ignored, as is a
/// leading `0x`. Upper and lower case are accepted.
pub fn decode_hex(input: &str) -> Result<Vec<u8>, HexError> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    let mut digits = Vec::with_capacity(trimmed.len());
    for c in trimmed.chars() {
        match c {
            c if c.is_ascii_hexdigit() => digits.push(c as u8),
            c if c.is_whitespace() || matches!(c, ':' | '-' | '_') => {}
            c => return Err(HexError::InvalidCharacter(c)),
        }
    }

    if digits.is_empty() {
        return Err(HexError::EmptyString);
    }
    if digits.len() % 2 != 0 {
        return Err(HexError::OddLength(digits.len()));
    }

    // Only hex digits remain, so decoding cannot fail past this point
    hex::decode(&digits).map_err(|_| HexError::OddLength(digits.len()))
}

/// Bytes as "2e 44 93 44".
pub fn format_hex_compact(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Hex dump with offsets and an ASCII column, one line per `bytes_per_line`.
pub fn pretty_hex(data: &[u8], bytes_per_line: usize) -> String {
    let width = bytes_per_line.max(1);

    data.chunks(width)
        .enumerate()
        .map(|(i, chunk)| {
            let hex: Vec<String> = chunk.iter().map(|b| format!("{:02x}", b)).collect();
            let ascii: String = chunk
                .iter()
                .map(|&b| {
                    if b.is_ascii_graphic() || b == b' ' {
                        b as char
                    } else {
                        '.'
                    }
                })
                .collect();
            format!("{:04x}: {:<pad$} |{}|", i * width, hex.join(" "), ascii, pad = width * 3 - 1)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
