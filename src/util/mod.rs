//! # Utility Modules
//!
//! Hex input parsing and telegram hex dumps shared by the decoder and the
//! `mbus-decode` binary.

pub mod hex;
pub mod logging;

pub use hex::{decode_hex, format_hex_compact, pretty_hex, HexError};
pub use logging::log_telegram_hex;
