//! # Wireless M-Bus (wM-Bus) Module
//!
//! Header parsing for wireless M-Bus telegrams. Radio reception, framing and
//! CRC removal happen before a telegram reaches this crate.

pub mod telegram;

pub use telegram::{media_name, parse_telegram, DeviceAddress, LengthMismatch, TelegramHeader, TransportInfo};
