//! # Telegram Logging
//!
//! Hex dumps of telegrams for protocol debugging. Formatting only happens
//! when trace logging is enabled, so the decode path pays nothing otherwise.

use log::{log_enabled, trace, Level};

use super::hex::format_hex_compact;

/// Dumps `bytes` at trace level, prefixed with `label` and the byte count.
pub fn log_telegram_hex(label: &str, bytes: &[u8]) {
    if log_enabled!(Level::Trace) {
        trace!("{} ({} bytes): {}", label, bytes.len(), format_hex_compact(bytes));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dump_without_logger() {
        // No logger installed: must be a no-op
        log_telegram_hex("telegram", &[0x41, 0x44]);
        log_telegram_hex("empty", &[]);
    }
}
