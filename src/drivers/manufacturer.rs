//! Manufacturer Id Conversion
//!
//! Telegram headers carry the manufacturer as a 15-bit packing of three
//! letters (FLAG association code):
//! ```text
//! id = (char1 - 64) * 32² + (char2 - 64) * 32 + (char3 - 64)
//! ```
//!
//! Valid range: 0x0421 (AAA) to 0x6B5A (ZZZ). Bit 15 marks a soft address
//! and is ignored when decoding.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Qundis
pub const MANUFACTURER_QDS: u16 = 0x4493;

/// Display names of manufacturers with built-in drivers or common meters.
static KNOWN_MANUFACTURERS: Lazy<HashMap<u16, &'static str>> = Lazy::new(|| {
    let mut map = HashMap::new();

    // Heat and heat cost allocation
    map.insert(MANUFACTURER_QDS, "Qundis GmbH");
    map.insert(0x0907, "Brunata Hürth");
    map.insert(0x2674, "ista International");
    map.insert(0x5068, "Techem GmbH");
    map.insert(0x4DEE, "Sontex SA");
    map.insert(0x15C7, "Engelmann");

    // Water
    map.insert(0x05B4, "Aquametro AG");
    map.insert(0x2324, "Diehl Metering (Hydrometer)");
    map.insert(0x68AE, "Zenner International");

    // Multi-utility
    map.insert(0x2C2D, "Kamstrup");
    map.insert(0x32A7, "Landis+Gyr");
    map.insert(0x4CAE, "Sensus Metering Systems");
    map.insert(0x1593, "Elster (Honeywell)");

    map
});

/// Convert a 3-letter manufacturer code (case insensitive) to its id.
///
/// # Examples
/// ```rust
/// use mbus_fields::drivers::manufacturer::manufacturer_to_id;
///
/// assert_eq!(manufacturer_to_id("QDS"), Some(0x4493));
/// assert_eq!(manufacturer_to_id("kam"), Some(0x2C2D));
/// assert_eq!(manufacturer_to_id("123"), None);
/// ```
pub fn manufacturer_to_id(manufacturer: &str) -> Option<u16> {
    let code = manufacturer.as_bytes();
    if code.len() != 3 || !code.iter().all(u8::is_ascii_alphabetic) {
        return None;
    }

    Some(
        code.iter()
            .fold(0u16, |id, c| id * 32 + u16::from(c.to_ascii_uppercase() - 64)),
    )
}

/// Convert a manufacturer id to its 3-letter code, "UNK" when the id does not
/// decode to three letters.
///
/// # Examples
/// ```rust
/// use mbus_fields::drivers::manufacturer::id_to_manufacturer;
///
/// assert_eq!(id_to_manufacturer(0x4493), "QDS");
/// assert_eq!(id_to_manufacturer(0xC493), "QDS");
/// assert_eq!(id_to_manufacturer(0x0000), "UNK");
/// ```
pub fn id_to_manufacturer(id: u16) -> String {
    let id_val = id & 0x7FFF;
    let letters = [id_val / 1024, (id_val / 32) % 32, id_val % 32];

    if letters.iter().any(|v| !(1..=26).contains(v)) {
        return "UNK".to_string();
    }

    letters.iter().map(|v| ((v + 64) as u8) as char).collect()
}

/// Full name of a known manufacturer.
pub fn manufacturer_name(id: u16) -> Option<&'static str> {
    KNOWN_MANUFACTURERS.get(&(id & 0x7FFF)).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_encoding() {
        assert_eq!(manufacturer_to_id("CEN"), Some(0x0CAE));
        assert_eq!(manufacturer_to_id("QDS"), Some(MANUFACTURER_QDS));
        assert_eq!(manufacturer_to_id("Kam"), Some(0x2C2D));
        assert_eq!(manufacturer_to_id("AAA"), Some(0x0421));
        assert_eq!(manufacturer_to_id("ZZZ"), Some(0x6B5A));
    }

    #[test]
    fn test_invalid_codes() {
        assert_eq!(manufacturer_to_id(""), None);
        assert_eq!(manufacturer_to_id("AB"), None);
        assert_eq!(manufacturer_to_id("ABCD"), None);
        assert_eq!(manufacturer_to_id("A1B"), None);
        assert_eq!(manufacturer_to_id("ÄBC"), None);
    }

    #[test]
    fn test_decoding_and_soft_address() {
        assert_eq!(id_to_manufacturer(0x0CAE), "CEN");
        assert_eq!(id_to_manufacturer(0x8CAE), "CEN");
        assert_eq!(id_to_manufacturer(0x0420), "UNK");
        assert_eq!(id_to_manufacturer(0x6B5B), "UNK");
    }

    #[test]
    fn test_known_names_are_consistent() {
        for &id in KNOWN_MANUFACTURERS.keys() {
            let code = id_to_manufacturer(id);
            assert_ne!(code, "UNK", "0x{:04X}", id);
            assert_eq!(manufacturer_to_id(&code), Some(id));
        }
        assert_eq!(manufacturer_name(MANUFACTURER_QDS), Some("Qundis GmbH"));
        assert_eq!(manufacturer_name(0x0421), None);
    }
}
