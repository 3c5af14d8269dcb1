//! Unit tests for the `DecodeError` enum and its `Display` implementation.

use mbus_fields::error::DecodeError;
use mbus_fields::Unit;

/// Tests that the `NoMatchingDriver` variant names the detection tuple.
#[test]
fn test_no_matching_driver() {
    let err = DecodeError::NoMatchingDriver {
        manufacturer: "QDS".into(),
        media: 0x04,
        version: 0x3C,
    };
    assert_eq!(
        err.to_string(),
        "No matching driver for manufacturer QDS media 0x04 version 0x3C"
    );
    assert!(err.is_header_fatal());
    assert!(!err.is_chain_error());
}

/// Tests that the `TruncatedChain` variant is correctly formatted.
#[test]
fn test_truncated_chain() {
    let err = DecodeError::TruncatedChain {
        offset: 9,
        needed: 1,
        available: 0,
    };
    assert_eq!(
        err.to_string(),
        "Truncated descriptor chain at offset 9: need 1 bytes, 0 left"
    );
    assert!(err.is_chain_error());
}

/// Tests that the `UnknownDataFieldType` variant is correctly formatted.
#[test]
fn test_unknown_data_field_type() {
    let err = DecodeError::UnknownDataFieldType { dif: 0x08, offset: 6 };
    assert_eq!(err.to_string(), "Unknown data field type in DIF 0x08 at offset 6");
}

/// Tests that the `InvalidDigit` variant is correctly formatted.
#[test]
fn test_invalid_digit() {
    let err = DecodeError::InvalidDigit { byte: 0xA0 };
    assert_eq!(err.to_string(), "Invalid BCD digit in byte 0xA0");
    assert!(!err.is_header_fatal());
}

/// Tests that the `IncompatibleUnit` variant uses unit symbols.
#[test]
fn test_incompatible_unit() {
    let err = DecodeError::IncompatibleUnit {
        from: Unit::M3,
        to: Unit::GJ,
    };
    assert_eq!(err.to_string(), "Incompatible units: cannot convert m³ to GJ");
}

/// Tests that the `UnsupportedCi` variant is correctly formatted.
#[test]
fn test_unsupported_ci() {
    assert_eq!(DecodeError::UnsupportedCi(0xA0).to_string(), "Unsupported CI field: 0xA0");
}

/// Tests that the `DuplicateDetectionKey` variant names both drivers.
#[test]
fn test_duplicate_detection_key() {
    let err = DecodeError::DuplicateDetectionKey {
        key: "QDS/0x04/0x46".into(),
        driver: "copycat".into(),
        existing: "qheat_55_usr".into(),
    };
    assert_eq!(
        err.to_string(),
        "Duplicate detection key QDS/0x04/0x46 for driver copycat (already claimed by qheat_55_usr)"
    );
}
