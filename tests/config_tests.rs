//! Loading decoder configuration from files.

use std::io::Write;

use mbus_fields::drivers::qheat_55_usr;
use mbus_fields::{ConfigError, DecodeError, Decoder, DecoderConfig, DuplicatePolicy, LookupTable};
use tempfile::NamedTempFile;

const QHEAT_HEX: &str = "41449344796550674637727965506793444604dc0000200c0d000000004c0d00000000426cffffcc080d00000000c2086cdf2802fd170000326cffff046d3a0ddb29";

#[test]
fn test_round_trip_through_file() {
    let mut config = DecoderConfig {
        duplicate_policy: DuplicatePolicy::FirstWins,
        ..DecoderConfig::default()
    };
    config.lookup_overrides.entry(qheat_55_usr::DRIVER_NAME.to_string()).or_default().insert(
        "error_flags".to_string(),
        LookupTable::new("ERROR_FLAGS", 0xFFFF, "OK").flag(0x01, "DRY"),
    );

    let file = NamedTempFile::new().unwrap();
    config.save_to_file(file.path()).unwrap();
    let loaded = DecoderConfig::from_file(file.path()).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_override_changes_flag_names() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "lookup_overrides": {{
                "qheat_55_usr": {{
                    "error_flags": {{
                        "name": "ERROR_FLAGS",
                        "mask": 65535,
                        "no_error": "ALL_GOOD",
                        "rules": [{{"mask": 1, "name": "DRY"}}]
                    }}
                }}
            }}
        }}"#
    )
    .unwrap();

    let config = DecoderConfig::from_file(file.path()).unwrap();
    let decoder = Decoder::from_config(&config).unwrap();
    let decoded = decoder.decode(&hex::decode(QHEAT_HEX).unwrap()).unwrap();
    assert_eq!(decoded.flags("error_flags").unwrap(), ["ALL_GOOD"]);
}

#[test]
fn test_override_of_missing_field_is_rejected() {
    let config = DecoderConfig::from_json_str(
        r#"{"lookup_overrides": {"nope": {"error_flags": {"name": "E", "mask": 1, "no_error": "OK", "rules": []}}}}"#,
    )
    .unwrap();
    assert_eq!(
        Decoder::from_config(&config).unwrap_err(),
        DecodeError::UnknownLookupTarget {
            driver: "nope".into(),
            field: "error_flags".into()
        }
    );
}

#[test]
fn test_override_rule_outside_mask_is_rejected() {
    let config = DecoderConfig::from_json_str(
        r#"{"lookup_overrides": {"qheat_55_usr": {"error_flags": {"name": "E", "mask": 255, "no_error": "OK", "rules": [{"mask": 256, "name": "SABOTAGE"}]}}}}"#,
    )
    .unwrap();
    assert_eq!(
        Decoder::from_config(&config).unwrap_err(),
        DecodeError::FlagOutsideMask {
            driver: "qheat_55_usr".into(),
            field: "error_flags".into(),
            flag: "SABOTAGE".into()
        }
    );
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        DecoderConfig::from_file(dir.path().join("absent.json")),
        Err(ConfigError::Io(_))
    ));
}
