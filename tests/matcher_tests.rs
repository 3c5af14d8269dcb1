//! Field matching against records read from real descriptor chains.

use mbus_fields::{read_records, DataRecord, FieldMatcher, MeasurementType, VifRange};
use proptest::prelude::*;

// Body of the Q heat 5.5 US telegram
const QHEAT_BODY: &str = "0c0d000000004c0d00000000426cffffcc080d00000000c2086cdf2802fd170000326cffff046d3a0ddb29";

fn records() -> Vec<DataRecord> {
    let chain = read_records(&hex::decode(QHEAT_BODY).unwrap());
    assert!(chain.error.is_none());
    chain.records
}

#[test]
fn test_raw_key_and_structured_agree() {
    let records = records();
    let by_key = FieldMatcher::new().raw_key("C2086C").find(&records).unwrap();
    let structured = FieldMatcher::new()
        .measurement_type(MeasurementType::Instantaneous)
        .vif_range(VifRange::Date)
        .storage_nr(17)
        .find(&records)
        .unwrap();
    assert_eq!(by_key, structured);
    assert_eq!(by_key.data, vec![0xDF, 0x28]);
}

#[test]
fn test_structured_defaults_are_wildcards() {
    let records = records();
    let dates: Vec<u64> = records
        .iter()
        .filter(|r| FieldMatcher::new().vif_range(VifRange::Date).matches(r))
        .map(|r| r.storage_nr())
        .collect();
    assert_eq!(dates, [1, 17, 0]);
}

#[test]
fn test_composite_energy_range() {
    let records = records();
    let energy = FieldMatcher::new().vif_range(VifRange::AnyEnergy);
    assert_eq!(records.iter().filter(|r| energy.matches(r)).count(), 3);
    assert_eq!(
        energy.clone().index_nr(3).find(&records).map(|r| r.raw_key()),
        Some("CC080D".to_string())
    );
    assert!(energy.index_nr(4).find(&records).is_none());
}

#[test]
fn test_at_error_measurement() {
    let records = records();
    let record = FieldMatcher::new()
        .measurement_type(MeasurementType::AtError)
        .find(&records)
        .unwrap();
    assert_eq!(record.raw_key(), "326C");
}

proptest! {
    /// Changing any single descriptor byte breaks a raw-key match.
    #[test]
    fn prop_raw_key_is_exact(index in 0usize..3, replacement in any::<u8>()) {
        let key = [0xCCu8, 0x08, 0x0D];
        prop_assume!(key[index] != replacement);

        let mut body = key.to_vec();
        body[index] = replacement;
        body.extend([0u8; 8]);
        let chain = read_records(&body);

        let matcher = FieldMatcher::new().raw_key("CC080D");
        prop_assert!(chain.records.iter().all(|r| !matcher.matches(r)));
    }
}
