//! # Field Matcher
//!
//! Selects the data record a driver field reads from. A matcher either names
//! the exact descriptor bytes (`raw_key`) or constrains the resolved record
//! attributes. A raw key, when set, is the only thing compared: structured
//! VIF range matching cannot tell apart every exponent and unit combination
//! vendors use, so drivers pin such records by their bytes.

use crate::payload::record::{DataRecord, MeasurementType};
use crate::payload::vif::VifRange;

/// Criteria for picking one record out of a telegram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMatcher {
    pub raw_key: Option<String>,
    pub measurement_type: Option<MeasurementType>,
    pub storage_nr: Option<u64>,
    pub tariff: Option<u32>,
    pub subunit: Option<u32>,
    pub vif_range: Option<VifRange>,
    /// Which match to take, counting from 1.
    pub index_nr: usize,
}

impl Default for FieldMatcher {
    fn default() -> Self {
        Self {
            raw_key: None,
            measurement_type: None,
            storage_nr: None,
            tariff: None,
            subunit: None,
            vif_range: None,
            index_nr: 1,
        }
    }
}

impl FieldMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match the uppercase hex of DIF, DIFEs, VIF and VIFEs exactly.
    pub fn raw_key(mut self, key: &str) -> Self {
        self.raw_key = Some(key.to_ascii_uppercase());
        self
    }

    pub fn measurement_type(mut self, measurement_type: MeasurementType) -> Self {
        self.measurement_type = Some(measurement_type);
        self
    }

    pub fn storage_nr(mut self, storage_nr: u64) -> Self {
        self.storage_nr = Some(storage_nr);
        self
    }

    pub fn tariff(mut self, tariff: u32) -> Self {
        self.tariff = Some(tariff);
        self
    }

    pub fn subunit(mut self, subunit: u32) -> Self {
        self.subunit = Some(subunit);
        self
    }

    pub fn vif_range(mut self, range: VifRange) -> Self {
        self.vif_range = Some(range);
        self
    }

    pub fn index_nr(mut self, index_nr: usize) -> Self {
        self.index_nr = index_nr;
        self
    }

    /// Whether `record` satisfies these criteria.
    pub fn matches(&self, record: &DataRecord) -> bool {
        if let Some(key) = &self.raw_key {
            return record.raw_key() == *key;
        }

        self.measurement_type
            .map_or(true, |m| m == record.measurement_type())
            && self.storage_nr.map_or(true, |s| s == record.storage_nr())
            && self.tariff.map_or(true, |t| t == record.tariff())
            && self.subunit.map_or(true, |s| s == record.subunit())
            && self.vif_range.map_or(true, |range| {
                record
                    .vif_range()
                    .map_or(false, |concrete| range.contains(concrete))
            })
    }

    /// The `index_nr`-th matching record in telegram order.
    pub fn find<'a>(&self, records: &'a [DataRecord]) -> Option<&'a DataRecord> {
        records
            .iter()
            .filter(|record| self.matches(record))
            .nth(self.index_nr.saturating_sub(1))
    }
}
