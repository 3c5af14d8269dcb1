//! Driver Declarations
//!
//! A driver describes one meter model as data: how to recognise its
//! telegrams (detection keys) and which named values to pull out of them
//! (field specs). Adding a meter means adding a declaration, the decoder
//! itself never changes.

pub mod manufacturer;
pub mod matcher;
pub mod qheat_55_usr;
pub mod registry;
pub mod translate;

use std::collections::HashSet;
use std::fmt;

use bitflags::bitflags;
use serde::Serialize;

use crate::error::DecodeError;
use crate::payload::record::DataRecord;
use crate::payload::value::VifScaling;
use crate::units::{check_compatible, Quantity, Unit};
use manufacturer::id_to_manufacturer;
use matcher::FieldMatcher;
use translate::LookupTable;

pub use registry::{DriverRegistry, DuplicatePolicy, SharedRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MeterType {
    HeatMeter,
    WaterMeter,
    WarmWaterMeter,
    GasMeter,
    ElectricityMeter,
    HeatCostAllocationMeter,
    UnknownMeter,
}

impl fmt::Display for MeterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MeterType::HeatMeter => "HeatMeter",
            MeterType::WaterMeter => "WaterMeter",
            MeterType::WarmWaterMeter => "WarmWaterMeter",
            MeterType::GasMeter => "GasMeter",
            MeterType::ElectricityMeter => "ElectricityMeter",
            MeterType::HeatCostAllocationMeter => "HeatCostAllocationMeter",
            MeterType::UnknownMeter => "UnknownMeter",
        };
        f.write_str(name)
    }
}

bitflags! {
    /// Radio link modes a meter transmits in.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct LinkModes: u16 {
        const S1 = 0x0001;
        const S1M = 0x0002;
        const S2 = 0x0004;
        const T1 = 0x0008;
        const T2 = 0x0010;
        const C1 = 0x0020;
        const C2 = 0x0040;
        const N1 = 0x0080;
        const MBUS = 0x0100;
    }
}

bitflags! {
    /// Presentation hints for downstream consumers. The decoder ignores them.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct PrintProperties: u8 {
        const FIELD = 0x01;
        const JSON = 0x02;
        const IMPORTANT = 0x04;
        const STATUS = 0x08;
        const OPTIONAL = 0x10;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionMatch {
    Exact(u8),
    /// Any version; loses to an exact key for the same manufacturer and media.
    Any,
}

/// Manufacturer, media and version a driver claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DetectionKey {
    pub manufacturer: u16,
    pub media: u8,
    pub version: VersionMatch,
}

impl DetectionKey {
    pub fn new(manufacturer: u16, media: u8, version: u8) -> Self {
        Self {
            manufacturer,
            media,
            version: VersionMatch::Exact(version),
        }
    }

    pub fn any_version(manufacturer: u16, media: u8) -> Self {
        Self {
            manufacturer,
            media,
            version: VersionMatch::Any,
        }
    }

    pub fn matches(&self, manufacturer: u16, media: u8, version: u8) -> bool {
        self.manufacturer == manufacturer
            && self.media == media
            && match self.version {
                VersionMatch::Exact(v) => v == version,
                VersionMatch::Any => true,
            }
    }
}

impl fmt::Display for DetectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/0x{:02X}/", id_to_manufacturer(self.manufacturer), self.media)?;
        match self.version {
            VersionMatch::Exact(v) => write!(f, "0x{:02X}", v),
            VersionMatch::Any => f.write_str("*"),
        }
    }
}

/// What a field produces.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Numeric {
        quantity: Quantity,
        unit: Unit,
        scaling: VifScaling,
    },
    Text,
    Flags(LookupTable),
}

/// One named output of a driver.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub description: String,
    pub properties: PrintProperties,
    pub kind: FieldKind,
    pub matcher: FieldMatcher,
}

impl FieldSpec {
    pub fn numeric(
        name: &str,
        description: &str,
        properties: PrintProperties,
        quantity: Quantity,
        unit: Unit,
        matcher: FieldMatcher,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            properties,
            kind: FieldKind::Numeric {
                quantity,
                unit,
                scaling: VifScaling::Auto,
            },
            matcher,
        }
    }

    pub fn text(name: &str, description: &str, properties: PrintProperties, matcher: FieldMatcher) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            properties,
            kind: FieldKind::Text,
            matcher,
        }
    }

    pub fn flags(
        name: &str,
        description: &str,
        properties: PrintProperties,
        table: LookupTable,
        matcher: FieldMatcher,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            properties,
            kind: FieldKind::Flags(table),
            matcher,
        }
    }

    /// Switch a numeric field to another scaling mode.
    pub fn with_scaling(mut self, new_scaling: VifScaling) -> Self {
        if let FieldKind::Numeric { scaling, .. } = &mut self.kind {
            *scaling = new_scaling;
        }
        self
    }

    fn validate(&self, driver: &str) -> Result<(), DecodeError> {
        let key_record = match &self.matcher.raw_key {
            Some(key) => {
                let record = hex::decode(key)
                    .ok()
                    .and_then(|bytes| DataRecord::from_raw_key(&bytes))
                    .ok_or_else(|| DecodeError::InvalidDifVifKey {
                        driver: driver.to_string(),
                        field: self.name.clone(),
                        key: key.clone(),
                    })?;
                Some(record)
            }
            None => None,
        };

        if let FieldKind::Numeric {
            quantity,
            unit,
            scaling,
        } = &self.kind
        {
            check_compatible(quantity.default_unit(), *unit)?;

            if *scaling == VifScaling::Auto {
                if let Some(implied) = key_record.as_ref().and_then(DataRecord::implied_unit) {
                    check_compatible(implied.unit, *unit)?;
                }
                if let Some(range_quantity) = self.matcher.vif_range.and_then(|r| r.quantity()) {
                    check_compatible(range_quantity.default_unit(), *unit)?;
                }
            }
        }

        if let FieldKind::Flags(table) = &self.kind {
            if let Some(rule) = table.rule_outside_mask() {
                return Err(DecodeError::FlagOutsideMask {
                    driver: driver.to_string(),
                    field: self.name.clone(),
                    flag: rule.name.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Everything the decoder needs to know about one meter model.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverDeclaration {
    pub name: String,
    pub meter_type: MeterType,
    pub link_modes: LinkModes,
    pub detection: Vec<DetectionKey>,
    pub fields: Vec<FieldSpec>,
}

impl DriverDeclaration {
    pub fn new(name: &str, meter_type: MeterType) -> Self {
        Self {
            name: name.to_string(),
            meter_type,
            link_modes: LinkModes::empty(),
            detection: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn link_modes(mut self, link_modes: LinkModes) -> Self {
        self.link_modes = link_modes;
        self
    }

    pub fn detect(mut self, manufacturer: u16, media: u8, version: u8) -> Self {
        self.detection.push(DetectionKey::new(manufacturer, media, version));
        self
    }

    pub fn detect_any_version(mut self, manufacturer: u16, media: u8) -> Self {
        self.detection.push(DetectionKey::any_version(manufacturer, media));
        self
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn field_by_name(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Static checks run at registration: unique field names, parsable raw
    /// keys, and units that fit the declared quantity and descriptor.
    pub fn validate(&self) -> Result<(), DecodeError> {
        let mut names = HashSet::new();
        for field in &self.fields {
            if !names.insert(field.name.as_str()) {
                return Err(DecodeError::DuplicateFieldName {
                    driver: self.name.clone(),
                    field: field.name.clone(),
                });
            }
            field.validate(&self.name)?;
        }
        Ok(())
    }
}

/// Declarations compiled into the crate.
pub fn builtin_drivers() -> Vec<DriverDeclaration> {
    vec![qheat_55_usr::declaration()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::vif::VifRange;

    fn energy(name: &str, key: &str, unit: Unit) -> FieldSpec {
        FieldSpec::numeric(
            name,
            "energy",
            PrintProperties::JSON,
            Quantity::Energy,
            unit,
            FieldMatcher::new().raw_key(key),
        )
    }

    #[test]
    fn test_detection_key_display() {
        assert_eq!(DetectionKey::new(0x4493, 0x04, 0x46).to_string(), "QDS/0x04/0x46");
        assert_eq!(DetectionKey::any_version(0x4493, 0x04).to_string(), "QDS/0x04/*");
    }

    #[test]
    fn test_detection_key_matching() {
        assert!(DetectionKey::new(0x4493, 0x04, 0x46).matches(0x4493, 0x04, 0x46));
        assert!(!DetectionKey::new(0x4493, 0x04, 0x46).matches(0x4493, 0x04, 0x3C));
        assert!(DetectionKey::any_version(0x4493, 0x04).matches(0x4493, 0x04, 0x3C));
    }

    #[test]
    fn test_validate_accepts_builtins() {
        for driver in builtin_drivers() {
            driver.validate().unwrap();
        }
    }

    #[test]
    fn test_validate_duplicate_field_name() {
        let driver = DriverDeclaration::new("dup", MeterType::HeatMeter)
            .field(energy("total", "0C0D", Unit::GJ))
            .field(energy("total", "4C0D", Unit::GJ));
        assert_eq!(
            driver.validate().unwrap_err(),
            DecodeError::DuplicateFieldName {
                driver: "dup".into(),
                field: "total".into()
            }
        );
    }

    #[test]
    fn test_validate_invalid_raw_key() {
        let driver = DriverDeclaration::new("bad", MeterType::HeatMeter)
            .field(energy("total", "0C0Z", Unit::GJ));
        assert!(matches!(
            driver.validate(),
            Err(DecodeError::InvalidDifVifKey { .. })
        ));

        let driver = DriverDeclaration::new("bad", MeterType::HeatMeter)
            .field(energy("total", "0C", Unit::GJ));
        assert!(matches!(
            driver.validate(),
            Err(DecodeError::InvalidDifVifKey { .. })
        ));
    }

    #[test]
    fn test_validate_incompatible_units() {
        // Declared energy, published in m3
        let driver = DriverDeclaration::new("bad", MeterType::HeatMeter)
            .field(energy("total", "0C0D", Unit::M3));
        assert!(matches!(
            driver.validate(),
            Err(DecodeError::IncompatibleUnit { .. })
        ));

        // Raw key implies volume
        let driver = DriverDeclaration::new("bad", MeterType::HeatMeter)
            .field(energy("total", "0C13", Unit::GJ));
        assert_eq!(
            driver.validate().unwrap_err(),
            DecodeError::IncompatibleUnit {
                from: Unit::M3,
                to: Unit::GJ
            }
        );

        // Structured range implies volume
        let driver = DriverDeclaration::new("bad", MeterType::HeatMeter).field(FieldSpec::numeric(
            "total",
            "energy",
            PrintProperties::JSON,
            Quantity::Energy,
            Unit::GJ,
            FieldMatcher::new().vif_range(VifRange::Volume),
        ));
        assert!(driver.validate().is_err());
    }

    #[test]
    fn test_raw_scaling_skips_descriptor_check() {
        let driver = DriverDeclaration::new("raw", MeterType::HeatMeter)
            .field(energy("total", "0C13", Unit::GJ).with_scaling(VifScaling::None));
        assert!(driver.validate().is_ok());
    }

    #[test]
    fn test_validate_flag_outside_mask() {
        let table = LookupTable::new("ERRORS", 0x00FF, "OK")
            .flag(0x0001, "NO_FLOW")
            .flag(0x0100, "SABOTAGE");
        let driver = DriverDeclaration::new("flags", MeterType::HeatMeter).field(FieldSpec::flags(
            "error_flags",
            "errors",
            PrintProperties::JSON,
            table,
            FieldMatcher::new().vif_range(VifRange::ErrorFlags),
        ));
        assert_eq!(
            driver.validate().unwrap_err(),
            DecodeError::FlagOutsideMask {
                driver: "flags".into(),
                field: "error_flags".into(),
                flag: "SABOTAGE".into()
            }
        );
    }
}
