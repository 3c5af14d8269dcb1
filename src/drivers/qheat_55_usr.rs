//! Qundis Q heat 5.5 US heat meter.
//!
//! The energy records are matched by raw key: structured matching on
//! measurement type and energy VIF range does not pick them out reliably
//! on this meter. Error bit
//! meanings come from an unofficial installer manual and are left to
//! configuration overrides where they turn out wrong.

use super::manufacturer::MANUFACTURER_QDS;
use super::matcher::FieldMatcher;
use super::translate::LookupTable;
use super::{DriverDeclaration, FieldSpec, LinkModes, MeterType, PrintProperties};
use crate::payload::record::MeasurementType;
use crate::payload::vif::VifRange;
use crate::units::{Quantity, Unit};

pub const DRIVER_NAME: &str = "qheat_55_usr";

/// Media byte for heat meters (return flow)
const MEDIA_HEAT: u8 = 0x04;

pub fn error_flags_table() -> LookupTable {
    LookupTable::new("ERROR_FLAGS", 0xFFFF, "OK")
        .flag(0x0001, "NO_FLOW")
        .flag(0x0002, "SUPPLY_SENSOR_INTERRUPTED")
        .flag(0x0004, "RETURN_SENSOR_INTERRUPTED")
        .flag(0x0008, "TEMPERATURE_ELECTRONICS_ERROR")
        .flag(0x0010, "BATTERY_VOLTAGE_ERROR")
        .flag(0x0020, "SHORT_CIRCUIT_SUPPLY_SENSOR")
        .flag(0x0040, "SHORT_CIRCUIT_RETURN_SENSOR")
        .flag(0x0080, "MEMORY_ERROR")
        .flag(0x0100, "SABOTAGE")
        .flag(0x0200, "ELECTRONICS_ERROR")
}

pub fn declaration() -> DriverDeclaration {
    let important = PrintProperties::FIELD | PrintProperties::JSON | PrintProperties::IMPORTANT;
    let json = PrintProperties::FIELD | PrintProperties::JSON;

    DriverDeclaration::new(DRIVER_NAME, MeterType::HeatMeter)
        .link_modes(LinkModes::C1)
        .detect(MANUFACTURER_QDS, MEDIA_HEAT, 0x46)
        .field(FieldSpec::numeric(
            "total_energy_consumption",
            "The total energy consumption recorded by this meter.",
            important,
            Quantity::Energy,
            Unit::GJ,
            FieldMatcher::new().raw_key("0C0D"),
        ))
        .field(FieldSpec::numeric(
            "cutoff_date_energy_consumption",
            "Energy consumption at the last billing cutoff date.",
            json,
            Quantity::Energy,
            Unit::GJ,
            FieldMatcher::new().raw_key("4C0D"),
        ))
        .field(FieldSpec::numeric(
            "last_month_energy_consumption",
            "Energy consumption at the end of last month.",
            json,
            Quantity::Energy,
            Unit::GJ,
            FieldMatcher::new().raw_key("CC080D"),
        ))
        .field(FieldSpec::text(
            "cutoff_date",
            "The last billing cutoff date.",
            json,
            FieldMatcher::new()
                .measurement_type(MeasurementType::Instantaneous)
                .vif_range(VifRange::Date)
                .storage_nr(1),
        ))
        .field(FieldSpec::text(
            "last_month_date",
            "The date of the last month value.",
            json,
            FieldMatcher::new()
                .measurement_type(MeasurementType::Instantaneous)
                .vif_range(VifRange::Date)
                .storage_nr(17),
        ))
        .field(FieldSpec::text(
            "device_date_time",
            "Date and time when the meter sent the telegram.",
            json,
            FieldMatcher::new()
                .measurement_type(MeasurementType::Instantaneous)
                .vif_range(VifRange::DateTime),
        ))
        .field(FieldSpec::text(
            "device_error_date",
            "Date when the meter last entered an error state.",
            json,
            FieldMatcher::new()
                .measurement_type(MeasurementType::AtError)
                .vif_range(VifRange::Date),
        ))
        .field(FieldSpec::flags(
            "error_flags",
            "Error flags reported by the meter.",
            json | PrintProperties::STATUS,
            error_flags_table(),
            FieldMatcher::new().vif_range(VifRange::ErrorFlags),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::translate::translate;
    use crate::drivers::FieldKind;

    #[test]
    fn test_declaration_shape() {
        let driver = declaration();
        assert_eq!(driver.name, DRIVER_NAME);
        assert_eq!(driver.meter_type, MeterType::HeatMeter);
        assert!(driver.link_modes.contains(LinkModes::C1));
        assert_eq!(driver.detection.len(), 1);
        assert_eq!(driver.fields.len(), 8);
        assert_eq!(driver.fields[0].name, "total_energy_consumption");
        assert!(matches!(
            driver.field_by_name("error_flags").map(|f| &f.kind),
            Some(FieldKind::Flags(_))
        ));
    }

    #[test]
    fn test_every_documented_bit_translates_alone() {
        let table = error_flags_table();
        for rule in &table.rules {
            let t = translate(rule.mask, &table);
            assert_eq!(t.flags, vec![rule.name.clone()]);
            assert_eq!(t.unknown_bits, 0);
        }
    }

    #[test]
    fn test_error_flags_match_on_vif_range_alone() {
        let driver = declaration();
        let matcher = &driver.field_by_name("error_flags").unwrap().matcher;
        assert_eq!(matcher.vif_range, Some(VifRange::ErrorFlags));
        assert_eq!(matcher.measurement_type, None);
        assert!(matcher.raw_key.is_none());
    }

    #[test]
    fn test_undocumented_bit() {
        let t = translate(0x0400, &error_flags_table());
        assert_eq!(t.flags, vec!["UNKNOWN_BITS_0400"]);
    }
}
