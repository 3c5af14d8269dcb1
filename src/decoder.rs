//! # Telegram Decoder
//!
//! Runs one telegram through the whole pipeline: header, driver resolution,
//! descriptor chain, then every field spec of the driver in declaration
//! order. Only a header that cannot be read or attributed aborts decoding;
//! everything after that ends up either as a field value or as a
//! [`Diagnostic`] next to the values that did decode.
//!
//! ```rust
//! use mbus_fields::Decoder;
//!
//! let telegram = hex::decode(
//!     "41449344796550674637727965506793444604dc0000200c0d000000004c0d00000000\
//!      426cffffcc080d00000000c2086cdf2802fd170000326cffff046d3a0ddb29",
//! )
//! .unwrap();
//!
//! let decoder = Decoder::builtin().unwrap();
//! let decoded = decoder.decode(&telegram).unwrap();
//! assert_eq!(decoded.driver, "qheat_55_usr");
//! assert_eq!(decoded.text("last_month_date"), Some("2022-08-31"));
//! ```

use std::fmt;
use std::sync::Arc;

use log::{debug, warn};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::config::DecoderConfig;
use crate::drivers::manufacturer::id_to_manufacturer;
use crate::drivers::registry::{DriverRegistry, SharedRegistry};
use crate::drivers::translate::translate;
use crate::drivers::{DriverDeclaration, FieldKind, FieldSpec, MeterType};
use crate::error::DecodeError;
use crate::logging::{log_debug, log_warn};
use crate::payload::record::{read_records, DataRecord};
use crate::payload::value::{decode_bits, decode_numeric, decode_value, FieldValue, RawValue};
use crate::util::logging::log_telegram_hex;
use crate::wmbus::telegram::{media_name, parse_telegram, DeviceAddress, TelegramHeader};

/// A non-fatal issue met while decoding a telegram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// No record satisfied the field's matcher.
    UnmatchedField { field: String },
    /// A record matched but its payload could not be turned into a value.
    UndecodableField { field: String, reason: String },
    /// Bits no lookup rule names.
    UnknownBits { field: String, bits: u64 },
    /// A date that is neither a calendar date nor the unset pattern.
    InvalidDate { field: String, value: String },
    /// The meter flagged its clock as not valid.
    InvalidTimestamp { field: String, value: String },
    /// The L-field claims more bytes than were supplied.
    LengthMismatch { claimed: usize, available: usize },
    /// The descriptor chain stopped early; later records are missing.
    ChainError { reason: String },
    /// Manufacturer specific bytes after the last record.
    ManufacturerData { bytes: usize },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnmatchedField { field } => write!(f, "{field}: no matching record"),
            Diagnostic::UndecodableField { field, reason } => write!(f, "{field}: {reason}"),
            Diagnostic::UnknownBits { field, bits } => {
                write!(f, "{field}: unknown bits 0x{bits:04X}")
            }
            Diagnostic::InvalidDate { field, value } => write!(f, "{field}: invalid date {value}"),
            Diagnostic::InvalidTimestamp { field, value } => {
                write!(f, "{field}: meter marked time {value} as invalid")
            }
            Diagnostic::LengthMismatch { claimed, available } => {
                write!(f, "length field claims {claimed} bytes, {available} present")
            }
            Diagnostic::ChainError { reason } => write!(f, "{reason}"),
            Diagnostic::ManufacturerData { bytes } => {
                write!(f, "{bytes} bytes of manufacturer specific data")
            }
        }
    }
}

/// One named output value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedField {
    pub name: String,
    pub value: FieldValue,
}

/// Best-effort result of decoding one telegram.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedTelegram {
    pub driver: String,
    pub meter_type: MeterType,
    pub header: TelegramHeader,
    /// Decoded fields in driver declaration order.
    pub fields: Vec<DecodedField>,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip)]
    pub chain_error: Option<DecodeError>,
}

impl DecodedTelegram {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    pub fn numeric(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            FieldValue::Numeric { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn flags(&self, name: &str) -> Option<&[String]> {
        match self.get(name)? {
            FieldValue::Flags(flags) => Some(flags),
            _ => None,
        }
    }

    /// The error that cut the descriptor chain short, if any.
    pub fn chain_error(&self) -> Option<&DecodeError> {
        self.chain_error.as_ref()
    }

    /// True when the descriptor chain could not be read to its end.
    pub fn is_partial(&self) -> bool {
        self.chain_error.is_some()
    }

    /// Flat JSON in the usual meter publishing shape.
    ///
    /// ```json
    /// {"meter":"qheat_55_usr","id":"67506579","media":"heat",
    ///  "total_energy_consumption_gj":0.0,"error_flags":"OK", ...}
    /// ```
    pub fn to_json(&self) -> Value {
        let address = self.header.address();
        let mut map = Map::new();
        map.insert("meter".into(), json!(self.driver));
        map.insert("id".into(), json!(address.id));
        map.insert("media".into(), json!(media_name(address.media)));

        for field in &self.fields {
            match &field.value {
                FieldValue::Numeric { value, unit } => {
                    map.insert(format!("{}_{}", field.name, unit.suffix()), json!(value));
                }
                FieldValue::Text(text) => {
                    map.insert(field.name.clone(), json!(text));
                }
                FieldValue::Flags(flags) => {
                    map.insert(field.name.clone(), json!(flags.join(" ")));
                }
            }
        }

        Value::Object(map)
    }
}

/// Decodes telegrams against a driver registry.
#[derive(Debug, Clone)]
pub struct Decoder {
    registry: Arc<DriverRegistry>,
    prefer_transport_header: bool,
}

impl Decoder {
    pub fn new(registry: Arc<DriverRegistry>) -> Self {
        Self {
            registry,
            prefer_transport_header: true,
        }
    }

    /// Decoder over the compiled-in drivers with default settings.
    pub fn builtin() -> Result<Self, DecodeError> {
        Self::from_config(&DecoderConfig::default())
    }

    pub fn from_config(config: &DecoderConfig) -> Result<Self, DecodeError> {
        let registry = DriverRegistry::from_config(config)?;
        Ok(Self::new(Arc::new(registry)).prefer_transport_header(config.prefer_transport_header))
    }

    /// Decoder bound to the registry `shared` holds right now.
    pub fn from_shared(shared: &SharedRegistry) -> Self {
        Self::new(shared.snapshot())
    }

    pub fn prefer_transport_header(mut self, prefer: bool) -> Self {
        self.prefer_transport_header = prefer;
        self
    }

    pub fn registry(&self) -> &Arc<DriverRegistry> {
        &self.registry
    }

    /// Decodes `bytes` with the driver its header resolves to.
    pub fn decode(&self, bytes: &[u8]) -> Result<DecodedTelegram, DecodeError> {
        log_telegram_hex("telegram", bytes);
        let (header, body) = parse_telegram(bytes)?;
        let driver = self.resolve(&header)?;
        Ok(decode_body(&driver, header, body))
    }

    /// Decodes `bytes` with the named driver, skipping detection.
    pub fn decode_with_driver(&self, bytes: &[u8], driver: &str) -> Result<DecodedTelegram, DecodeError> {
        log_telegram_hex("telegram", bytes);
        let driver = Arc::clone(self.registry.by_name(driver)?);
        let (header, body) = parse_telegram(bytes)?;
        Ok(decode_body(&driver, header, body))
    }

    fn resolve(&self, header: &TelegramHeader) -> Result<Arc<DriverDeclaration>, DecodeError> {
        let mut first_error = None;
        for address in header.detection_candidates(self.prefer_transport_header) {
            match self
                .registry
                .resolve(address.manufacturer, address.media, address.version)
            {
                Ok(driver) => {
                    log_debug(&format!(
                        "{} {} resolved to driver {}",
                        address.manufacturer_code(),
                        address.id,
                        driver.name
                    ));
                    return Ok(Arc::clone(driver));
                }
                Err(error) => {
                    first_error.get_or_insert(error);
                }
            }
        }
        Err(first_error.unwrap_or_else(|| no_matching_driver(header.address())))
    }
}

fn no_matching_driver(address: &DeviceAddress) -> DecodeError {
    DecodeError::NoMatchingDriver {
        manufacturer: id_to_manufacturer(address.manufacturer),
        media: address.media,
        version: address.version,
    }
}

fn decode_body(driver: &DriverDeclaration, header: TelegramHeader, body: &[u8]) -> DecodedTelegram {
    let chain = read_records(body);
    let mut diagnostics = Vec::new();

    if let Some(mismatch) = header.length_mismatch {
        warn!(
            "length field claims {} bytes, only {} supplied",
            mismatch.claimed, mismatch.available
        );
        diagnostics.push(Diagnostic::LengthMismatch {
            claimed: mismatch.claimed,
            available: mismatch.available,
        });
    }
    if let Some(error) = &chain.error {
        diagnostics.push(Diagnostic::ChainError {
            reason: error.to_string(),
        });
    }
    if let Some(data) = &chain.manufacturer_data {
        diagnostics.push(Diagnostic::ManufacturerData { bytes: data.len() });
    }

    let mut fields = Vec::with_capacity(driver.fields.len());
    for spec in &driver.fields {
        let record = match spec.matcher.find(&chain.records) {
            Some(record) => record,
            None => {
                debug!("{}.{}: no matching record", driver.name, spec.name);
                diagnostics.push(Diagnostic::UnmatchedField {
                    field: spec.name.clone(),
                });
                continue;
            }
        };

        match decode_field(spec, record, &mut diagnostics) {
            Ok(value) => {
                debug!("{}.{} = {}", driver.name, spec.name, value);
                fields.push(DecodedField {
                    name: spec.name.clone(),
                    value,
                });
            }
            Err(error) => {
                log_warn(&format!("{}.{}: {}", driver.name, spec.name, error));
                diagnostics.push(Diagnostic::UndecodableField {
                    field: spec.name.clone(),
                    reason: error.to_string(),
                });
            }
        }
    }

    DecodedTelegram {
        driver: driver.name.clone(),
        meter_type: driver.meter_type,
        header,
        fields,
        diagnostics,
        chain_error: chain.error,
    }
}

fn decode_field(
    spec: &FieldSpec,
    record: &DataRecord,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<FieldValue, DecodeError> {
    match &spec.kind {
        FieldKind::Numeric { unit, scaling, .. } => {
            let value = decode_numeric(record, *unit, *scaling)?;
            Ok(FieldValue::Numeric { value, unit: *unit })
        }
        FieldKind::Text => {
            let raw = decode_value(record)?;
            let text = raw.to_text();
            let (date, invalid_time) = match &raw {
                RawValue::Date(date) => (Some(date), false),
                RawValue::DateTime(date_time) => (Some(&date_time.date), date_time.invalid),
                _ => (None, false),
            };
            if date.map_or(false, |date| !date.is_plausible()) {
                diagnostics.push(Diagnostic::InvalidDate {
                    field: spec.name.clone(),
                    value: text.clone(),
                });
            }
            if invalid_time {
                diagnostics.push(Diagnostic::InvalidTimestamp {
                    field: spec.name.clone(),
                    value: text.clone(),
                });
            }
            Ok(FieldValue::Text(text))
        }
        FieldKind::Flags(table) => {
            let bits = decode_bits(record)?;
            let translation = translate(bits, table);
            if translation.unknown_bits != 0 {
                diagnostics.push(Diagnostic::UnknownBits {
                    field: spec.name.clone(),
                    bits: translation.unknown_bits,
                });
            }
            Ok(FieldValue::Flags(translation.flags))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::manufacturer::MANUFACTURER_QDS;
    use crate::drivers::matcher::FieldMatcher;
    use crate::drivers::PrintProperties;
    use crate::units::Unit;

    /// CI 0x78 telegram from the QDS heat meter with `body` appended.
    fn telegram(body: &str) -> Vec<u8> {
        let mut bytes = hex::decode("0044934479655067460478").unwrap();
        bytes.extend(hex::decode(body).unwrap());
        bytes[0] = (bytes.len() - 1) as u8;
        bytes
    }

    #[test]
    fn test_energy_and_flags() {
        let decoder = Decoder::builtin().unwrap();
        let decoded = decoder.decode(&telegram("0C0D0039000002FD170300")).unwrap();

        assert_eq!(decoded.numeric("total_energy_consumption"), Some(0.39));
        assert_eq!(
            decoded.flags("error_flags").unwrap(),
            ["NO_FLOW", "SUPPLY_SENSOR_INTERRUPTED"]
        );
        assert!(!decoded.is_partial());
        assert!(decoded.diagnostics.contains(&Diagnostic::UnmatchedField {
            field: "cutoff_date".into()
        }));
    }

    #[test]
    fn test_invalid_digit_keeps_other_fields() {
        let decoder = Decoder::builtin().unwrap();
        let decoded = decoder.decode(&telegram("0C0D003900A002FD170000")).unwrap();

        assert!(decoded.get("total_energy_consumption").is_none());
        assert_eq!(decoded.flags("error_flags").unwrap(), ["OK"]);
        assert!(decoded.diagnostics.iter().any(|d| matches!(
            d,
            Diagnostic::UndecodableField { field, .. } if field == "total_energy_consumption"
        )));
    }

    #[test]
    fn test_unknown_bits_diagnostic() {
        let decoder = Decoder::builtin().unwrap();
        let decoded = decoder.decode(&telegram("02FD170008")).unwrap();
        assert_eq!(decoded.flags("error_flags").unwrap(), ["UNKNOWN_BITS_0800"]);
        assert!(decoded.diagnostics.contains(&Diagnostic::UnknownBits {
            field: "error_flags".into(),
            bits: 0x0800
        }));
    }

    #[test]
    fn test_invalid_calendar_date() {
        // 0x3F day bits 31, month 2
        let decoder = Decoder::builtin().unwrap();
        let decoded = decoder.decode(&telegram("426C3F22")).unwrap();
        assert_eq!(decoded.text("cutoff_date"), Some("2017-02-31"));
        assert!(decoded.diagnostics.contains(&Diagnostic::InvalidDate {
            field: "cutoff_date".into(),
            value: "2017-02-31".into()
        }));
    }

    #[test]
    fn test_invalid_date_time_reports_date_and_time() {
        // minute byte 0xBA: invalid bit set; day 31 of month 2
        let decoder = Decoder::builtin().unwrap();
        let decoded = decoder.decode(&telegram("046DBA0D3F22")).unwrap();
        assert_eq!(decoded.text("device_date_time"), Some("2017-02-31 13:58"));
        assert!(decoded.diagnostics.contains(&Diagnostic::InvalidDate {
            field: "device_date_time".into(),
            value: "2017-02-31 13:58".into()
        }));
        assert!(decoded.diagnostics.contains(&Diagnostic::InvalidTimestamp {
            field: "device_date_time".into(),
            value: "2017-02-31 13:58".into()
        }));
    }

    #[test]
    fn test_bcd_error_flags_are_raw_bits() {
        let decoder = Decoder::builtin().unwrap();
        let decoded = decoder.decode(&telegram("0AFD170001")).unwrap();
        assert_eq!(decoded.flags("error_flags").unwrap(), ["SABOTAGE"]);

        let decoded = decoder.decode(&telegram("0AFD170A00")).unwrap();
        assert_eq!(
            decoded.flags("error_flags").unwrap(),
            ["SUPPLY_SENSOR_INTERRUPTED", "TEMPERATURE_ELECTRONICS_ERROR"]
        );
    }

    #[test]
    fn test_unset_date_is_not_a_diagnostic() {
        let decoder = Decoder::builtin().unwrap();
        let decoded = decoder.decode(&telegram("426CFFFF")).unwrap();
        assert_eq!(decoded.text("cutoff_date"), Some("2127-15-31"));
        assert!(!decoded
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::InvalidDate { .. })));
    }

    #[test]
    fn test_no_matching_driver() {
        let decoder = Decoder::builtin().unwrap();
        let mut bytes = telegram("0C0D00390000");
        bytes[8] = 0x3C;
        assert_eq!(
            decoder.decode(&bytes).unwrap_err(),
            DecodeError::NoMatchingDriver {
                manufacturer: "QDS".into(),
                media: 0x04,
                version: 0x3C
            }
        );
    }

    #[test]
    fn test_forced_driver() {
        let mut registry = DriverRegistry::new();
        registry
            .register(
                DriverDeclaration::new("raw_energy", MeterType::HeatMeter)
                    .detect(MANUFACTURER_QDS, 0x04, 0x01)
                    .field(FieldSpec::numeric(
                        "energy",
                        "energy",
                        PrintProperties::JSON,
                        crate::units::Quantity::Energy,
                        Unit::KWh,
                        FieldMatcher::new().raw_key("0C06"),
                    )),
            )
            .unwrap();
        let decoder = Decoder::new(Arc::new(registry));

        let bytes = telegram("0C0612345600");
        assert!(decoder.decode(&bytes).is_err());
        let decoded = decoder.decode_with_driver(&bytes, "raw_energy").unwrap();
        assert_eq!(decoded.numeric("energy"), Some(563412.0));
        assert_eq!(
            decoder.decode_with_driver(&bytes, "nope").unwrap_err(),
            DecodeError::UnknownDriver("nope".into())
        );
    }

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic::UnknownBits {
            field: "error_flags".into(),
            bits: 0x0400,
        };
        assert_eq!(d.to_string(), "error_flags: unknown bits 0x0400");
        let d = Diagnostic::UnmatchedField {
            field: "cutoff_date".into(),
        };
        assert_eq!(d.to_string(), "cutoff_date: no matching record");
    }
}
