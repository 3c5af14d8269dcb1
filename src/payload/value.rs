//! # Value Decoder
//!
//! Turns the payload of a matched record into a typed value. The encoding is
//! chosen from the DIF data field; dates and date-times are recognised from
//! the VIF range when the payload width fits.

use crate::error::DecodeError;
use crate::payload::data_encoding::{
    decode_bcd, decode_date, decode_date_time, decode_int, decode_real32, decode_text,
    decode_uint, CompactDate, CompactDateTime,
};
use crate::payload::record::{DataField, DataRecord, VariableKind};
use crate::payload::vif::VifRange;
use crate::units::{self, Unit};
use serde::Serialize;
use std::fmt;

/// A record payload decoded according to its descriptors.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Integer(i64),
    Real(f64),
    Date(CompactDate),
    DateTime(CompactDateTime),
    Text(String),
    /// Payloads without a numeric reading (opaque LVAR data).
    Bytes(Vec<u8>),
}

impl RawValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Integer(v) => Some(*v as f64),
            RawValue::Real(v) => Some(*v),
            _ => None,
        }
    }

    /// Text rendering used by text fields.
    pub fn to_text(&self) -> String {
        match self {
            RawValue::Integer(v) => v.to_string(),
            RawValue::Real(v) => v.to_string(),
            RawValue::Date(d) => d.to_string(),
            RawValue::DateTime(dt) => dt.to_string(),
            RawValue::Text(s) => s.clone(),
            RawValue::Bytes(b) => hex::encode_upper(b),
        }
    }
}

/// How a numeric field applies the unit its VIF implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum VifScaling {
    /// Apply the implied exponent and convert to the requested unit.
    #[default]
    Auto,
    /// Publish the raw value as is.
    None,
}

/// The decoded, unit-scaled value of one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Numeric { value: f64, unit: Unit },
    Text(String),
    Flags(Vec<String>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Numeric { value, unit } => write!(f, "{} {}", value, unit),
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::Flags(flags) => f.write_str(&flags.join(" ")),
        }
    }
}

/// Decodes the payload of `record`.
pub fn decode_value(record: &DataRecord) -> Result<RawValue, DecodeError> {
    let data = record.data.as_slice();
    let range = record.vif_range();

    match record.data_field() {
        DataField::NoData => Err(DecodeError::UnexpectedDataField {
            expected: "a value",
            dif: record.dif,
        }),
        DataField::Binary(2) if range == Some(VifRange::Date) => decode_date(data).map(RawValue::Date),
        DataField::Binary(4) | DataField::Binary(6) if range == Some(VifRange::DateTime) => {
            decode_date_time(data).map(RawValue::DateTime)
        }
        DataField::Binary(_) => decode_int(data).map(RawValue::Integer),
        DataField::Real32 => decode_real32(data).map(|v| RawValue::Real(f64::from(v))),
        DataField::Bcd(_) => decode_bcd(data).map(|v| RawValue::Integer(v as i64)),
        DataField::Variable(VariableKind::Text) => Ok(RawValue::Text(decode_text(data))),
        DataField::Variable(VariableKind::PositiveBcd) => {
            decode_bcd(data).map(|v| RawValue::Integer(v as i64))
        }
        DataField::Variable(VariableKind::NegativeBcd) => {
            decode_bcd(data).map(|v| RawValue::Integer(-(v as i64)))
        }
        DataField::Variable(VariableKind::Binary) => match decode_int(data) {
            Ok(v) => Ok(RawValue::Integer(v)),
            Err(_) => Ok(RawValue::Bytes(data.to_vec())),
        },
        DataField::Variable(VariableKind::Opaque) => Ok(RawValue::Bytes(data.to_vec())),
    }
}

/// Decodes a numeric field and scales it into `unit`.
pub fn decode_numeric(
    record: &DataRecord,
    unit: Unit,
    scaling: VifScaling,
) -> Result<f64, DecodeError> {
    let raw = decode_value(record)?
        .as_f64()
        .ok_or(DecodeError::UnexpectedDataField {
            expected: "a number",
            dif: record.dif,
        })?;

    match scaling {
        VifScaling::None => Ok(raw),
        VifScaling::Auto => {
            let implied = record
                .implied_unit()
                .ok_or(DecodeError::NoImpliedUnit { vif: record.vif })?;
            units::scale(raw, implied, unit)
        }
    }
}

/// Reads the payload of a flag field as an unsigned bit pattern.
pub fn decode_bits(record: &DataRecord) -> Result<u64, DecodeError> {
    match record.data_field() {
        DataField::Binary(_) | DataField::Bcd(_) => decode_uint(&record.data),
        _ => Err(DecodeError::UnexpectedDataField {
            expected: "a bit field",
            dif: record.dif,
        }),
    }
}
