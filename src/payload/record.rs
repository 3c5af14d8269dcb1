//! # Descriptor Chain Reader
//!
//! Splits the application body of a telegram into data records. Each record
//! is a DIF with up to ten DIFEs, a VIF with up to ten VIFEs (or a plain-text
//! VIF), and a payload whose length follows from the DIF data field nibble.
//!
//! Reading is a single forward pass. When the chain is malformed the reader
//! stops and returns the records read so far together with the error, so
//! that fields earlier in the telegram still decode.

use crate::constants::*;
use crate::error::DecodeError;
use crate::payload::vif::{self, VifRange};
use crate::units::ImpliedUnit;
use log::{debug, warn};
use nom::{bytes::complete::take, number::complete::be_u8, IResult};
use serde::{Deserialize, Serialize};

/// When a value was measured, from DIF bits 4-5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementType {
    Instantaneous,
    Maximum,
    Minimum,
    AtError,
}

impl MeasurementType {
    pub fn from_dif(dif: u8) -> Self {
        match dif & MBUS_DATA_RECORD_DIF_MASK_FUNCTION {
            0x00 => MeasurementType::Instantaneous,
            0x10 => MeasurementType::Maximum,
            0x20 => MeasurementType::Minimum,
            _ => MeasurementType::AtError,
        }
    }
}

/// How the payload of a variable length record is encoded, from its LVAR byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Text,
    PositiveBcd,
    NegativeBcd,
    Binary,
    Opaque,
}

/// Encoding of a record payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataField {
    NoData,
    /// Little-endian integer of the given width.
    Binary(usize),
    Real32,
    /// Packed decimal of the given width.
    Bcd(usize),
    Variable(VariableKind),
}

/// Payload length for a fixed-size data field nibble, `None` for LVAR records.
fn fixed_data_length(dif: u8, offset: usize) -> Result<Option<usize>, DecodeError> {
    let length = match dif & MBUS_DATA_RECORD_DIF_MASK_DATA {
        0x0 => 0,
        0x1 => 1,
        0x2 => 2,
        0x3 => 3,
        0x4 => 4,
        0x5 => 4,
        0x6 => 6,
        0x7 => 8,
        0x9 => 1,
        0xA => 2,
        0xB => 3,
        0xC => 4,
        0xD => return Ok(None),
        0xE => 6,
        _ => return Err(DecodeError::UnknownDataFieldType { dif, offset }),
    };
    Ok(Some(length))
}

/// Payload length and encoding announced by an LVAR byte.
fn variable_data_length(lvar: u8, offset: usize) -> Result<(usize, VariableKind), DecodeError> {
    match lvar {
        0x00..=0xBF => Ok((usize::from(lvar), VariableKind::Text)),
        0xC0..=0xC9 => Ok((usize::from(lvar - 0xC0), VariableKind::PositiveBcd)),
        0xD0..=0xD9 => Ok((usize::from(lvar - 0xD0), VariableKind::NegativeBcd)),
        0xE0..=0xEF => Ok((usize::from(lvar - 0xE0), VariableKind::Binary)),
        0xF0..=0xF4 => Ok((4 * usize::from(lvar - 0xEC), VariableKind::Opaque)),
        0xF5..=0xFA => Ok((8 * usize::from(lvar - 0xF2), VariableKind::Opaque)),
        _ => Err(DecodeError::ReservedLvar { lvar, offset }),
    }
}

/// One data record of the descriptor chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRecord {
    /// Offset of the DIF within the body.
    pub offset: usize,
    pub dif: u8,
    pub difes: Vec<u8>,
    pub vif: u8,
    pub vifes: Vec<u8>,
    /// Unit text of a plain-text VIF, in reading order.
    pub custom_vif: Option<String>,
    pub lvar: Option<u8>,
    pub data: Vec<u8>,
}

impl DataRecord {
    /// Builds a payload-less record from the bytes of a raw descriptor key
    /// (DIF, DIFEs, VIF, VIFEs). `None` unless the bytes form exactly one
    /// well-formed descriptor.
    pub fn from_raw_key(bytes: &[u8]) -> Option<DataRecord> {
        let (rest, (dif, difes)) = extension_chain(bytes).ok()?;
        fixed_data_length(dif, 0).ok()?;
        let (rest, (vif, vifes)) = extension_chain(rest).ok()?;
        if !rest.is_empty() || difes.len() > MBUS_MAX_EXTENSIONS || vifes.len() > MBUS_MAX_EXTENSIONS {
            return None;
        }
        Some(DataRecord {
            offset: 0,
            dif,
            difes,
            vif,
            vifes,
            custom_vif: None,
            lvar: None,
            data: Vec::new(),
        })
    }

    /// Uppercase hex of DIF, DIFEs, VIF and VIFEs.
    pub fn raw_key(&self) -> String {
        let mut bytes = Vec::with_capacity(2 + self.difes.len() + self.vifes.len());
        bytes.push(self.dif);
        bytes.extend_from_slice(&self.difes);
        bytes.push(self.vif);
        bytes.extend_from_slice(&self.vifes);
        hex::encode_upper(bytes)
    }

    pub fn storage_nr(&self) -> u64 {
        let low = u64::from((self.dif & MBUS_DATA_RECORD_DIF_MASK_STORAGE_NO) >> 6);
        self.difes.iter().enumerate().fold(low, |acc, (i, dife)| {
            acc | u64::from(dife & MBUS_DATA_RECORD_DIFE_MASK_STORAGE_NO) << (1 + 4 * i)
        })
    }

    pub fn tariff(&self) -> u32 {
        self.difes.iter().enumerate().fold(0, |acc, (i, dife)| {
            acc | u32::from((dife & MBUS_DATA_RECORD_DIFE_MASK_TARIFF) >> 4) << (2 * i)
        })
    }

    pub fn subunit(&self) -> u32 {
        self.difes.iter().enumerate().fold(0, |acc, (i, dife)| {
            acc | u32::from((dife & MBUS_DATA_RECORD_DIFE_MASK_DEVICE) >> 6) << i
        })
    }

    pub fn measurement_type(&self) -> MeasurementType {
        MeasurementType::from_dif(self.dif)
    }

    pub fn data_field(&self) -> DataField {
        match self.dif & MBUS_DATA_RECORD_DIF_MASK_DATA {
            0x0 => DataField::NoData,
            n @ 0x1..=0x4 => DataField::Binary(usize::from(n)),
            0x5 => DataField::Real32,
            0x6 => DataField::Binary(6),
            0x7 => DataField::Binary(8),
            n @ 0x9..=0xC => DataField::Bcd(usize::from(n - 8)),
            0xE => DataField::Bcd(6),
            _ => {
                let kind = self
                    .lvar
                    .and_then(|lvar| variable_data_length(lvar, self.offset).ok())
                    .map(|(_, kind)| kind)
                    .unwrap_or(VariableKind::Opaque);
                DataField::Variable(kind)
            }
        }
    }

    pub fn vif_range(&self) -> Option<VifRange> {
        vif::classify(self.vif, &self.vifes)
    }

    pub fn implied_unit(&self) -> Option<ImpliedUnit> {
        vif::implied_unit(self.vif, &self.vifes)
    }
}

/// Result of reading a body: the records read, manufacturer specific trailing
/// data if present, and the error that stopped reading early, if any.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordChain {
    pub records: Vec<DataRecord>,
    pub manufacturer_data: Option<Vec<u8>>,
    pub error: Option<DecodeError>,
}

enum Step<'a> {
    Record(DataRecord),
    Filler,
    ManufacturerData(&'a [u8]),
}

/// Reads every data record in `body`.
pub fn read_records(body: &[u8]) -> RecordChain {
    let mut chain = RecordChain::default();
    let mut input = body;

    while !input.is_empty() {
        match read_record(body, input) {
            Ok((rest, Step::Record(record))) => {
                debug!(
                    "record at {}: key {} data {}",
                    record.offset,
                    record.raw_key(),
                    hex::encode_upper(&record.data)
                );
                chain.records.push(record);
                input = rest;
            }
            Ok((rest, Step::Filler)) => input = rest,
            Ok((_, Step::ManufacturerData(data))) => {
                chain.manufacturer_data = Some(data.to_vec());
                break;
            }
            Err(error) => {
                warn!("descriptor chain stopped after {} records: {}", chain.records.len(), error);
                chain.error = Some(error);
                break;
            }
        }
    }

    chain
}

fn offset_of(body: &[u8], input: &[u8]) -> usize {
    body.len() - input.len()
}

fn truncated(body: &[u8], input: &[u8], needed: usize) -> DecodeError {
    DecodeError::TruncatedChain {
        offset: offset_of(body, input),
        needed,
        available: input.len(),
    }
}

fn byte<'a>(body: &[u8], input: &'a [u8]) -> Result<(&'a [u8], u8), DecodeError> {
    be_u8::<&[u8], nom::error::Error<&[u8]>>(input).map_err(|_| truncated(body, input, 1))
}

fn bytes<'a>(body: &[u8], input: &'a [u8], count: usize) -> Result<(&'a [u8], &'a [u8]), DecodeError> {
    take::<usize, &[u8], nom::error::Error<&[u8]>>(count)(input)
        .map_err(|_| truncated(body, input, count))
}

/// A head byte followed by extension bytes for as long as the extension bit is set.
fn extension_chain(input: &[u8]) -> IResult<&[u8], (u8, Vec<u8>)> {
    let (mut input, head) = be_u8(input)?;
    let mut extensions = Vec::new();
    let mut more = head & MBUS_DIB_DIF_EXTENSION_BIT != 0;
    while more {
        let (rest, ext) = be_u8(input)?;
        extensions.push(ext);
        more = ext & MBUS_DIB_DIF_EXTENSION_BIT != 0;
        input = rest;
        if extensions.len() > MBUS_MAX_EXTENSIONS {
            break;
        }
    }
    Ok((input, (head, extensions)))
}

fn read_extensions<'a>(
    body: &[u8],
    mut input: &'a [u8],
    head: u8,
) -> Result<(&'a [u8], Vec<u8>), DecodeError> {
    let mut extensions = Vec::new();
    let mut more = head & MBUS_DIB_DIF_EXTENSION_BIT != 0;
    while more {
        if extensions.len() == MBUS_MAX_EXTENSIONS {
            return Err(DecodeError::ExtensionChainTooLong {
                offset: offset_of(body, input),
            });
        }
        let (rest, ext) = byte(body, input)?;
        extensions.push(ext);
        more = ext & MBUS_DIB_DIF_EXTENSION_BIT != 0;
        input = rest;
    }
    Ok((input, extensions))
}

fn read_record<'a>(body: &[u8], input: &'a [u8]) -> Result<(&'a [u8], Step<'a>), DecodeError> {
    let offset = offset_of(body, input);
    let (input, dif) = byte(body, input)?;

    if dif == MBUS_DIB_DIF_IDLE_FILLER {
        return Ok((input, Step::Filler));
    }
    if dif == MBUS_DIB_DIF_MANUFACTURER_SPECIFIC || dif == MBUS_DIB_DIF_MORE_RECORDS_FOLLOW {
        return Ok((&input[input.len()..], Step::ManufacturerData(input)));
    }

    let fixed_length = fixed_data_length(dif, offset)?;
    let (input, difes) = read_extensions(body, input, dif)?;

    let (input, vif) = byte(body, input)?;
    let (input, custom_vif) = if vif & MBUS_DIB_VIF_WITHOUT_EXTENSION == MBUS_DIB_VIF_PLAIN_TEXT {
        let (input, len) = byte(body, input)?;
        let (input, text) = bytes(body, input, usize::from(len))?;
        (input, Some(crate::payload::data_encoding::decode_text(text)))
    } else {
        (input, None)
    };
    let (input, vifes) = read_extensions(body, input, vif)?;

    let (input, lvar, length) = match fixed_length {
        Some(length) => (input, None, length),
        None => {
            let lvar_offset = offset_of(body, input);
            let (input, lvar) = byte(body, input)?;
            let (length, _) = variable_data_length(lvar, lvar_offset)?;
            (input, Some(lvar), length)
        }
    };
    let (input, data) = bytes(body, input, length)?;

    Ok((
        input,
        Step::Record(DataRecord {
            offset,
            dif,
            difes,
            vif,
            vifes,
            custom_vif,
            lvar,
            data: data.to_vec(),
        }),
    ))
}
