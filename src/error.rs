//! # Decode Error Handling
//!
//! This module defines the DecodeError enum, which represents the different error
//! types that can occur while resolving drivers and decoding telegram fields.

use crate::units::Unit;
use thiserror::Error;

/// Represents the different error types that can occur in the decoding engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// The telegram is too short to hold its header.
    #[error("Telegram header too short: need {needed} bytes, got {len}")]
    HeaderTooShort { len: usize, needed: usize },

    /// The CI field selects an application layer this engine does not read.
    #[error("Unsupported CI field: 0x{0:02X}")]
    UnsupportedCi(u8),

    /// The payload is encrypted; decryption happens outside this engine.
    #[error("Encrypted payload (security mode {mode})")]
    EncryptedPayload { mode: u8 },

    /// No registered driver claims the detection tuple.
    #[error("No matching driver for manufacturer {manufacturer} media 0x{media:02X} version 0x{version:02X}")]
    NoMatchingDriver {
        manufacturer: String,
        media: u8,
        version: u8,
    },

    /// A driver was requested by a name nobody registered.
    #[error("Unknown driver: {0}")]
    UnknownDriver(String),

    /// Two drivers claim an identical detection tuple.
    #[error("Duplicate detection key {key} for driver {driver} (already claimed by {existing})")]
    DuplicateDetectionKey {
        key: String,
        driver: String,
        existing: String,
    },

    /// A driver with this name is already registered.
    #[error("Driver {0} is already registered")]
    DuplicateDriverName(String),

    /// Two field specs of one driver share an output name.
    #[error("Duplicate field name {field} in driver {driver}")]
    DuplicateFieldName { driver: String, field: String },

    /// A raw descriptor key is not valid hex.
    #[error("Invalid DIF/VIF key {key:?} for field {field} in driver {driver}")]
    InvalidDifVifKey {
        driver: String,
        field: String,
        key: String,
    },

    /// A lookup table rule is empty or sets bits outside the table mask.
    #[error("Flag {flag} of field {field} in driver {driver} lies outside the table mask")]
    FlagOutsideMask {
        driver: String,
        field: String,
        flag: String,
    },

    /// A lookup table override names a driver or field that has no flag table.
    #[error("No bit-flag field {field} in driver {driver}")]
    UnknownLookupTarget { driver: String, field: String },

    /// A continuation flag or payload length demands more bytes than remain.
    #[error("Truncated descriptor chain at offset {offset}: need {needed} bytes, {available} left")]
    TruncatedChain {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// The DIF data field nibble is outside the recognized set.
    #[error("Unknown data field type in DIF 0x{dif:02X} at offset {offset}")]
    UnknownDataFieldType { dif: u8, offset: usize },

    /// The LVAR byte of a variable length record is reserved.
    #[error("Reserved LVAR 0x{lvar:02X} at offset {offset}")]
    ReservedLvar { lvar: u8, offset: usize },

    /// More than ten DIFE or VIFE bytes.
    #[error("Extension chain too long at offset {offset}")]
    ExtensionChainTooLong { offset: usize },

    /// A packed-decimal nibble is above 9.
    #[error("Invalid BCD digit in byte 0x{byte:02X}")]
    InvalidDigit { byte: u8 },

    /// Implied and requested units measure different quantities.
    #[error("Incompatible units: cannot convert {from} to {to}")]
    IncompatibleUnit { from: Unit, to: Unit },

    /// A value type without an implied unit was asked for automatic scaling.
    #[error("VIF 0x{vif:02X} carries no unit")]
    NoImpliedUnit { vif: u8 },

    /// The record's data field cannot produce the requested kind of value.
    #[error("Cannot decode {expected} from DIF 0x{dif:02X}")]
    UnexpectedDataField { expected: &'static str, dif: u8 },

    /// The payload has a width the decoder does not handle.
    #[error("Invalid payload length: {0}")]
    InvalidPayloadLength(usize),
}

impl DecodeError {
    /// Errors that mean the telegram cannot be attributed to a driver at all.
    pub fn is_header_fatal(&self) -> bool {
        matches!(
            self,
            DecodeError::HeaderTooShort { .. }
                | DecodeError::UnsupportedCi(_)
                | DecodeError::EncryptedPayload { .. }
                | DecodeError::NoMatchingDriver { .. }
                | DecodeError::UnknownDriver(_)
        )
    }

    /// Errors produced by the descriptor chain reader.
    pub fn is_chain_error(&self) -> bool {
        matches!(
            self,
            DecodeError::TruncatedChain { .. }
                | DecodeError::UnknownDataFieldType { .. }
                | DecodeError::ReservedLvar { .. }
                | DecodeError::ExtensionChainTooLong { .. }
        )
    }
}
