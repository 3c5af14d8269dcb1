//! # mbus-fields - Driver-Based Field Decoding for wM-Bus Telegrams
//!
//! The mbus-fields crate turns raw wireless M-Bus telegrams into named,
//! unit-scaled values. Each supported meter model is described by a driver
//! declaration: the detection tuple (manufacturer, media, version) that
//! picks it and the field specs that say which data record feeds which
//! output.
//!
//! ## Features
//!
//! - Parse the link layer and transport header of a telegram (CRCs removed)
//! - Resolve the driver for a telegram from an explicit registry
//! - Read the DIF/DIFE/VIF/VIFE descriptor chain of every data record
//! - Match records by exact raw key or by structured criteria
//! - Decode packed decimal, binary, real, date, date-time and text payloads
//! - Scale values from the descriptor's implied unit to the requested unit
//! - Translate status bit fields into flag names from configurable tables
//! - Report partial results with diagnostics instead of failing on bad input
//!
//! ## Usage
//!
//! ```rust
//! use mbus_fields::{Decoder, FieldValue};
//!
//! let telegram = hex::decode(
//!     "41449344796550674637727965506793444604dc0000200c0d000000004c0d00000000\
//!      426cffffcc080d00000000c2086cdf2802fd170000326cffff046d3a0ddb29",
//! )
//! .unwrap();
//!
//! let decoder = Decoder::builtin().unwrap();
//! let decoded = decoder.decode(&telegram).unwrap();
//!
//! assert_eq!(decoded.text("device_date_time"), Some("2022-09-27 13:58"));
//! assert_eq!(decoded.get("error_flags"), Some(&FieldValue::Flags(vec!["OK".into()])));
//! ```

pub mod config;
pub mod constants;
pub mod decoder;
pub mod drivers;
pub mod error;
pub mod logging;
pub mod payload;
pub mod units;
pub mod util;
pub mod wmbus;

pub use crate::error::DecodeError;
pub use crate::logging::{init_logger, log_info};

pub use config::{ConfigError, DecoderConfig};
pub use decoder::{DecodedField, DecodedTelegram, Decoder, Diagnostic};
pub use drivers::{
    DetectionKey, DriverDeclaration, DriverRegistry, DuplicatePolicy, FieldKind, FieldSpec,
    LinkModes, MeterType, PrintProperties, SharedRegistry, VersionMatch,
};
pub use drivers::matcher::FieldMatcher;
pub use drivers::translate::{translate, LookupTable, Translation};
pub use payload::{read_records, DataRecord, FieldValue, MeasurementType, RecordChain, VifRange, VifScaling};
pub use units::{Quantity, Unit};
pub use wmbus::{parse_telegram, TelegramHeader};
