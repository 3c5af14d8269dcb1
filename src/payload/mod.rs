//! The payload module contains the components responsible for reading the
//! descriptor chain of a telegram body and decoding record payloads.

pub mod data_encoding;
pub mod record;
pub mod value;
pub mod vif;

pub use data_encoding::{CompactDate, CompactDateTime};
pub use record::{read_records, DataField, DataRecord, MeasurementType, RecordChain, VariableKind};
pub use value::{decode_value, FieldValue, RawValue, VifScaling};
pub use vif::VifRange;
