//! # Decoder Configuration
//!
//! Runtime settings loaded from JSON: how the registry treats duplicate
//! detection keys, replacement lookup tables for flag fields, and which
//! header the registry resolves against first.
//!
//! ```json
//! {
//!   "duplicate_policy": "first_wins",
//!   "prefer_transport_header": true,
//!   "lookup_overrides": {
//!     "qheat_55_usr": {
//!       "error_flags": {
//!         "name": "ERROR_FLAGS", "mask": 65535, "no_error": "OK",
//!         "rules": [{ "mask": 1, "name": "NO_FLOW" }]
//!       }
//!     }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::drivers::registry::DuplicatePolicy;
use crate::drivers::translate::LookupTable;
use crate::error::DecodeError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration rejected: {0}")]
    Decode(#[from] DecodeError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub duplicate_policy: DuplicatePolicy,
    /// driver name -> field name -> table replacing the declared one
    pub lookup_overrides: BTreeMap<String, BTreeMap<String, LookupTable>>,
    /// Resolve with the long transport header's address before the link layer's.
    pub prefer_transport_header: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::default(),
            lookup_overrides: BTreeMap::new(),
            prefer_transport_header: true,
        }
    }
}

impl DecoderConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
