//! # Bit-Flag Translator
//!
//! Turns the integer payload of a status or error field into flag names from
//! a driver's lookup table. Tables are plain data and can be replaced from
//! configuration, since vendors rarely document every bit.

use log::warn;
use serde::{Deserialize, Serialize};

/// One named bit pattern of a lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagRule {
    pub mask: u64,
    pub name: String,
}

/// Ordered bit patterns of a flag field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupTable {
    pub name: String,
    /// All bits the field may carry. Every rule lies inside it; set bits no
    /// firing rule covers are reported as unknown whether or not the mask
    /// includes them.
    pub mask: u64,
    /// Emitted when no bit is set.
    pub no_error: String,
    pub rules: Vec<FlagRule>,
}

impl LookupTable {
    pub fn new(name: &str, mask: u64, no_error: &str) -> Self {
        Self {
            name: name.to_string(),
            mask,
            no_error: no_error.to_string(),
            rules: Vec::new(),
        }
    }

    /// The first rule that is empty or sets bits outside `mask`.
    pub fn rule_outside_mask(&self) -> Option<&FlagRule> {
        self.rules
            .iter()
            .find(|rule| rule.mask == 0 || rule.mask & !self.mask != 0)
    }

    pub fn flag(mut self, mask: u64, name: &str) -> Self {
        self.rules.push(FlagRule {
            mask,
            name: name.to_string(),
        });
        self
    }
}

/// Flag names for a bit pattern, plus the bits no rule accounted for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Translation {
    pub flags: Vec<String>,
    pub unknown_bits: u64,
}

/// Translates `bits` using `table`.
///
/// Rules are tried in table order and a rule fires only when all of its bits
/// are set. Set bits no firing rule covers are reported as one
/// `UNKNOWN_BITS_xxxx` flag after the named ones.
pub fn translate(bits: u64, table: &LookupTable) -> Translation {
    if bits == 0 {
        return Translation {
            flags: vec![table.no_error.clone()],
            unknown_bits: 0,
        };
    }

    let mut flags = Vec::new();
    let mut covered = 0u64;
    for rule in &table.rules {
        if rule.mask != 0 && bits & rule.mask == rule.mask {
            flags.push(rule.name.clone());
            covered |= rule.mask;
        }
    }

    let unknown_bits = bits & !covered;
    if unknown_bits != 0 {
        warn!(
            "{}: bits 0x{:04X} not covered by lookup table (mask 0x{:04X})",
            table.name, unknown_bits, table.mask
        );
        flags.push(format!("UNKNOWN_BITS_{:04X}", unknown_bits));
    }

    Translation {
        flags,
        unknown_bits,
    }
}
