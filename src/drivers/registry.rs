//! # Driver Registry
//!
//! Maps detection keys to driver declarations. The registry is filled once
//! at startup and then only read, so decoders share it behind an `Arc`.
//! Reloading after startup swaps in a whole new registry through
//! [`SharedRegistry`] instead of mutating the one in use.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::manufacturer::id_to_manufacturer;
use super::{builtin_drivers, DetectionKey, DriverDeclaration, FieldKind};
use crate::config::DecoderConfig;
use crate::error::DecodeError;

/// What happens when a driver claims a detection key another driver holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Registration fails.
    #[default]
    Reject,
    /// The earlier driver keeps the key; the later one is registered but
    /// shadowed for that key.
    FirstWins,
}

#[derive(Debug, Clone, Default)]
pub struct DriverRegistry {
    policy: DuplicatePolicy,
    drivers: Vec<Arc<DriverDeclaration>>,
    by_key: HashMap<DetectionKey, usize>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Registry holding the compiled-in drivers.
    pub fn builtin() -> Result<Self, DecodeError> {
        Self::from_config(&DecoderConfig::default())
    }

    /// Registry holding the compiled-in drivers with the configured policy
    /// and lookup table overrides applied.
    pub fn from_config(config: &DecoderConfig) -> Result<Self, DecodeError> {
        let mut drivers = builtin_drivers();

        for (driver_name, fields) in &config.lookup_overrides {
            for (field_name, table) in fields {
                let field = drivers
                    .iter_mut()
                    .find(|d| d.name == *driver_name)
                    .and_then(|d| d.fields.iter_mut().find(|f| f.name == *field_name))
                    .filter(|f| matches!(f.kind, FieldKind::Flags(_)))
                    .ok_or_else(|| DecodeError::UnknownLookupTarget {
                        driver: driver_name.clone(),
                        field: field_name.clone(),
                    })?;
                debug!("{}.{}: lookup table replaced by configuration", driver_name, field_name);
                field.kind = FieldKind::Flags(table.clone());
            }
        }

        let mut registry = Self::with_policy(config.duplicate_policy);
        for driver in drivers {
            registry.register(driver)?;
        }
        Ok(registry)
    }

    /// Adds a driver after checking its declaration.
    pub fn register(&mut self, declaration: DriverDeclaration) -> Result<(), DecodeError> {
        declaration.validate()?;

        if self.drivers.iter().any(|d| d.name == declaration.name) {
            return Err(DecodeError::DuplicateDriverName(declaration.name));
        }

        let mut claimed = Vec::new();
        for key in &declaration.detection {
            match self.by_key.get(key) {
                Some(&existing) => {
                    let existing = &self.drivers[existing].name;
                    match self.policy {
                        DuplicatePolicy::Reject => {
                            return Err(DecodeError::DuplicateDetectionKey {
                                key: key.to_string(),
                                driver: declaration.name.clone(),
                                existing: existing.clone(),
                            });
                        }
                        DuplicatePolicy::FirstWins => {
                            warn!(
                                "Detection key {} of driver {} shadowed by {}",
                                key, declaration.name, existing
                            );
                        }
                    }
                }
                None => claimed.push(*key),
            }
        }

        let index = self.drivers.len();
        for key in claimed {
            self.by_key.insert(key, index);
        }
        debug!("Registered driver {}", declaration.name);
        self.drivers.push(Arc::new(declaration));
        Ok(())
    }

    /// Finds the driver for a header. An exact version beats a wildcard.
    pub fn resolve(
        &self,
        manufacturer: u16,
        media: u8,
        version: u8,
    ) -> Result<&Arc<DriverDeclaration>, DecodeError> {
        self.by_key
            .get(&DetectionKey::new(manufacturer, media, version))
            .or_else(|| self.by_key.get(&DetectionKey::any_version(manufacturer, media)))
            .map(|&index| &self.drivers[index])
            .ok_or_else(|| DecodeError::NoMatchingDriver {
                manufacturer: id_to_manufacturer(manufacturer),
                media,
                version,
            })
    }

    pub fn by_name(&self, name: &str) -> Result<&Arc<DriverDeclaration>, DecodeError> {
        self.drivers
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| DecodeError::UnknownDriver(name.to_string()))
    }

    /// Drivers in registration order.
    pub fn drivers(&self) -> impl Iterator<Item = &Arc<DriverDeclaration>> {
        self.drivers.iter()
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}

/// A registry that can be replaced while decoders hold snapshots of the old one.
#[derive(Debug)]
pub struct SharedRegistry {
    inner: RwLock<Arc<DriverRegistry>>,
}

impl SharedRegistry {
    pub fn new(registry: DriverRegistry) -> Self {
        Self {
            inner: RwLock::new(Arc::new(registry)),
        }
    }

    /// The registry currently in use.
    pub fn snapshot(&self) -> Arc<DriverRegistry> {
        let guard = self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    /// Installs `registry` and returns the one it replaced.
    pub fn replace(&self, registry: DriverRegistry) -> Arc<DriverRegistry> {
        let mut guard = self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *guard, Arc::new(registry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::manufacturer::MANUFACTURER_QDS;
    use crate::drivers::qheat_55_usr::DRIVER_NAME;
    use crate::drivers::translate::LookupTable;
    use crate::drivers::MeterType;
    use std::collections::BTreeMap;

    fn other(name: &str) -> DriverDeclaration {
        DriverDeclaration::new(name, MeterType::HeatMeter).detect(MANUFACTURER_QDS, 0x04, 0x46)
    }

    #[test]
    fn test_builtin_resolves_qheat() {
        let registry = DriverRegistry::builtin().unwrap();
        let driver = registry.resolve(MANUFACTURER_QDS, 0x04, 0x46).unwrap();
        assert_eq!(driver.name, DRIVER_NAME);
    }

    #[test]
    fn test_unknown_version_is_no_match() {
        let registry = DriverRegistry::builtin().unwrap();
        assert_eq!(
            registry.resolve(MANUFACTURER_QDS, 0x04, 0x3C).unwrap_err(),
            DecodeError::NoMatchingDriver {
                manufacturer: "QDS".into(),
                media: 0x04,
                version: 0x3C
            }
        );
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut registry = DriverRegistry::builtin().unwrap();
        let err = registry.register(other("copycat")).unwrap_err();
        assert_eq!(
            err,
            DecodeError::DuplicateDetectionKey {
                key: "QDS/0x04/0x46".into(),
                driver: "copycat".into(),
                existing: DRIVER_NAME.into()
            }
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_key_first_wins() {
        let config = DecoderConfig {
            duplicate_policy: DuplicatePolicy::FirstWins,
            ..DecoderConfig::default()
        };
        let mut registry = DriverRegistry::from_config(&config).unwrap();
        registry.register(other("copycat")).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.resolve(MANUFACTURER_QDS, 0x04, 0x46).unwrap().name, DRIVER_NAME);
        assert_eq!(registry.by_name("copycat").unwrap().name, "copycat");
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = DriverRegistry::new();
        registry.register(DriverDeclaration::new("a", MeterType::WaterMeter)).unwrap();
        assert_eq!(
            registry
                .register(DriverDeclaration::new("a", MeterType::GasMeter))
                .unwrap_err(),
            DecodeError::DuplicateDriverName("a".into())
        );
    }

    #[test]
    fn test_exact_version_beats_wildcard() {
        let mut registry = DriverRegistry::new();
        registry
            .register(DriverDeclaration::new("any", MeterType::HeatMeter).detect_any_version(MANUFACTURER_QDS, 0x04))
            .unwrap();
        registry.register(other("exact")).unwrap();

        assert_eq!(registry.resolve(MANUFACTURER_QDS, 0x04, 0x46).unwrap().name, "exact");
        assert_eq!(registry.resolve(MANUFACTURER_QDS, 0x04, 0x3C).unwrap().name, "any");
        assert!(registry.resolve(MANUFACTURER_QDS, 0x07, 0x46).is_err());
    }

    #[test]
    fn test_unknown_driver_name() {
        let registry = DriverRegistry::builtin().unwrap();
        assert_eq!(
            registry.by_name("nope").unwrap_err(),
            DecodeError::UnknownDriver("nope".into())
        );
    }

    #[test]
    fn test_lookup_override() {
        let table = LookupTable::new("ERROR_FLAGS", 0xFFFF, "FINE").flag(0x01, "DRY");
        let mut fields = BTreeMap::new();
        fields.insert("error_flags".to_string(), table.clone());
        let mut config = DecoderConfig::default();
        config.lookup_overrides.insert(DRIVER_NAME.to_string(), fields);

        let registry = DriverRegistry::from_config(&config).unwrap();
        let driver = registry.by_name(DRIVER_NAME).unwrap();
        assert_eq!(
            driver.field_by_name("error_flags").map(|f| &f.kind),
            Some(&FieldKind::Flags(table))
        );
    }

    #[test]
    fn test_lookup_override_unknown_target() {
        let mut fields = BTreeMap::new();
        fields.insert("total_energy_consumption".to_string(), LookupTable::new("X", 1, "OK"));
        let mut config = DecoderConfig::default();
        config.lookup_overrides.insert(DRIVER_NAME.to_string(), fields);

        assert_eq!(
            DriverRegistry::from_config(&config).unwrap_err(),
            DecodeError::UnknownLookupTarget {
                driver: DRIVER_NAME.into(),
                field: "total_energy_consumption".into()
            }
        );
    }

    #[test]
    fn test_shared_registry_swap() {
        let shared = SharedRegistry::new(DriverRegistry::builtin().unwrap());
        let before = shared.snapshot();
        let old = shared.replace(DriverRegistry::new());

        assert_eq!(before.len(), 1);
        assert!(Arc::ptr_eq(&before, &old));
        assert!(shared.snapshot().is_empty());
        // Held snapshots keep working
        assert!(before.resolve(MANUFACTURER_QDS, 0x04, 0x46).is_ok());
    }
}
