//! The engine's driver table.
//!
//! At most one registration exists per name, and at most one driver is the
//! default: the most recent registration made with `make_default = true`.

use std::sync::Arc;

use crate::storage::StorageDriver;

/// One driver bound into the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VfsRegistration {
    pub name: String,
    pub kind: &'static str,
    pub is_default: bool,
}

/// Driver table owned by one engine instance.
#[derive(Debug, Default)]
pub struct DriverTable {
    drivers: Vec<Arc<dyn StorageDriver>>,
    default: Option<String>,
}

impl DriverTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `driver` under its name, replacing any previous driver of that name.
    pub fn register(&mut self, driver: Arc<dyn StorageDriver>, make_default: bool) {
        let name = driver.name().to_string();
        match self.drivers.iter().position(|d| d.name() == name) {
            Some(i) => self.drivers[i] = driver,
            None => self.drivers.push(driver),
        }
        if make_default {
            self.default = Some(name);
        }
    }

    /// Look up a driver by name.
    pub fn find(&self, name: &str) -> Option<Arc<dyn StorageDriver>> {
        self.drivers.iter().find(|d| d.name() == name).cloned()
    }

    /// The current default driver, if any driver was made default.
    pub fn default_driver(&self) -> Option<Arc<dyn StorageDriver>> {
        self.default.as_deref().and_then(|name| self.find(name))
    }

    /// Snapshot of every registration, in registration order.
    pub fn registrations(&self) -> Vec<VfsRegistration> {
        self.drivers
            .iter()
            .map(|d| VfsRegistration {
                name: d.name().to_string(),
                kind: d.kind(),
                is_default: self.default.as_deref() == Some(d.name()),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}
