//! Named driver configurations.
//!
//! Maps a configuration name to the factory that builds its driver. The
//! table is built at startup and handed to contexts explicitly; there is no
//! lookup of driver implementations by path or class name.

use std::sync::Arc;
use std::time::Duration;

use crate::storage::directory::DirectoryDriverFactory;
use crate::storage::document::DocumentStoreDriverFactory;
use crate::storage::memory::MemoryDriverFactory;
use crate::storage::{DriverFactory, DriverOptions};

/// Vfs name used when neither the caller nor the configuration names one.
pub const DEFAULT_VFS_NAME: &str = "demo";

/// One named driver configuration.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub name: String,
    /// `None` keeps the engine's built-in driver.
    pub factory: Option<Arc<dyn DriverFactory>>,
    /// Vfs name preferred by this configuration.
    pub vfs_name: Option<String>,
    pub options: DriverOptions,
}

impl DriverConfig {
    /// Configuration that registers no driver.
    pub fn builtin(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            factory: None,
            vfs_name: None,
            options: DriverOptions::default(),
        }
    }

    /// Configuration building its driver with `factory`.
    pub fn with_factory(name: impl Into<String>, factory: Arc<dyn DriverFactory>) -> Self {
        Self {
            name: name.into(),
            factory: Some(factory),
            vfs_name: None,
            options: DriverOptions::default(),
        }
    }

    #[must_use]
    pub fn vfs_name(mut self, vfs_name: impl Into<String>) -> Self {
        self.vfs_name = Some(vfs_name.into());
        self
    }

    #[must_use]
    pub fn options(mut self, options: DriverOptions) -> Self {
        self.options = options;
        self
    }

    /// Effective vfs name: explicit request, then configuration, then default.
    pub fn effective_vfs_name(&self, requested: Option<&str>) -> String {
        requested
            .or(self.vfs_name.as_deref())
            .unwrap_or(DEFAULT_VFS_NAME)
            .to_string()
    }
}

/// Ordered table of driver configurations. The first one is the default.
#[derive(Debug, Clone)]
pub struct DriverConfigRegistry {
    configs: Vec<DriverConfig>,
}

impl DriverConfigRegistry {
    pub fn new(configs: Vec<DriverConfig>) -> Self {
        Self { configs }
    }

    /// Look up a configuration, falling back to the default when `name` is `None`.
    pub fn resolve(&self, name: Option<&str>) -> Option<&DriverConfig> {
        match name {
            Some(name) => self.configs.iter().find(|c| c.name == name),
            None => self.configs.first(),
        }
    }

    /// Names of all configurations, default first.
    pub fn names(&self) -> Vec<String> {
        self.configs.iter().map(|c| c.name.clone()).collect()
    }
}

impl Default for DriverConfigRegistry {
    fn default() -> Self {
        let shared = DriverOptions {
            busy_timeout: Some(Duration::from_secs(5)),
            exclusive_locking: false,
        };

        Self::new(vec![
            DriverConfig::builtin("default"),
            DriverConfig::with_factory("memory", Arc::new(MemoryDriverFactory)),
            DriverConfig::with_factory("directory", Arc::new(DirectoryDriverFactory))
                .options(shared.clone()),
            DriverConfig::with_factory("document", Arc::new(DocumentStoreDriverFactory))
                .vfs_name("demo-document")
                .options(shared),
        ])
    }
}
