//! SQLite engine wrapper.
//!
//! One [`Engine`] exists per execution context. It owns the driver table,
//! knows which build it is running, and opens databases through the
//! current default driver. With no driver made default, databases open
//! through the built-in in-memory driver.

pub mod builds;
pub mod functions;
pub mod table;

pub use builds::{BuildRegistry, EngineBuild};
pub use table::{DriverTable, VfsRegistration};

use rusqlite::{ffi, Connection};
use std::sync::Arc;

use crate::storage::cipher::{cipher_supported, CipherDriver};
use crate::storage::memory::MemoryDriver;
use crate::storage::{DriverError, DriverOptions, StorageDriver};

/// Name of the built-in driver used when nothing else is default.
pub const BUILTIN_DRIVER: &str = "builtin";

/// Status returned by [`Engine::create_cipher_layer`] on success.
pub const CIPHER_OK: i32 = ffi::SQLITE_OK;

/// The engine of one execution context.
#[derive(Debug)]
pub struct Engine {
    build: EngineBuild,
    cipher_available: bool,
    builtin: Arc<dyn StorageDriver>,
    drivers: DriverTable,
}

impl Engine {
    /// Create an engine for `build`, probing the linked library for cipher support.
    pub fn new(build: EngineBuild) -> Self {
        let available = build.cipher && cipher_supported();
        Self::with_cipher_support(build, available)
    }

    /// Create an engine with an explicit cipher capability.
    pub fn with_cipher_support(build: EngineBuild, cipher_available: bool) -> Self {
        Self {
            build,
            cipher_available,
            builtin: Arc::new(MemoryDriver::new(BUILTIN_DRIVER, DriverOptions::default())),
            drivers: DriverTable::new(),
        }
    }

    /// The driver table.
    pub fn drivers(&self) -> &DriverTable {
        &self.drivers
    }

    /// Bind a driver into the driver table.
    pub fn register_driver(&mut self, driver: Arc<dyn StorageDriver>, make_default: bool) {
        tracing::debug!(vfs = %driver.name(), kind = driver.kind(), make_default, "Registering driver");
        self.drivers.register(driver, make_default);
    }

    /// Create a cipher driver wrapping the driver registered as `vfs_name`.
    ///
    /// Returns `0` on success. On failure nothing is registered, so there is no
    /// half-built cipher state to tear down.
    pub fn create_cipher_layer(&mut self, vfs_name: &str, make_default: bool) -> i32 {
        if !self.cipher_available {
            return ffi::SQLITE_ERROR;
        }
        let Some(base) = self.drivers.find(vfs_name) else {
            return ffi::SQLITE_NOTFOUND;
        };

        let cipher: Arc<dyn StorageDriver> = Arc::new(CipherDriver::wrap(base));
        self.register_driver(cipher, make_default);
        CIPHER_OK
    }

    /// Driver that database opens currently route through.
    pub fn default_driver(&self) -> Arc<dyn StorageDriver> {
        self.drivers
            .default_driver()
            .unwrap_or_else(|| self.builtin.clone())
    }

    /// Open `db_name` through the default driver.
    pub fn open(&self, db_name: &str) -> Result<Connection, DriverError> {
        let driver = self.default_driver();
        tracing::info!(db = db_name, vfs = %driver.name(), build = %self.build.name, "Opening database");
        driver.open(db_name)
    }
}
