//! Storage driver contract.
//!
//! A driver decides where and how the engine's database files live. The
//! engine never touches storage directly; it asks its default driver to
//! open a connection. Drivers are created asynchronously by a
//! [`DriverFactory`], bound to a vfs name and a [`StorageNamespace`].

use futures::future::BoxFuture;
use rusqlite::Connection;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::namespace::{StorageError, StorageNamespace};
use crate::marshal::{Marshal, PropertyValue};
use crate::query::extended_code;

/// Error type for driver creation and database opens.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Driver '{driver}' failed to open '{db_name}': {source}")]
    Open {
        driver: String,
        db_name: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Driver '{driver}' storage error: {source}")]
    Storage {
        driver: String,
        #[source]
        source: StorageError,
    },
}

impl Marshal for DriverError {
    fn error_name(&self) -> &'static str {
        "DriverError"
    }

    fn properties(&self) -> Vec<(String, PropertyValue)> {
        match self {
            Self::Open {
                driver,
                db_name,
                source,
            } => {
                let mut props = vec![
                    ("vfsName".to_string(), PropertyValue::data(driver.as_str())),
                    ("dbName".to_string(), PropertyValue::data(db_name.as_str())),
                    // The driver object itself stays behind.
                    ("driver".to_string(), PropertyValue::Resource(driver.clone())),
                ];
                if let Some(code) = extended_code(source) {
                    props.push(("code".to_string(), PropertyValue::data(code)));
                }
                props
            }
            Self::Storage { driver, source } => {
                let mut props = vec![("vfsName".to_string(), PropertyValue::data(driver.as_str()))];
                props.extend(source.properties());
                props
            }
        }
    }
}

/// Options passed to a driver factory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverOptions {
    /// How long a connection waits on a busy database before failing.
    pub busy_timeout: Option<Duration>,
    /// Hold the database lock for the lifetime of the connection.
    pub exclusive_locking: bool,
}

impl DriverOptions {
    /// Apply the options to a freshly opened connection.
    pub fn apply(&self, conn: &Connection) -> rusqlite::Result<()> {
        if let Some(timeout) = self.busy_timeout {
            conn.busy_timeout(timeout)?;
        }
        if self.exclusive_locking {
            conn.pragma_update(None, "locking_mode", "EXCLUSIVE")?;
        }
        Ok(())
    }
}

/// A storage driver bound into the engine's driver table.
pub trait StorageDriver: Send + Sync + fmt::Debug {
    /// Name the driver is registered under.
    fn name(&self) -> &str;

    /// Short description of the implementation (`memory`, `directory`, ...).
    fn kind(&self) -> &'static str;

    /// Open a connection to `db_name` through this driver.
    fn open(&self, db_name: &str) -> Result<Connection, DriverError>;
}

/// Builds a storage driver bound to a vfs name.
pub trait DriverFactory: Send + Sync {
    /// Kind of driver this factory builds.
    fn kind(&self) -> &'static str;

    /// Create a driver. May suspend (storage preparation).
    fn create<'a>(
        &'a self,
        vfs_name: &'a str,
        namespace: &'a StorageNamespace,
        options: &'a DriverOptions,
    ) -> BoxFuture<'a, Result<Arc<dyn StorageDriver>, DriverError>>;
}

impl fmt::Debug for dyn DriverFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DriverFactory({})", self.kind())
    }
}
