//! In-memory driver. Nothing survives the connection.

use futures::future::{self, BoxFuture};
use rusqlite::Connection;
use std::sync::Arc;

use super::driver::{DriverError, DriverFactory, DriverOptions, StorageDriver};
use super::namespace::StorageNamespace;

/// Driver whose databases live only in memory.
#[derive(Debug, Clone)]
pub struct MemoryDriver {
    name: String,
    options: DriverOptions,
}

impl MemoryDriver {
    pub fn new(name: impl Into<String>, options: DriverOptions) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }
}

impl StorageDriver for MemoryDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "memory"
    }

    fn open(&self, db_name: &str) -> Result<Connection, DriverError> {
        let open_err = |source: rusqlite::Error| DriverError::Open {
            driver: self.name.clone(),
            db_name: db_name.to_string(),
            source,
        };
        let conn = Connection::open_in_memory().map_err(open_err)?;
        self.options.apply(&conn).map_err(open_err)?;
        Ok(conn)
    }
}

/// Factory for [`MemoryDriver`].
#[derive(Debug, Default)]
pub struct MemoryDriverFactory;

impl DriverFactory for MemoryDriverFactory {
    fn kind(&self) -> &'static str {
        "memory"
    }

    fn create<'a>(
        &'a self,
        vfs_name: &'a str,
        _namespace: &'a StorageNamespace,
        options: &'a DriverOptions,
    ) -> BoxFuture<'a, Result<Arc<dyn StorageDriver>, DriverError>> {
        let driver: Arc<dyn StorageDriver> = Arc::new(MemoryDriver::new(vfs_name, options.clone()));
        Box::pin(future::ready(Ok(driver)))
    }
}
