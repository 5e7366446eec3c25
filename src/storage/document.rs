//! Document store driver.
//!
//! The driver owns one named document store (`stores/<vfs name>/`) and keeps
//! each database as a document inside it. Deleting the store deletes every
//! database the driver ever created.

use futures::future::BoxFuture;
use rusqlite::{Connection, OpenFlags};
use std::path::PathBuf;
use std::sync::Arc;

use super::driver::{DriverError, DriverFactory, DriverOptions, StorageDriver};
use super::namespace::StorageNamespace;

const DOCUMENT_SUFFIX: &str = "doc";

/// Driver keeping databases inside a named document store.
#[derive(Debug, Clone)]
pub struct DocumentStoreDriver {
    name: String,
    store: PathBuf,
    options: DriverOptions,
}

impl DocumentStoreDriver {
    /// Path of the document backing `db_name`.
    pub fn document_path(&self, db_name: &str) -> PathBuf {
        self.store.join(format!("{db_name}.{DOCUMENT_SUFFIX}"))
    }
}

impl StorageDriver for DocumentStoreDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "document"
    }

    fn open(&self, db_name: &str) -> Result<Connection, DriverError> {
        let open_err = |source: rusqlite::Error| DriverError::Open {
            driver: self.name.clone(),
            db_name: db_name.to_string(),
            source,
        };
        let conn = Connection::open_with_flags(
            self.document_path(db_name),
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(open_err)?;
        self.options.apply(&conn).map_err(open_err)?;

        tracing::debug!(vfs = %self.name, db = db_name, "Opened database in document store");
        Ok(conn)
    }
}

/// Factory for [`DocumentStoreDriver`]. Creates the store named after the vfs.
#[derive(Debug, Default)]
pub struct DocumentStoreDriverFactory;

impl DriverFactory for DocumentStoreDriverFactory {
    fn kind(&self) -> &'static str {
        "document"
    }

    fn create<'a>(
        &'a self,
        vfs_name: &'a str,
        namespace: &'a StorageNamespace,
        options: &'a DriverOptions,
    ) -> BoxFuture<'a, Result<Arc<dyn StorageDriver>, DriverError>> {
        Box::pin(async move {
            let store = namespace.store_dir(vfs_name);
            namespace
                .ensure_dir(&store)
                .await
                .map_err(|source| DriverError::Storage {
                    driver: vfs_name.to_string(),
                    source,
                })?;

            let driver: Arc<dyn StorageDriver> = Arc::new(DocumentStoreDriver {
                name: vfs_name.to_string(),
                store,
                options: options.clone(),
            });
            Ok(driver)
        })
    }
}
