//! File area driver.
//!
//! Each database is a plain file directly under the namespace's `files/`
//! directory, so every context using the same namespace sees the same data.

use futures::future::BoxFuture;
use rusqlite::{Connection, OpenFlags};
use std::path::PathBuf;
use std::sync::Arc;

use super::driver::{DriverError, DriverFactory, DriverOptions, StorageDriver};
use super::namespace::StorageNamespace;

/// Driver storing databases in the namespace file area.
#[derive(Debug, Clone)]
pub struct DirectoryDriver {
    name: String,
    dir: PathBuf,
    options: DriverOptions,
}

impl DirectoryDriver {
    /// Path of the file backing `db_name`.
    pub fn db_path(&self, db_name: &str) -> PathBuf {
        self.dir.join(db_name)
    }
}

impl StorageDriver for DirectoryDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "directory"
    }

    fn open(&self, db_name: &str) -> Result<Connection, DriverError> {
        let open_err = |source: rusqlite::Error| DriverError::Open {
            driver: self.name.clone(),
            db_name: db_name.to_string(),
            source,
        };
        let conn = Connection::open_with_flags(
            self.db_path(db_name),
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(open_err)?;
        self.options.apply(&conn).map_err(open_err)?;

        tracing::debug!(vfs = %self.name, db = db_name, "Opened database in file area");
        Ok(conn)
    }
}

/// Factory for [`DirectoryDriver`]. Creates the file area if needed.
#[derive(Debug, Default)]
pub struct DirectoryDriverFactory;

impl DriverFactory for DirectoryDriverFactory {
    fn kind(&self) -> &'static str {
        "directory"
    }

    fn create<'a>(
        &'a self,
        vfs_name: &'a str,
        namespace: &'a StorageNamespace,
        options: &'a DriverOptions,
    ) -> BoxFuture<'a, Result<Arc<dyn StorageDriver>, DriverError>> {
        Box::pin(async move {
            let dir = namespace.files_dir();
            namespace
                .ensure_dir(&dir)
                .await
                .map_err(|source| DriverError::Storage {
                    driver: vfs_name.to_string(),
                    source,
                })?;

            let driver: Arc<dyn StorageDriver> = Arc::new(DirectoryDriver {
                name: vfs_name.to_string(),
                dir,
                options: options.clone(),
            });
            Ok(driver)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_databases_persist_in_file_area() {
        let temp_dir = TempDir::new().unwrap();
        let ns = StorageNamespace::new(temp_dir.path());
        let driver = DirectoryDriverFactory
            .create("demo", &ns, &DriverOptions::default())
            .await
            .unwrap();

        {
            let conn = driver.open("hello").unwrap();
            conn.execute_batch("CREATE TABLE t(x); INSERT INTO t VALUES (1);")
                .unwrap();
        }

        assert!(ns.files_dir().join("hello").exists());
        let conn = driver.open("hello").unwrap();
        let x: i64 = conn.query_row("SELECT x FROM t", [], |row| row.get(0)).unwrap();
        assert_eq!(x, 1);
    }
}
