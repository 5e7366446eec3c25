//! Cipher layer driver.
//!
//! Wraps a base driver and routes every open through it. Encryption itself
//! happens in the cipher-capable engine build once a key is set on the
//! connection (`PRAGMA key`), so the base driver needs no cipher awareness.

use rusqlite::{Connection, OptionalExtension};
use std::sync::Arc;

use super::driver::{DriverError, StorageDriver};

/// Prefix of cipher driver names; the rest is the base driver's name.
pub const CIPHER_PREFIX: &str = "cipher-";

/// Driver delegating all I/O to a base driver through the cipher layer.
#[derive(Debug, Clone)]
pub struct CipherDriver {
    name: String,
    base: Arc<dyn StorageDriver>,
}

impl CipherDriver {
    pub fn wrap(base: Arc<dyn StorageDriver>) -> Self {
        Self {
            name: format!("{CIPHER_PREFIX}{}", base.name()),
            base,
        }
    }
}

impl StorageDriver for CipherDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "cipher"
    }

    fn open(&self, db_name: &str) -> Result<Connection, DriverError> {
        tracing::debug!(vfs = %self.name, base = %self.base.name(), db = db_name, "Opening through cipher layer");
        self.base.open(db_name)
    }
}

/// Whether the linked SQLite library can encrypt databases.
pub fn cipher_supported() -> bool {
    let probe = || -> rusqlite::Result<Option<String>> {
        let conn = Connection::open_in_memory()?;
        conn.query_row("PRAGMA cipher_version", [], |row| row.get(0))
            .optional()
    };
    matches!(probe(), Ok(Some(version)) if !version.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::driver::DriverOptions;
    use crate::storage::memory::MemoryDriver;

    #[test]
    fn test_cipher_driver_named_after_base() {
        let base: Arc<dyn StorageDriver> =
            Arc::new(MemoryDriver::new("demo", DriverOptions::default()));
        let cipher = CipherDriver::wrap(base);

        assert_eq!(cipher.name(), "cipher-demo");
        assert_eq!(cipher.kind(), "cipher");
        assert!(cipher.open("hello").is_ok());
    }

    #[cfg(not(feature = "cipher"))]
    #[test]
    fn test_plain_build_has_no_cipher() {
        assert!(!cipher_supported());
    }
}
