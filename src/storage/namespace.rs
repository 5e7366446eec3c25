//! Persistent storage namespace.
//!
//! A namespace is a root directory holding two substrates:
//! - `files/`: a flat file area used by the directory driver
//! - `stores/<name>/`: named document stores used by the document driver
//!
//! Every context opening the same root shares the same namespace, and the
//! lock names derived from [`StorageNamespace::id`].

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

use crate::marshal::{Marshal, PropertyValue};

const FILES_DIR: &str = "files";
const STORES_DIR: &str = "stores";

/// Error type for namespace operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to remove {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to enumerate {path}: {source}")]
    Enumerate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    fn path(&self) -> &Path {
        match self {
            Self::Remove { path, .. } | Self::Enumerate { path, .. } | Self::Create { path, .. } => {
                path
            }
        }
    }

    fn io(&self) -> &io::Error {
        match self {
            Self::Remove { source, .. }
            | Self::Enumerate { source, .. }
            | Self::Create { source, .. } => source,
        }
    }
}

impl Marshal for StorageError {
    fn error_name(&self) -> &'static str {
        "StorageError"
    }

    fn properties(&self) -> Vec<(String, PropertyValue)> {
        let mut props = vec![(
            "path".to_string(),
            PropertyValue::data(self.path().display().to_string()),
        )];
        if let Some(code) = self.io().raw_os_error() {
            props.push(("errno".to_string(), PropertyValue::data(code)));
        }
        props
    }
}

/// Summary of a namespace clear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearReport {
    /// Entries removed from the file area.
    pub entries: usize,
    /// Document stores deleted.
    pub stores: usize,
}

/// A durable storage area shared by all contexts that open it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageNamespace {
    root: PathBuf,
}

impl StorageNamespace {
    /// Create a namespace rooted at `root`. Nothing is created on disk yet.
    ///
    /// The root is canonicalized when it exists and made absolute otherwise,
    /// so every spelling of the same directory shares one set of locks.
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        let root = root.into();
        let root = std::fs::canonicalize(&root)
            .or_else(|_| std::path::absolute(&root))
            .unwrap_or(root);
        Self { root }
    }

    /// Root directory of the namespace.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Identifier used to qualify lock names.
    pub fn id(&self) -> String {
        self.root.display().to_string()
    }

    /// Qualified name of a lock scoped to this namespace.
    pub fn lock_name(&self, name: &str) -> String {
        format!("{}#{name}", self.id())
    }

    /// Directory of the file area.
    pub fn files_dir(&self) -> PathBuf {
        self.root.join(FILES_DIR)
    }

    /// Directory holding every document store.
    pub fn stores_dir(&self) -> PathBuf {
        self.root.join(STORES_DIR)
    }

    /// Directory of one document store.
    pub fn store_dir(&self, name: &str) -> PathBuf {
        self.stores_dir().join(name)
    }

    /// Make sure `dir` exists.
    pub async fn ensure_dir(&self, dir: &Path) -> Result<(), StorageError> {
        fs::create_dir_all(dir)
            .await
            .map_err(|source| StorageError::Create {
                path: dir.to_path_buf(),
                source,
            })
    }

    /// List the entry paths of a directory. A missing directory is empty.
    async fn entries(dir: &Path) -> Result<Vec<PathBuf>, StorageError> {
        let enumerate = |source: io::Error| StorageError::Enumerate {
            path: dir.to_path_buf(),
            source,
        };

        let mut read_dir = match fs::read_dir(dir).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(enumerate(e)),
        };

        let mut entries = Vec::new();
        while let Some(entry) = read_dir.next_entry().await.map_err(enumerate)? {
            entries.push(entry.path());
        }
        entries.sort();
        Ok(entries)
    }

    async fn remove(path: &Path) -> Result<(), StorageError> {
        let metadata = match fs::symlink_metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(source) => {
                return Err(StorageError::Remove {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let result = if metadata.is_dir() {
            fs::remove_dir_all(path).await
        } else {
            fs::remove_file(path).await
        };

        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Remove {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Remove every entry of the file area, recursively.
    pub async fn clear_files(&self) -> Result<usize, StorageError> {
        let entries = Self::entries(&self.files_dir()).await?;
        for entry in &entries {
            Self::remove(entry).await?;
        }
        Ok(entries.len())
    }

    /// Names of all document stores.
    pub async fn list_stores(&self) -> Result<Vec<String>, StorageError> {
        Ok(Self::entries(&self.stores_dir())
            .await?
            .iter()
            .filter_map(|path| path.file_name()?.to_str().map(str::to_string))
            .collect())
    }

    /// Delete a document store and everything in it.
    pub async fn delete_store(&self, name: &str) -> Result<(), StorageError> {
        Self::remove(&self.store_dir(name)).await
    }

    /// Wipe the namespace: the whole file area and every document store.
    pub async fn clear(&self) -> Result<ClearReport, StorageError> {
        let entries = self.clear_files().await?;

        let stores = self.list_stores().await?;
        for name in &stores {
            self.delete_store(name).await?;
        }

        Ok(ClearReport {
            entries,
            stores: stores.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_same_directory_shares_lock_names() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("data")).unwrap();
        std::fs::create_dir_all(temp_dir.path().join("other")).unwrap();

        let direct = StorageNamespace::new(temp_dir.path().join("data"));
        let indirect = StorageNamespace::new(temp_dir.path().join("other/../data/."));
        assert_eq!(direct.lock_name("outer"), indirect.lock_name("outer"));

        let relative = StorageNamespace::new("not-created-yet");
        assert!(relative.root().is_absolute());
    }

    #[tokio::test]
    async fn test_clear_missing_namespace_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let ns = StorageNamespace::new(temp_dir.path().join("absent"));

        let report = ns.clear().await.unwrap();
        assert_eq!(report, ClearReport::default());
    }

    #[tokio::test]
    async fn test_clear_removes_files_and_stores() {
        let temp_dir = TempDir::new().unwrap();
        let ns = StorageNamespace::new(temp_dir.path());

        ns.ensure_dir(&ns.files_dir().join("nested")).await.unwrap();
        std::fs::write(ns.files_dir().join("hello"), b"db").unwrap();
        std::fs::write(ns.files_dir().join("nested").join("x"), b"x").unwrap();
        ns.ensure_dir(&ns.store_dir("demo")).await.unwrap();
        ns.ensure_dir(&ns.store_dir("demo-document")).await.unwrap();

        assert_eq!(ns.list_stores().await.unwrap(), vec!["demo", "demo-document"]);

        let report = ns.clear().await.unwrap();
        assert_eq!(report.entries, 2);
        assert_eq!(report.stores, 2);
        assert!(ns.list_stores().await.unwrap().is_empty());
        assert_eq!(std::fs::read_dir(ns.files_dir()).unwrap().count(), 0);
    }

    #[test]
    fn test_lock_names_are_namespace_scoped() {
        let a = StorageNamespace::new("/data/a");
        let b = StorageNamespace::new("/data/b");
        assert_ne!(a.lock_name("inner"), b.lock_name("inner"));
        assert_eq!(a.lock_name("inner"), a.clone().lock_name("inner"));
    }
}
