//! Test utilities for sqlbox integration tests.
//!
//! Provides:
//! - Temporary storage namespaces
//! - Context startup helpers

use sqlbox::config::StartupParams;
use sqlbox::context::worker::DEFAULT_CHANNEL_SIZE;
use sqlbox::context::{ContextHandle, Environment, ExecutionContext};
use sqlbox::lock::LockManager;
use sqlbox::observability::tracing::init_test_tracing;
use sqlbox::storage::StorageNamespace;
use std::sync::Arc;
use tempfile::TempDir;

/// Test fixture that manages a temporary namespace root.
///
/// The directory is automatically cleaned up when the fixture is dropped.
pub struct TestFixture {
    /// Temporary directory backing the namespace
    pub temp_dir: TempDir,
    /// Lock service shared by every context started from this fixture
    pub locks: Arc<LockManager>,
}

impl TestFixture {
    pub fn new() -> Self {
        init_test_tracing();
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        Self {
            temp_dir,
            locks: Arc::new(LockManager::new()),
        }
    }

    pub fn namespace(&self) -> StorageNamespace {
        StorageNamespace::new(self.temp_dir.path())
    }

    pub fn env(&self) -> Environment {
        Environment::new(self.locks.clone(), self.namespace())
    }

    /// Spawn a context from a query-style startup string without waiting for it.
    pub fn spawn(&self, query: &str) -> ContextHandle {
        ExecutionContext::spawn(self.env(), StartupParams::from_query(query), DEFAULT_CHANNEL_SIZE)
            .expect("failed to spawn context")
    }

    /// Spawn a context and wait for its ready signal.
    pub async fn start(&self, query: &str) -> ContextHandle {
        let mut context = self.spawn(query);
        if let Err(error) = context.ready().await {
            panic!("context failed to start: {error:?}");
        }
        context
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
