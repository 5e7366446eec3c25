//! Execution contexts.
//!
//! Provides:
//! - The shared [`Environment`] (lock service, namespace, build and driver tables)
//! - The startup sequence: reset, driver composition, database open
//! - The per-context inbox loop and its response protocol

pub mod protocol;
pub mod startup;
pub mod worker;

pub use protocol::Response;
pub use worker::{ContextHandle, ExecutionContext};

use std::sync::Arc;
use thiserror::Error;

use crate::engine::BuildRegistry;
use crate::lock::{LockManager, ResetError};
use crate::marshal::{Marshal, PropertyValue};
use crate::query::EngineError;
use crate::storage::{DriverError, StorageNamespace};
use crate::vfs::DriverConfigRegistry;

/// Error type for context startup and context handles.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error(transparent)]
    Reset(#[from] ResetError),

    #[error("unknown engine build '{name}' (available: {})", .known.join(", "))]
    UnknownBuild { name: String, known: Vec<String> },

    #[error("unknown driver configuration '{name}' (available: {})", .known.join(", "))]
    UnknownConfig { name: String, known: Vec<String> },

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("failed to start execution context: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("execution context is closed")]
    Closed,

    #[error("execution context thread panicked")]
    ThreadPanic,
}

impl Marshal for ContextError {
    fn error_name(&self) -> &'static str {
        match self {
            Self::Reset(e) => e.error_name(),
            Self::Driver(e) => e.error_name(),
            Self::Engine(e) => e.error_name(),
            Self::UnknownBuild { .. } | Self::UnknownConfig { .. } => "ConfigError",
            Self::Spawn(_) | Self::Closed | Self::ThreadPanic => "ContextError",
        }
    }

    fn properties(&self) -> Vec<(String, PropertyValue)> {
        match self {
            Self::Reset(e) => e.properties(),
            Self::Driver(e) => e.properties(),
            Self::Engine(e) => e.properties(),
            Self::UnknownBuild { name, known } | Self::UnknownConfig { name, known } => vec![
                ("key".to_string(), PropertyValue::data(name.as_str())),
                ("available".to_string(), PropertyValue::data(known.clone())),
            ],
            Self::Spawn(_) | Self::Closed | Self::ThreadPanic => Vec::new(),
        }
    }
}

/// What every context needs besides its own startup parameters.
///
/// Contexts that should coordinate resets must share the same lock service.
#[derive(Debug, Clone)]
pub struct Environment {
    pub locks: Arc<LockManager>,
    pub namespace: StorageNamespace,
    pub builds: Arc<BuildRegistry>,
    pub configs: Arc<DriverConfigRegistry>,
}

impl Environment {
    /// Environment with the default build and driver tables.
    pub fn new(locks: Arc<LockManager>, namespace: StorageNamespace) -> Self {
        Self {
            locks,
            namespace,
            builds: Arc::new(BuildRegistry::default()),
            configs: Arc::new(DriverConfigRegistry::default()),
        }
    }

    #[must_use]
    pub fn with_builds(mut self, builds: BuildRegistry) -> Self {
        self.builds = Arc::new(builds);
        self
    }

    #[must_use]
    pub fn with_configs(mut self, configs: DriverConfigRegistry) -> Self {
        self.configs = Arc::new(configs);
        self
    }
}
