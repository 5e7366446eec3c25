//! Two-phase storage reset.
//!
//! Contexts sharing a namespace take two named locks:
//! - `outer`: held exclusively for the whole reset, so resets never interleave
//! - `inner`: held for as long as a context uses the storage
//!
//! A context may only wipe the namespace if it can take `inner` exclusively,
//! i.e. no other context is currently using the storage. Afterwards it takes
//! `inner` again in its working mode and keeps it until it terminates.

use thiserror::Error;

use super::manager::{LockHandle, LockManager, LockMode};
use crate::marshal::{Marshal, PropertyValue};
use crate::storage::{ClearReport, StorageError, StorageNamespace};

/// Name of the lock serializing resets.
pub const OUTER_LOCK: &str = "sqlbox-outer";
/// Name of the lock held while the storage is in use.
pub const INNER_LOCK: &str = "sqlbox-inner";

/// Error type for the reset sequence.
#[derive(Debug, Error)]
pub enum ResetError {
    #[error("failed to acquire inner lock '{lock}' in {mode} mode")]
    Acquisition { lock: String, mode: LockMode },

    #[error("reset failed: {0}")]
    Storage(#[from] StorageError),
}

impl Marshal for ResetError {
    fn error_name(&self) -> &'static str {
        match self {
            Self::Acquisition { .. } => "AcquisitionFailure",
            Self::Storage(_) => "StorageError",
        }
    }

    fn properties(&self) -> Vec<(String, PropertyValue)> {
        match self {
            Self::Acquisition { lock, mode } => vec![
                ("lock".to_string(), PropertyValue::data(lock.as_str())),
                ("mode".to_string(), PropertyValue::data(mode.to_string())),
            ],
            Self::Storage(e) => e.properties(),
        }
    }
}

/// Result of a completed reset.
#[derive(Debug)]
pub struct ResetGrant {
    /// Held for the lifetime of the context.
    pub inner: LockHandle,
    /// `Some` if this context performed the clear.
    pub cleared: Option<ClearReport>,
}

/// Runs the reset protocol for one context.
#[derive(Debug, Clone, Copy)]
pub struct ResetCoordinator<'a> {
    locks: &'a LockManager,
    namespace: &'a StorageNamespace,
}

impl<'a> ResetCoordinator<'a> {
    pub fn new(locks: &'a LockManager, namespace: &'a StorageNamespace) -> Self {
        Self { locks, namespace }
    }

    /// Reset the namespace if requested.
    ///
    /// Returns the `inner` handle the caller must keep for its lifetime, or
    /// `None` when no reset was requested.
    pub async fn maybe_reset(
        &self,
        should_reset: bool,
        exclusive: bool,
    ) -> Result<Option<LockHandle>, ResetError> {
        if !should_reset {
            return Ok(None);
        }
        Ok(Some(self.reset(exclusive).await?.inner))
    }

    /// Run the reset unconditionally.
    #[tracing::instrument(skip(self), fields(namespace = %self.namespace.id()))]
    pub async fn reset(&self, exclusive: bool) -> Result<ResetGrant, ResetError> {
        let outer_name = self.namespace.lock_name(OUTER_LOCK);
        let inner_name = self.namespace.lock_name(INNER_LOCK);

        // Waits for any reset in progress; ordinary users are not affected.
        let outer = self.locks.wait(&outer_name, LockMode::Exclusive).await;

        let wiper = self.locks.try_acquire(&inner_name, LockMode::Exclusive);
        let cleared = match wiper {
            Some(handle) => {
                tracing::info!("Clearing file area and document stores");
                let report = self.namespace.clear().await?;
                tracing::info!(
                    entries = report.entries,
                    stores = report.stores,
                    "Storage reset complete"
                );
                self.locks.release(handle);
                Some(report)
            }
            None => {
                tracing::warn!("Reset skipped because another context already holds the inner lock");
                None
            }
        };

        let mode = if exclusive {
            LockMode::Exclusive
        } else {
            LockMode::Shared
        };
        let confirm = self.locks.try_acquire(&inner_name, mode);
        self.locks.release(outer);

        match confirm {
            Some(inner) => {
                tracing::debug!(%mode, "Holding inner lock for the context lifetime");
                Ok(ResetGrant { inner, cleared })
            }
            None => Err(ResetError::Acquisition {
                lock: inner_name,
                mode,
            }),
        }
    }
}
