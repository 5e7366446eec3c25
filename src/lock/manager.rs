//! Named advisory locks shared by every execution context in the process.
//!
//! Each name maps to a reader/writer lock: `Shared` holders may coexist,
//! an `Exclusive` holder excludes everyone else. Acquisition either waits
//! until granted or, with `try_only`, is attempted once and reports
//! whether it was granted. Grants are represented by [`LockHandle`]s,
//! which release the lock exactly once: explicitly through
//! [`LockManager::release`] or implicitly when dropped.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

/// Lock mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shared => f.write_str("shared"),
            Self::Exclusive => f.write_str("exclusive"),
        }
    }
}

/// A request for a named lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRequest {
    pub name: String,
    pub mode: LockMode,
    /// Attempt once instead of waiting until granted.
    pub try_only: bool,
}

impl LockRequest {
    /// Wait until the lock is granted in `mode`.
    pub fn wait(name: impl Into<String>, mode: LockMode) -> Self {
        Self {
            name: name.into(),
            mode,
            try_only: false,
        }
    }

    /// Attempt to take the lock in `mode` once, without waiting.
    pub fn try_once(name: impl Into<String>, mode: LockMode) -> Self {
        Self {
            name: name.into(),
            mode,
            try_only: true,
        }
    }
}

/// Held only for its `Drop`.
#[allow(dead_code)]
enum Guard {
    Shared(OwnedRwLockReadGuard<()>),
    Exclusive(OwnedRwLockWriteGuard<()>),
}

/// Ownership of an acquired lock.
pub struct LockHandle {
    name: String,
    mode: LockMode,
    _guard: Guard,
}

impl LockHandle {
    /// Name of the held lock.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mode the lock is held in.
    pub fn mode(&self) -> LockMode {
        self.mode
    }
}

impl fmt::Debug for LockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockHandle")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .finish()
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        tracing::trace!(lock = %self.name, mode = %self.mode, "Lock released");
    }
}

/// Process-wide lock service.
///
/// Clone the `Arc` into every context that should coordinate with the others.
#[derive(Debug, Default)]
pub struct LockManager {
    locks: Mutex<HashMap<String, Arc<RwLock<()>>>>,
}

impl LockManager {
    /// Create a new lock service with no locks.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, name: &str) -> Arc<RwLock<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    /// Acquire a lock as described by `request`.
    ///
    /// Returns `None` only for a `try_only` request that could not be granted
    /// immediately. Waiting requests suspend until granted.
    pub async fn acquire(&self, request: &LockRequest) -> Option<LockHandle> {
        if request.try_only {
            self.try_acquire(&request.name, request.mode)
        } else {
            Some(self.wait(&request.name, request.mode).await)
        }
    }

    /// Suspend until `name` is granted in `mode`. No timeout.
    pub async fn wait(&self, name: &str, mode: LockMode) -> LockHandle {
        let lock = self.lock_for(name);
        let guard = match mode {
            LockMode::Shared => Guard::Shared(lock.read_owned().await),
            LockMode::Exclusive => Guard::Exclusive(lock.write_owned().await),
        };
        Self::granted(name, mode, guard)
    }

    /// Attempt `name` in `mode` once.
    pub fn try_acquire(&self, name: &str, mode: LockMode) -> Option<LockHandle> {
        let lock = self.lock_for(name);
        let guard = match mode {
            LockMode::Shared => Guard::Shared(lock.try_read_owned().ok()?),
            LockMode::Exclusive => Guard::Exclusive(lock.try_write_owned().ok()?),
        };
        Some(Self::granted(name, mode, guard))
    }

    fn granted(name: &str, mode: LockMode, guard: Guard) -> LockHandle {
        tracing::trace!(lock = name, %mode, "Lock granted");
        LockHandle {
            name: name.to_string(),
            mode,
            _guard: guard,
        }
    }

    /// Release a held lock.
    pub fn release(&self, handle: LockHandle) {
        drop(handle);
    }

    /// Number of lock names seen so far.
    #[cfg(test)]
    pub fn known_locks(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready, task};

    #[tokio::test]
    async fn test_shared_holders_coexist() {
        let locks = LockManager::new();
        let a = locks
            .acquire(&LockRequest::try_once("inner", LockMode::Shared))
            .await;
        let b = locks
            .acquire(&LockRequest::try_once("inner", LockMode::Shared))
            .await;
        assert!(a.is_some());
        assert!(b.is_some());

        let exclusive = locks
            .acquire(&LockRequest::try_once("inner", LockMode::Exclusive))
            .await;
        assert!(exclusive.is_none(), "exclusive must fail while shared holders exist");
    }

    #[tokio::test]
    async fn test_exclusive_excludes_everyone() {
        let locks = LockManager::new();
        let held = locks
            .acquire(&LockRequest::wait("outer", LockMode::Exclusive))
            .await
            .expect("waiting acquire always grants");
        assert_eq!(held.mode(), LockMode::Exclusive);

        assert!(locks
            .acquire(&LockRequest::try_once("outer", LockMode::Shared))
            .await
            .is_none());

        locks.release(held);
        assert!(locks
            .acquire(&LockRequest::try_once("outer", LockMode::Shared))
            .await
            .is_some());
    }

    #[tokio::test]
    async fn test_names_are_independent() {
        let locks = LockManager::new();
        let _a = locks
            .acquire(&LockRequest::wait("a", LockMode::Exclusive))
            .await;
        let b = locks
            .acquire(&LockRequest::try_once("b", LockMode::Exclusive))
            .await;
        assert!(b.is_some());
        assert_eq!(locks.known_locks(), 2);
    }

    #[tokio::test]
    async fn test_waiting_acquire_resumes_after_release() {
        let locks = LockManager::new();
        let held = locks.wait("outer", LockMode::Exclusive).await;

        let mut waiter = task::spawn(locks.wait("outer", LockMode::Shared));
        assert_pending!(waiter.poll());

        locks.release(held);
        assert!(waiter.is_woken());
        let granted = assert_ready!(waiter.poll());
        assert_eq!(granted.mode(), LockMode::Shared);
    }

    #[test]
    fn test_try_acquire_never_waits() {
        let locks = LockManager::new();
        let held = locks.try_acquire("inner", LockMode::Shared);
        assert!(held.is_some());

        let request = LockRequest::try_once("inner", LockMode::Exclusive);
        let mut attempt = task::spawn(locks.acquire(&request));
        assert!(assert_ready!(attempt.poll()).is_none());
    }
}
