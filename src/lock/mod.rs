//! Advisory locking across execution contexts.
//!
//! Provides:
//! - A named shared/exclusive lock service with blocking and try-once acquisition
//! - The two-phase reset coordinator built on top of it

pub mod coordinator;
pub mod manager;

pub use coordinator::{ResetCoordinator, ResetError, ResetGrant};
pub use manager::{LockHandle, LockManager, LockMode, LockRequest};
