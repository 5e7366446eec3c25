//! Sqlbox: isolated SQLite execution contexts over pluggable storage drivers.
//!
//! Each execution context owns one database handle and serves SQL text
//! requests from its inbox. Contexts opening the same storage namespace
//! coordinate through named advisory locks, so one of them can wipe the
//! namespace while the others are still starting up.
//!
//! # Architecture
//!
//! - **Coordinated reset**: two-phase `outer`/`inner` lock protocol
//! - **Driver composition**: base storage driver, optionally wrapped by a cipher layer
//! - **Streaming execution**: lazy per-statement result batches with timing
//! - **Portable errors**: every failure crosses the context boundary as plain data
//!
//! # Modules
//!
//! - [`config`]: CLI, environment and query-string configuration
//! - [`context`]: execution contexts and the message protocol
//! - [`engine`]: SQLite engine wrapper, build table and driver table
//! - [`lock`]: advisory lock service and reset coordinator
//! - [`marshal`]: error envelopes
//! - [`observability`]: tracing setup
//! - [`query`]: statement streaming and execution
//! - [`storage`]: storage namespace and driver implementations
//! - [`vfs`]: driver configurations and composition

// Lint configuration
#![warn(clippy::all)]
#![allow(
    clippy::module_name_repetitions,    // lock::LockManager is fine
    clippy::must_use_candidate,         // Not all functions need #[must_use]
    clippy::missing_errors_doc,         // Error docs can be verbose
    clippy::missing_panics_doc,         // Panic docs can be verbose
    clippy::needless_raw_string_hashes, // r#""# is fine for SQL
    clippy::too_many_lines              // Some functions are inherently long
)]

pub mod config;
pub mod context;
pub mod engine;
pub mod lock;
pub mod marshal;
pub mod observability;
pub mod query;
pub mod storage;
pub mod vfs;

use uuid::Uuid;

/// Generate a new UUIDv7 (time-sortable) execution context ID.
///
/// # Example
///
/// ```
/// let id = sqlbox::generate_context_id();
/// assert!(id.len() == 36); // UUID string format
/// ```
#[must_use]
pub fn generate_context_id() -> String {
    Uuid::now_v7().to_string()
}
