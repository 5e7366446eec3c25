//! Storage layer for Sqlbox.
//!
//! Provides:
//! - The storage namespace (file area plus document stores) and its reset
//! - The driver contract and factory contract
//! - Memory, file area and document store drivers
//! - The cipher layer wrapping any base driver

pub mod cipher;
pub mod directory;
pub mod document;
pub mod driver;
pub mod memory;
pub mod namespace;

pub use driver::{DriverError, DriverFactory, DriverOptions, StorageDriver};
pub use namespace::{ClearReport, StorageError, StorageNamespace};
