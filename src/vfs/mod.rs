//! Driver configurations and driver composition.
//!
//! Provides:
//! - The named driver configuration table (which factory, vfs name, options)
//! - The composer registering a base driver and optionally a cipher layer

pub mod composer;
pub mod configs;

pub use composer::{install_driver, CipherLayerFailure, InstallOutcome};
pub use configs::{DriverConfig, DriverConfigRegistry};
