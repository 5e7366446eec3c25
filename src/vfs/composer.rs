//! Driver composition.
//!
//! Binding a driver and making it the default are separate steps, which
//! lets the cipher layer sit between the engine and the base driver:
//!
//! ```text
//!   engine ──default──> cipher-<vfs> ──delegates──> <vfs> ──> storage
//! ```
//!
//! If the cipher layer cannot be created, the base driver is promoted to
//! default and the context keeps running unencrypted.

use std::sync::Arc;
use thiserror::Error;

use crate::engine::{Engine, CIPHER_OK};
use crate::storage::{DriverError, DriverFactory, DriverOptions, StorageNamespace};

/// The cipher layer could not be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cipher layer creation failed with status {status}")]
pub struct CipherLayerFailure {
    pub status: i32,
}

/// How the driver stack ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Base driver is the default, no cipher requested.
    Plain,
    /// Cipher driver over the base driver is the default.
    Encrypted,
    /// Cipher requested but unavailable; base driver is the default.
    Fallback(CipherLayerFailure),
}

/// Build the driver for `vfs_name` and install it as the engine's default,
/// wrapped in the cipher layer when requested.
#[tracing::instrument(skip(engine, factory, namespace, options), fields(kind = factory.kind()))]
pub async fn install_driver(
    engine: &mut Engine,
    factory: &Arc<dyn DriverFactory>,
    namespace: &StorageNamespace,
    vfs_name: &str,
    options: &DriverOptions,
    cipher_requested: bool,
) -> Result<InstallOutcome, DriverError> {
    let base = factory.create(vfs_name, namespace, options).await?;

    if !cipher_requested {
        engine.register_driver(base, true);
        return Ok(InstallOutcome::Plain);
    }

    engine.register_driver(base.clone(), false);

    let status = engine.create_cipher_layer(vfs_name, true);
    if status == CIPHER_OK {
        tracing::info!(vfs = vfs_name, "Cipher layer installed as default driver");
        return Ok(InstallOutcome::Encrypted);
    }

    let failure = CipherLayerFailure { status };
    tracing::warn!(
        vfs = vfs_name,
        error = %failure,
        "Failed to create cipher layer, falling back to unencrypted driver"
    );
    engine.register_driver(base, true);
    Ok(InstallOutcome::Fallback(failure))
}
