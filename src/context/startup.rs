//! Context startup sequence.
//!
//! 1. Coordinated reset, if requested
//! 2. Build and config lookup
//! 3. Driver composition (skipped for configurations without a factory)
//! 4. Database open and SQL helper functions
//!
//! Any failure aborts the sequence; later steps never run.

use rusqlite::Connection;

use super::{ContextError, Environment};
use crate::config::{StartupParams, DEFAULT_DB_NAME};
use crate::engine::functions::register_functions;
use crate::engine::Engine;
use crate::lock::{LockHandle, ResetCoordinator};
use crate::query::EngineError;
use crate::vfs::{install_driver, InstallOutcome};

/// A context that finished startup.
#[derive(Debug)]
pub struct Started {
    pub conn: Connection,
    pub engine: Engine,
    /// `None` when no driver was installed.
    pub outcome: Option<InstallOutcome>,
    /// Inner lock kept from the reset; released when the context ends.
    pub inner_lock: Option<LockHandle>,
}

/// Run the startup sequence for one context.
#[tracing::instrument(skip(env, params), fields(config = ?params.config, build = ?params.build))]
pub async fn startup(env: &Environment, params: &StartupParams) -> Result<Started, ContextError> {
    let inner_lock = ResetCoordinator::new(&env.locks, &env.namespace)
        .maybe_reset(params.reset, params.exclusive)
        .await?;

    let build = env
        .builds
        .resolve(params.build.as_deref())
        .ok_or_else(|| ContextError::UnknownBuild {
            name: params.build.clone().unwrap_or_default(),
            known: env.builds.names(),
        })?
        .clone();
    let config = env
        .configs
        .resolve(params.config.as_deref())
        .ok_or_else(|| ContextError::UnknownConfig {
            name: params.config.clone().unwrap_or_default(),
            known: env.configs.names(),
        })?;

    let db_name = params.db_name.as_deref().unwrap_or(DEFAULT_DB_NAME);
    let vfs_name = config.effective_vfs_name(params.vfs_name.as_deref());

    let cipher_requested = build.cipher;
    let mut engine = Engine::new(build);

    let outcome = match &config.factory {
        Some(factory) => Some(
            install_driver(
                &mut engine,
                factory,
                &env.namespace,
                &vfs_name,
                &config.options,
                cipher_requested,
            )
            .await?,
        ),
        None => None,
    };

    let conn = engine.open(db_name)?;
    register_functions(&conn).map_err(EngineError::from)?;

    tracing::info!(
        db = db_name,
        vfs = %engine.default_driver().name(),
        outcome = ?outcome,
        "Context started"
    );

    Ok(Started {
        conn,
        engine,
        outcome,
        inner_lock,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::LockManager;
    use crate::storage::StorageNamespace;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn env(temp_dir: &TempDir) -> Environment {
        Environment::new(
            Arc::new(LockManager::new()),
            StorageNamespace::new(temp_dir.path()),
        )
    }

    #[tokio::test]
    async fn test_default_config_uses_builtin_driver() {
        let temp_dir = TempDir::new().unwrap();
        let started = startup(&env(&temp_dir), &StartupParams::default())
            .await
            .unwrap();

        assert!(started.outcome.is_none());
        assert!(started.inner_lock.is_none());
        assert!(started.engine.drivers().is_empty());
    }

    #[tokio::test]
    async fn test_directory_config_installs_plain_driver() {
        let temp_dir = TempDir::new().unwrap();
        let env = env(&temp_dir);
        let params = StartupParams::from_query("config=directory&dbName=app");
        let started = startup(&env, &params).await.unwrap();

        assert_eq!(started.outcome, Some(InstallOutcome::Plain));
        assert_eq!(started.engine.default_driver().name(), "demo");
        assert!(env.namespace.files_dir().join("app").exists());
    }

    #[cfg(not(feature = "cipher"))]
    #[tokio::test]
    async fn test_cipher_build_falls_back_without_cipher_support() {
        let temp_dir = TempDir::new().unwrap();
        let params = StartupParams::from_query("build=cipher&config=memory");
        let started = startup(&env(&temp_dir), &params).await.unwrap();

        assert!(matches!(started.outcome, Some(InstallOutcome::Fallback(_))));
        assert_eq!(started.engine.default_driver().name(), "demo");
    }

    #[tokio::test]
    async fn test_unknown_config_fails() {
        let temp_dir = TempDir::new().unwrap();
        let params = StartupParams::from_query("config=FLOOR");
        let err = startup(&env(&temp_dir), &params).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown driver configuration 'FLOOR' (available: default, memory, directory, document)"
        );
        assert!(matches!(err, ContextError::UnknownConfig { name, .. } if name == "FLOOR"));
    }

    #[tokio::test]
    async fn test_failed_confirmation_skips_driver_install() {
        let temp_dir = TempDir::new().unwrap();
        let env = env(&temp_dir);
        let _in_use = env
            .locks
            .acquire(&crate::lock::LockRequest::wait(
                env.namespace.lock_name(crate::lock::coordinator::INNER_LOCK),
                crate::lock::LockMode::Shared,
            ))
            .await;

        let params = StartupParams::from_query("config=directory&reset&exclusive");
        let err = startup(&env, &params).await.unwrap_err();

        assert!(matches!(err, ContextError::Reset(_)));
        assert!(!env.namespace.files_dir().exists(), "driver must not be created");
    }

    #[tokio::test]
    async fn test_helper_functions_installed() {
        let temp_dir = TempDir::new().unwrap();
        let started = startup(&env(&temp_dir), &StartupParams::default())
            .await
            .unwrap();
        let hit: i64 = started
            .conn
            .query_row("SELECT 'abc' REGEXP 'b'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(hit, 1);
    }
}
