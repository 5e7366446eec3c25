//! Sqlbox: run one SQLite execution context from the command line.
//!
//! # Usage
//!
//! ```bash
//! echo "SELECT 1; SELECT 2, 3;" | sqlbox --data-dir ./data --config directory
//! sqlbox --query "config=document&dbName=notes&reset"
//! ```
//!
//! Every outbound message is printed to stdout as one JSON line: `null` once
//! the context is ready, then one `{results, elapsed}` or `{error}` object per
//! input line. Logs go to stderr.
//!
//! Environment variables can also be used:
//! - `SQLBOX_DATA_DIR`: Root of the storage namespace
//! - `SQLBOX_QUERY`: Query-style startup string
//! - `RUST_LOG`: Log filter (trace, debug, info, warn, error)

use anyhow::{bail, Result};
use sqlbox::config::Config;
use sqlbox::context::{Environment, ExecutionContext, Response};
use sqlbox::lock::LockManager;
use sqlbox::observability::tracing::init_tracing;
use sqlbox::storage::StorageNamespace;
use std::fs;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

/// Print startup banner with version and configuration.
fn print_banner(config: &Config, namespace: &StorageNamespace) {
    let version = env!("CARGO_PKG_VERSION");
    let params = config.startup_params();
    eprintln!(
        r#"
  Sqlbox v{} - isolated SQLite execution context

  Configuration:
    Data Dir:   {}
    Build:      {}
    Driver:     {}
    Database:   {}
    Reset:      {}{}
"#,
        version,
        namespace.root().display(),
        params.build.as_deref().unwrap_or("(default)"),
        params.config.as_deref().unwrap_or("(default)"),
        params.db_name.as_deref().unwrap_or(sqlbox::config::DEFAULT_DB_NAME),
        params.reset,
        if params.exclusive { " (exclusive)" } else { "" },
    );
}

/// Write one outbound message as a JSON line.
fn emit(response: &Response) -> Result<()> {
    println!("{}", serde_json::to_string(response)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse configuration from CLI arguments and environment
    let config = Config::parse_args();

    init_tracing("sqlbox", &config.log_level, config.log_json);

    // Ensure the namespace root exists
    fs::create_dir_all(&config.data_dir)?;

    let namespace = StorageNamespace::new(&config.data_dir);
    print_banner(&config, &namespace);

    let shutdown = CancellationToken::new();

    // Spawn signal handler task
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm =
                signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

            tokio::select! {
                _ = ctrl_c => {
                    tracing::info!("Received SIGINT (Ctrl+C), initiating shutdown...");
                }
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, initiating shutdown...");
                }
            }
        }

        #[cfg(not(unix))]
        {
            ctrl_c.await.expect("failed to listen for ctrl+c");
            tracing::info!("Received Ctrl+C, initiating shutdown...");
        }

        signal_token.cancel();
    });

    let env = Environment::new(Arc::new(LockManager::new()), namespace);
    let mut context = ExecutionContext::spawn(env, config.startup_params(), config.channel_size)?;

    if let Err(error) = context.ready().await {
        emit(&Response::Error { error })?;
        bail!("execution context failed to start");
    }
    emit(&Response::Ready)?;

    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next() => match line {
                Some(Ok(sql)) if sql.trim().is_empty() => continue,
                Some(Ok(sql)) => emit(&context.request(sql).await?)?,
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
        }
    }

    context.shutdown().await?;
    tracing::info!("Sqlbox shutdown complete");
    Ok(())
}
