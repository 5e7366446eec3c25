//! Configuration parsing for Sqlbox.
//!
//! Supports:
//! - CLI arguments via clap
//! - Environment variable overrides
//! - Query-style startup strings (`config=directory&dbName=hello&reset`)

use clap::Parser;
use std::path::PathBuf;

/// Database name used when none is given.
pub const DEFAULT_DB_NAME: &str = "hello";

/// Sqlbox: isolated SQLite execution contexts over pluggable storage drivers.
#[derive(Parser, Debug, Clone)]
#[command(name = "sqlbox")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Root directory of the storage namespace
    #[arg(short, long, env = "SQLBOX_DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "SQLBOX_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "SQLBOX_LOG_JSON")]
    pub log_json: bool,

    /// Engine build (default, cipher)
    #[arg(long, env = "SQLBOX_BUILD")]
    pub build: Option<String>,

    /// Driver configuration (default, memory, directory, document)
    #[arg(long = "config", env = "SQLBOX_CONFIG")]
    pub driver_config: Option<String>,

    /// Database name
    #[arg(long, env = "SQLBOX_DB_NAME")]
    pub db_name: Option<String>,

    /// Name the storage driver is registered under
    #[arg(long, env = "SQLBOX_VFS_NAME")]
    pub vfs_name: Option<String>,

    /// Wipe the storage namespace before opening the database
    #[arg(long)]
    pub reset: bool,

    /// Hold the storage exclusively after a reset
    #[arg(long)]
    pub exclusive: bool,

    /// Query-style startup string; its keys override the flags above
    #[arg(short, long, env = "SQLBOX_QUERY")]
    pub query: Option<String>,

    /// Size of the context inbox and outbox channels
    #[arg(long, env = "SQLBOX_CHANNEL_SIZE", default_value_t = crate::context::worker::DEFAULT_CHANNEL_SIZE)]
    pub channel_size: usize,
}

impl Config {
    /// Parse configuration from CLI arguments and environment.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Startup parameters for the context, merged with the query string.
    pub fn startup_params(&self) -> StartupParams {
        let flags = StartupParams {
            build: self.build.clone(),
            config: self.driver_config.clone(),
            db_name: self.db_name.clone(),
            vfs_name: self.vfs_name.clone(),
            reset: self.reset,
            exclusive: self.exclusive,
        };
        match &self.query {
            Some(query) => flags.merge(StartupParams::from_query(query)),
            None => flags,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            log_level: "info".into(),
            log_json: false,
            build: None,
            driver_config: None,
            db_name: None,
            vfs_name: None,
            reset: false,
            exclusive: false,
            query: None,
            channel_size: crate::context::worker::DEFAULT_CHANNEL_SIZE,
        }
    }
}

/// Parameters read once when an execution context starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupParams {
    /// Engine build name; `None` selects the first build.
    pub build: Option<String>,
    /// Driver configuration name; `None` selects the first configuration.
    pub config: Option<String>,
    pub db_name: Option<String>,
    pub vfs_name: Option<String>,
    /// Present: run the coordinated reset.
    pub reset: bool,
    /// Present: hold the storage exclusively after the reset.
    pub exclusive: bool,
}

impl StartupParams {
    /// Parse a query-style string such as `?config=directory&reset`.
    ///
    /// `reset` and `exclusive` are flags: their presence enables them,
    /// whatever their value. Unknown keys are ignored; for repeated keys the
    /// first occurrence wins.
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        let query = query.strip_prefix('?').unwrap_or(query);

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = value.replace('+', " ");
            let value = match urlencoding::decode(&value) {
                Ok(decoded) => decoded.into_owned(),
                Err(_) => value,
            };
            match key {
                "build" => params.build = params.build.or(Some(value)),
                "config" => params.config = params.config.or(Some(value)),
                "dbName" => params.db_name = params.db_name.or(Some(value)),
                "vfsName" => params.vfs_name = params.vfs_name.or(Some(value)),
                "reset" => params.reset = true,
                "exclusive" => params.exclusive = true,
                other => tracing::debug!(key = other, "Ignoring unknown startup key"),
            }
        }
        params
    }

    /// Overlay `other` on top of `self`; values set in `other` win.
    #[must_use]
    pub fn merge(self, other: StartupParams) -> Self {
        Self {
            build: other.build.or(self.build),
            config: other.config.or(self.config),
            db_name: other.db_name.or(self.db_name),
            vfs_name: other.vfs_name.or(self.vfs_name),
            reset: self.reset || other.reset,
            exclusive: self.exclusive || other.exclusive,
        }
    }
}
