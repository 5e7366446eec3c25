//! Statement streaming and timed execution.
//!
//! Provides:
//! - [`QueryStream`]: lazy per-statement result batches over multi-statement SQL
//! - [`execute`]: drains a stream and measures elapsed wall-clock time

pub mod stream;

pub use stream::{Cell, QueryStream, ResultBatch};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::marshal::{Marshal, PropertyValue};

/// SQL execution or stepping failure, scoped to one request.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct EngineError(#[from] rusqlite::Error);

impl EngineError {
    /// SQLite extended result code, when the failure came from SQLite.
    pub fn code(&self) -> Option<i32> {
        extended_code(&self.0)
    }
}

impl Marshal for EngineError {
    fn error_name(&self) -> &'static str {
        "SQLiteError"
    }

    fn properties(&self) -> Vec<(String, PropertyValue)> {
        self.code()
            .map(|code| vec![("code".to_string(), PropertyValue::data(code))])
            .unwrap_or_default()
    }
}

/// SQLite extended result code carried by a rusqlite error.
pub fn extended_code(e: &rusqlite::Error) -> Option<i32> {
    match e {
        rusqlite::Error::SqliteFailure(err, _) => Some(err.extended_code),
        _ => None,
    }
}

/// Result of executing one SQL text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOutput {
    pub results: Vec<ResultBatch>,
    /// Seconds, truncated to whole milliseconds.
    pub elapsed: f64,
}

/// Convert a duration to seconds with millisecond granularity.
pub fn truncate_elapsed(elapsed: Duration) -> f64 {
    elapsed.as_millis() as f64 / 1000.0
}

/// Execute every statement of `sql` in order.
///
/// Yields to the scheduler between statements. The first failure aborts the
/// remaining statements and discards the batches collected so far.
pub async fn execute(conn: &Connection, sql: &str) -> Result<QueryOutput, EngineError> {
    let start = Instant::now();

    let mut results = Vec::new();
    for batch in QueryStream::new(conn, sql) {
        results.push(batch?);
        tokio::task::yield_now().await;
    }

    Ok(QueryOutput {
        results,
        elapsed: truncate_elapsed(start.elapsed()),
    })
}
