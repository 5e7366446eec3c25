//! Lazy statement streaming.
//!
//! A SQL text may hold any number of statements. [`QueryStream`] prepares
//! them one at a time in source order, steps each to completion, and yields
//! one [`ResultBatch`] per statement that declares at least one column.
//! Statements without columns (DDL, plain DML) run but yield nothing.

use rusqlite::types::ValueRef;
use rusqlite::{Batch, Connection, Statement};
use serde::{Deserialize, Serialize};

use super::EngineError;

/// One column value of a result row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<ValueRef<'_>> for Cell {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Cell::Null,
            ValueRef::Integer(i) => Cell::Integer(i),
            ValueRef::Real(f) => Cell::Real(f),
            ValueRef::Text(t) => Cell::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Cell::Blob(b.to_vec()),
        }
    }
}

/// Columns and rows produced by one statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultBatch {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

/// Lazy, finite, non-restartable sequence of result batches.
///
/// After the first error the stream ends; remaining statements never run.
pub struct QueryStream<'conn, 'sql> {
    statements: Batch<'conn, 'sql>,
    done: bool,
}

impl<'conn, 'sql> QueryStream<'conn, 'sql> {
    pub fn new(conn: &'conn Connection, sql: &'sql str) -> Self {
        Self {
            statements: Batch::new(conn, sql),
            done: false,
        }
    }

    /// Step a statement until it has no more rows.
    fn drain(mut stmt: Statement<'conn>) -> Result<Option<ResultBatch>, EngineError> {
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let width = stmt.column_count();

        let mut rows = Vec::new();
        let mut cursor = stmt.raw_query();
        while let Some(row) = cursor.next()? {
            let cells = (0..width)
                .map(|i| row.get_ref(i).map(Cell::from))
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(cells);
        }

        if columns.is_empty() {
            Ok(None)
        } else {
            Ok(Some(ResultBatch { columns, rows }))
        }
    }

    fn advance(&mut self) -> Result<Option<ResultBatch>, EngineError> {
        while let Some(stmt) = self.statements.next()? {
            if let Some(batch) = Self::drain(stmt)? {
                return Ok(Some(batch));
            }
        }
        Ok(None)
    }
}

impl Iterator for QueryStream<'_, '_> {
    type Item = Result<ResultBatch, EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.advance() {
            Ok(Some(batch)) => Some(Ok(batch)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    fn collect(conn: &Connection, sql: &str) -> Vec<ResultBatch> {
        QueryStream::new(conn, sql)
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_single_select() {
        let conn = conn();
        let batches = collect(&conn, "SELECT 1;");

        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].columns, vec!["1"]);
        assert_eq!(batches[0].rows, vec![vec![Cell::Integer(1)]]);
    }

    #[test]
    fn test_ddl_yields_nothing() {
        let conn = conn();
        assert!(collect(&conn, "CREATE TABLE t(x);").is_empty());
    }

    #[test]
    fn test_statements_in_source_order() {
        let conn = conn();
        let batches = collect(
            &conn,
            "CREATE TABLE t(x, y);
             INSERT INTO t VALUES (1, 'a'), (2, NULL);
             SELECT 1;
             SELECT x, y FROM t ORDER BY x;",
        );

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].columns, vec!["1"]);
        assert_eq!(batches[1].columns, vec!["x", "y"]);
        assert_eq!(
            batches[1].rows,
            vec![
                vec![Cell::Integer(1), Cell::Text("a".into())],
                vec![Cell::Integer(2), Cell::Null],
            ]
        );
    }

    #[test]
    fn test_select_without_rows_still_yields_columns() {
        let conn = conn();
        conn.execute_batch("CREATE TABLE t(x)").unwrap();
        let batches = collect(&conn, "SELECT x FROM t");

        assert_eq!(batches.len(), 1);
        assert!(batches[0].rows.is_empty());
    }

    #[test]
    fn test_stream_is_lazy_and_fused() {
        let conn = conn();
        conn.execute_batch("CREATE TABLE t(x)").unwrap();
        let mut stream = QueryStream::new(
            &conn,
            "SELECT 1; SELECT * FROM missing; INSERT INTO t VALUES (1);",
        );

        assert!(stream.next().unwrap().is_ok());
        assert!(stream.next().unwrap().is_err());
        assert!(stream.next().is_none());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0, "statements after a failure never run");
    }

    #[test]
    fn test_cell_serialization() {
        let row = vec![
            Cell::Null,
            Cell::Integer(7),
            Cell::Real(1.5),
            Cell::Text("x".into()),
            Cell::Blob(vec![1, 2]),
        ];
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"[null,7,1.5,"x",[1,2]]"#);
    }
}
