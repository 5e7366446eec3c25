//! Messages leaving an execution context.
//!
//! ```text
//!   ready:    null
//!   success:  { "results": [ { "columns": [...], "rows": [[...]] } ], "elapsed": 0.003 }
//!   failure:  { "error": { "name": ..., "message": ..., "stack": ..., ... } }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;

use crate::marshal::{marshal, Failure, Marshal, Marshaled};
use crate::query::QueryOutput;

/// One outbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    /// Startup finished; sent once before any other response.
    Ready,
    Results(QueryOutput),
    Error { error: Marshaled },
}

impl Response {
    /// Wrap an error for the caller.
    pub fn failure<E: Marshal + Send + Sync + 'static>(err: E) -> Self {
        Self::Error {
            error: marshal(Failure::from(err)),
        }
    }

    /// Wrap a panic payload for the caller.
    pub fn panicked(payload: Box<dyn Any + Send>) -> Self {
        let value = match payload.downcast::<String>() {
            Ok(message) => Value::String(*message),
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(message) => Value::String((*message).to_string()),
                Err(_) => Value::Null,
            },
        };
        Self::Error {
            error: marshal(Failure::Value(value)),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// The query output, if this is a success response.
    pub fn into_output(self) -> Option<QueryOutput> {
        match self {
            Self::Results(output) => Some(output),
            _ => None,
        }
    }

    /// The marshaled error, if this is a failure response.
    pub fn error(&self) -> Option<&Marshaled> {
        match self {
            Self::Error { error } => Some(error),
            _ => None,
        }
    }
}
