//! Error envelopes for crossing the execution context boundary.
//!
//! A failure inside a context may carry anything: an error code, a path,
//! or a reference to a live driver. Only plain data can be sent back to
//! the caller, so every failure is converted into an [`ErrorEnvelope`]
//! whose properties have each passed [`is_cloneable`]. Properties that
//! fail the probe are dropped; marshaling itself never fails.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error as StdError;
use std::fmt::Write as _;

/// Names that always come from the error itself, never from its properties.
const RESERVED: [&str; 3] = ["name", "message", "stack"];

/// A value attached to an error as a named property.
#[derive(Debug, Clone)]
pub enum PropertyValue {
    /// Plain data.
    Data(Value),
    /// A live resource (driver, connection, lock). Cannot leave the context.
    Resource(String),
    /// Ordered collection of values.
    List(Vec<PropertyValue>),
    /// Nested named values.
    Map(Vec<(String, PropertyValue)>),
}

impl PropertyValue {
    /// Shorthand for a plain data property.
    pub fn data(value: impl Into<Value>) -> Self {
        Self::Data(value.into())
    }

    /// Converts a value that passed [`is_cloneable`] into plain data.
    fn into_data(self) -> Option<Value> {
        match self {
            Self::Data(value) => Some(value),
            Self::Resource(_) => None,
            Self::List(items) => items
                .into_iter()
                .map(Self::into_data)
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            Self::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| v.into_data().map(|v| (k, v)))
                .collect::<Option<Map<_, _>>>()
                .map(Value::Object),
        }
    }
}

/// Probe deciding whether a property value may cross the context boundary.
///
/// Containers are cloneable only if every element is.
pub fn is_cloneable(value: &PropertyValue) -> bool {
    match value {
        PropertyValue::Data(_) => true,
        PropertyValue::Resource(_) => false,
        PropertyValue::List(items) => items.iter().all(is_cloneable),
        PropertyValue::Map(entries) => entries.iter().all(|(_, v)| is_cloneable(v)),
    }
}

/// An error that can be converted into an [`ErrorEnvelope`].
pub trait Marshal: StdError {
    /// Error class name, e.g. `"SQLiteError"`.
    fn error_name(&self) -> &'static str;

    /// The error's own properties beyond name, message and stack.
    fn properties(&self) -> Vec<(String, PropertyValue)> {
        Vec::new()
    }
}

/// Plain-data form of an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub name: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

/// A failure as raised inside a context.
#[derive(Debug)]
pub enum Failure {
    /// An error value.
    Error(Box<dyn Marshal + Send + Sync>),
    /// Anything that is not an error (for example a panic payload).
    Value(Value),
}

/// A failure after marshaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Marshaled {
    Envelope(ErrorEnvelope),
    Value(Value),
}

/// Render the source chain of an error as a stack, if it has one.
fn stack_of<E: StdError + ?Sized>(err: &E) -> Option<String> {
    let mut source = err.source()?;
    let mut stack = String::new();
    let _ = write!(stack, "{err}");
    loop {
        let _ = write!(stack, "\n    caused by: {source}");
        match source.source() {
            Some(next) => source = next,
            None => break,
        }
    }
    Some(stack)
}

/// Convert an error into an envelope, dropping properties that cannot be cloned.
pub fn to_envelope<E: Marshal + ?Sized>(err: &E) -> ErrorEnvelope {
    let mut properties = Map::new();
    for (key, value) in err.properties() {
        if RESERVED.contains(&key.as_str()) || properties.contains_key(&key) {
            continue;
        }
        if !is_cloneable(&value) {
            tracing::trace!(property = %key, "Dropping non-cloneable error property");
            continue;
        }
        if let Some(value) = value.into_data() {
            properties.insert(key, value);
        }
    }

    ErrorEnvelope {
        name: err.error_name().to_string(),
        message: err.to_string(),
        stack: stack_of(err),
        properties,
    }
}

/// Marshal any failure. Non-error values pass through unchanged.
pub fn marshal(failure: Failure) -> Marshaled {
    match failure {
        Failure::Error(err) => Marshaled::Envelope(to_envelope(err.as_ref())),
        Failure::Value(value) => Marshaled::Value(value),
    }
}

impl<E: Marshal + Send + Sync + 'static> From<E> for Failure {
    fn from(err: E) -> Self {
        Failure::Error(Box::new(err))
    }
}
