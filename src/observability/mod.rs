//! Observability infrastructure.
//!
//! Provides structured logging for contexts, locks and driver composition.

pub mod tracing;
