//! Execution context threads.
//!
//! Each context runs on its own OS thread with a single-threaded runtime:
//! everything inside a context is cooperative, and contexts only interact
//! through the shared lock service and the storage namespace.
//!
//! The thread owns the database connection for its whole life. Callers talk
//! to it through a [`ContextHandle`]: SQL text goes into the inbox, exactly
//! one [`Response`] comes back per request, preceded by a single ready (or
//! startup failure) message.

use futures::FutureExt;
use rusqlite::Connection;
use std::panic::AssertUnwindSafe;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc;
use tracing::Instrument;

use super::protocol::Response;
use super::startup::startup;
use super::{ContextError, Environment};
use crate::config::StartupParams;
use crate::generate_context_id;
use crate::marshal::Marshaled;
use crate::query;

/// Default capacity of a context's inbox and outbox.
pub const DEFAULT_CHANNEL_SIZE: usize = 16;

/// Spawns execution contexts.
pub struct ExecutionContext;

impl ExecutionContext {
    /// Start a context thread.
    ///
    /// Startup runs in the background; wait for it with [`ContextHandle::ready`].
    pub fn spawn(
        env: Environment,
        params: StartupParams,
        channel_size: usize,
    ) -> Result<ContextHandle, ContextError> {
        let id = generate_context_id();
        let (inbox_tx, inbox_rx) = mpsc::channel::<String>(channel_size);
        let (outbox_tx, outbox_rx) = mpsc::channel::<Response>(channel_size);

        let thread_id = id.clone();
        let thread = thread::Builder::new()
            .name(format!("sqlbox-ctx-{}", &id[id.len() - 8..]))
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        let _ = outbox_tx.blocking_send(Response::failure(ContextError::Spawn(e)));
                        return;
                    }
                };

                let span = tracing::info_span!("context", id = %thread_id);
                runtime.block_on(run(env, params, inbox_rx, outbox_tx).instrument(span));
            })?;

        Ok(ContextHandle {
            id,
            inbox: Some(inbox_tx),
            outbox: outbox_rx,
            thread: Some(thread),
        })
    }
}

/// Body of a context thread.
async fn run(
    env: Environment,
    params: StartupParams,
    mut inbox: mpsc::Receiver<String>,
    outbox: mpsc::Sender<Response>,
) {
    let started = match startup(&env, &params).await {
        Ok(started) => started,
        Err(e) => {
            tracing::error!(error = %e, "Context startup failed");
            let _ = outbox.send(Response::failure(e)).await;
            return;
        }
    };

    if outbox.send(Response::Ready).await.is_err() {
        return;
    }

    while let Some(sql) = inbox.recv().await {
        let response = handle_request(&started.conn, &sql).await;
        if outbox.send(response).await.is_err() {
            break;
        }
    }

    tracing::info!("Context inbox closed, shutting down");
    // Connection first, then the inner lock.
    drop(started.conn);
    drop(started.inner_lock);
}

/// Execute one request. Failures, panics included, become error responses.
#[tracing::instrument(skip(conn, sql), fields(sql_len = sql.len()))]
async fn handle_request(conn: &Connection, sql: &str) -> Response {
    match AssertUnwindSafe(query::execute(conn, sql)).catch_unwind().await {
        Ok(Ok(output)) => {
            tracing::debug!(
                batches = output.results.len(),
                elapsed = output.elapsed,
                "Request completed"
            );
            Response::Results(output)
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Request failed");
            Response::failure(e)
        }
        Err(payload) => {
            tracing::error!("Request panicked");
            Response::panicked(payload)
        }
    }
}

/// Caller side of an execution context.
pub struct ContextHandle {
    id: String,
    inbox: Option<mpsc::Sender<String>>,
    outbox: mpsc::Receiver<Response>,
    thread: Option<JoinHandle<()>>,
}

impl ContextHandle {
    /// Context identifier (UUIDv7).
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the startup result.
    ///
    /// Must be called once, before the first request.
    pub async fn ready(&mut self) -> Result<(), Marshaled> {
        match self.outbox.recv().await {
            Some(Response::Ready) => Ok(()),
            Some(Response::Error { error }) => Err(error),
            Some(other) => Err(Marshaled::Value(serde_json::json!({
                "unexpected": serde_json::to_value(&other).unwrap_or_default(),
            }))),
            None => Err(crate::marshal::marshal(ContextError::Closed.into())),
        }
    }

    /// Queue SQL text for execution.
    pub async fn send(&self, sql: impl Into<String>) -> Result<(), ContextError> {
        let inbox = self.inbox.as_ref().ok_or(ContextError::Closed)?;
        inbox
            .send(sql.into())
            .await
            .map_err(|_| ContextError::Closed)
    }

    /// Next outbound message, `None` once the context has stopped.
    pub async fn recv(&mut self) -> Option<Response> {
        self.outbox.recv().await
    }

    /// Send SQL text and wait for its response.
    pub async fn request(&mut self, sql: impl Into<String>) -> Result<Response, ContextError> {
        self.send(sql).await?;
        self.recv().await.ok_or(ContextError::Closed)
    }

    /// Close the inbox and wait for the context thread to finish.
    pub async fn shutdown(mut self) -> Result<(), ContextError> {
        self.inbox.take();
        while self.outbox.recv().await.is_some() {}

        if let Some(thread) = self.thread.take() {
            tokio::task::spawn_blocking(move || thread.join())
                .await
                .map_err(|_| ContextError::ThreadPanic)?
                .map_err(|_| ContextError::ThreadPanic)?;
        }
        Ok(())
    }
}
