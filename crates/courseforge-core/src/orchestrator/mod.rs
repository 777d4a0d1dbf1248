//! Request orchestrator: drives one asynchronous generation call at a time.
//!
//! The orchestrator enforces the single-in-flight-call rule (a second call
//! is rejected immediately, never queued), maintains the session-visible
//! operation status, and normalizes gateway failures into user-facing
//! messages. Status cleanup is guaranteed on every exit path, including
//! drop-based cancellation of the running future.

use std::future::Future;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::gateway::GatewayError;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Transient status of the session's current operation.
///
/// A single tagged value instead of a loading flag plus a message string,
/// so impossible combinations (idle with a stale progress label) cannot be
/// represented.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum OperationStatus {
    /// No generation call outstanding.
    Idle,
    /// A generation call is in flight; `label` is a human-readable
    /// progress description (e.g. "generating outline").
    InProgress { label: String },
    /// The last generation call failed; the session stayed in its prior
    /// stage with this message attached.
    Failed { message: String },
}

impl OperationStatus {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::InProgress { .. })
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures surfaced by [`RequestOrchestrator::run`].
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Another generation call is already in flight for this session.
    #[error("another generation request is already in progress")]
    OperationInProgress,

    /// The operation itself failed; `message` is the normalized
    /// user-facing text already recorded in the status cell.
    #[error("generation failed: {message}")]
    Generation {
        message: String,
        #[source]
        source: GatewayError,
    },
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Serialises generation calls and tracks their status.
///
/// Cheap to clone; clones share the same permit and status cell.
#[derive(Debug, Clone)]
pub struct RequestOrchestrator {
    /// One permit: at most one `run` may be active per session.
    permits: Arc<Semaphore>,
    /// Session-visible status, shared with workflow snapshots.
    status: Arc<Mutex<OperationStatus>>,
}

impl Default for RequestOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestOrchestrator {
    pub fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(1)),
            status: Arc::new(Mutex::new(OperationStatus::Idle)),
        }
    }

    /// Current status (cloned out of the shared cell).
    pub fn status(&self) -> OperationStatus {
        self.status
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn set_status(&self, status: OperationStatus) {
        *self.status.lock().unwrap_or_else(|e| e.into_inner()) = status;
    }

    /// Record a failure message in the status cell.
    ///
    /// Used by `run` itself and by the workflow for failures it detects
    /// after a call resolved (e.g. a contract-violating response).
    pub fn record_failure(&self, message: impl Into<String>) {
        self.set_status(OperationStatus::Failed {
            message: message.into(),
        });
    }

    /// Clear a lingering `Failed` status back to `Idle`.
    ///
    /// Leaves an `InProgress` status untouched: only the owning `run`
    /// clears that.
    pub fn clear_failure(&self) {
        let mut status = self.status.lock().unwrap_or_else(|e| e.into_inner());
        if matches!(*status, OperationStatus::Failed { .. }) {
            *status = OperationStatus::Idle;
        }
    }

    /// Drive a single generation call.
    ///
    /// Guarantees:
    /// - at most one call is active; a concurrent call fails immediately
    ///   with [`OrchestratorError::OperationInProgress`] and changes
    ///   nothing;
    /// - the status is `InProgress(label)` before the operation is polled
    ///   and returns to `Idle` on every exit path, including cancellation;
    /// - on failure the status then becomes `Failed` with the normalized
    ///   message (server detail preferred over transport text);
    /// - no retry: the error is returned to the caller once.
    pub async fn run<T, F>(&self, label: &str, operation: F) -> Result<T, OrchestratorError>
    where
        F: Future<Output = Result<T, GatewayError>>,
    {
        let _permit = self
            .permits
            .try_acquire()
            .map_err(|_| OrchestratorError::OperationInProgress)?;

        self.set_status(OperationStatus::InProgress {
            label: label.to_owned(),
        });
        debug!(label, "generation request started");

        // Resets the status to Idle when dropped, which also covers the
        // case where the future owning this `run` is dropped mid-await.
        let reset = StatusReset {
            status: Arc::clone(&self.status),
        };

        let result = operation.await;
        drop(reset);

        match result {
            Ok(value) => {
                debug!(label, "generation request completed");
                Ok(value)
            }
            Err(source) => {
                let message = source.user_message();
                warn!(label, error = %source, "generation request failed");
                self.record_failure(message.clone());
                Err(OrchestratorError::Generation { message, source })
            }
        }
    }
}

/// RAII guard: puts the status back to `Idle` when dropped.
struct StatusReset {
    status: Arc<Mutex<OperationStatus>>,
}

impl Drop for StatusReset {
    fn drop(&mut self) {
        *self.status.lock().unwrap_or_else(|e| e.into_inner()) = OperationStatus::Idle;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
