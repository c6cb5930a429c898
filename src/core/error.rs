//! Error types for dispatcher operations.

use thiserror::Error;

use crate::core::WorkIdentity;

/// Structural errors that abort the dispatch loop.
///
/// Per-unit failures never surface here; they are contained at the worker
/// completion boundary and reported as [`WorkerFault`]s.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The concurrency gate was closed while the loop waited for a permit.
    #[error("concurrency gate closed")]
    GateClosed,
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// `run` was called on a dispatcher that has already run.
    #[error("dispatcher already started")]
    AlreadyStarted,
    /// Runtime-level failure with context.
    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Failure raised by a worker while performing its unit of work.
#[derive(Debug, Error)]
pub enum WorkerFault {
    /// The worker reported a failure of its own.
    #[error("{0}")]
    Failed(String),
    /// The worker task panicked.
    #[error("worker for task #{identity} panicked: {message}")]
    Panicked {
        /// Identity of the panicked unit of work.
        identity: WorkIdentity,
        /// Panic payload, when it was a string.
        message: String,
    },
    /// The worker task was aborted before it finished.
    #[error("worker for task #{0} was aborted")]
    Aborted(WorkIdentity),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
