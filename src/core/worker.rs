//! Worker abstraction and the outcome it reports.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::{CancellationSignal, WorkerFault};

/// Identity assigned to each dispatched unit of work. Strictly increasing.
pub type WorkIdentity = u64;

/// Identifier of an exclusive resource slot.
pub type ResourceId = u32;

/// Result of a unit of work that ran to a normal end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Human-readable report line.
    pub message: String,
    /// Slot to release, or `None` when there is nothing to release.
    pub resource: Option<ResourceId>,
}

impl Outcome {
    /// Outcome of work that used `resource` and finished.
    pub fn completed(identity: WorkIdentity, resource: ResourceId) -> Self {
        Self {
            message: format!("Task #{identity} is using resource #{resource}"),
            resource: Some(resource),
        }
    }

    /// Outcome of work that observed cancellation before using its resource.
    pub fn interrupted(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            resource: None,
        }
    }

    /// Whether this outcome carries the "nothing to release" sentinel.
    pub const fn is_interrupted(&self) -> bool {
        self.resource.is_none()
    }
}

/// A unit of work run by the dispatcher once it holds a permit and a claim.
///
/// Observed cancellation is an expected end and must be reported as an
/// [`Outcome::interrupted`], not as a fault. Any `Err` (or panic) is a fault.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use slot_dispatch::core::{CancellationSignal, Outcome, ResourceId, WorkIdentity, Worker, WorkerFault};
///
/// #[derive(Clone)]
/// struct Render;
///
/// #[async_trait]
/// impl Worker for Render {
///     async fn perform(
///         &self,
///         identity: WorkIdentity,
///         resource: ResourceId,
///         signal: CancellationSignal,
///     ) -> Result<Outcome, WorkerFault> {
///         if signal.is_requested() {
///             return Ok(Outcome::interrupted(format!("task #{identity} skipped")));
///         }
///         Ok(Outcome::completed(identity, resource))
///     }
/// }
/// ```
#[async_trait]
pub trait Worker: Send + Sync + Clone + 'static {
    /// Perform the work for `identity` while holding `resource`.
    async fn perform(
        &self,
        identity: WorkIdentity,
        resource: ResourceId,
        signal: CancellationSignal,
    ) -> Result<Outcome, WorkerFault>;
}

/// Fixed-duration stand-in for real work.
///
/// Checks the cancellation signal once before starting. The delay itself does
/// not observe cancellation, so work that has started always runs to the end.
#[derive(Debug, Clone)]
pub struct SimulatedWork {
    duration: Duration,
}

impl SimulatedWork {
    /// Create simulated work lasting `duration`.
    pub const fn new(duration: Duration) -> Self {
        Self { duration }
    }

    /// Duration of each unit of work.
    pub const fn duration(&self) -> Duration {
        self.duration
    }
}

#[async_trait]
impl Worker for SimulatedWork {
    async fn perform(
        &self,
        identity: WorkIdentity,
        resource: ResourceId,
        signal: CancellationSignal,
    ) -> Result<Outcome, WorkerFault> {
        if signal.is_requested() {
            tracing::debug!("task {} observed cancellation before starting", identity);
            return Ok(Outcome::interrupted(format!(
                "Task #{identity} was cancelled before using resource #{resource}"
            )));
        }
        tokio::time::sleep(self.duration).await;
        Ok(Outcome::completed(identity, resource))
    }
}
