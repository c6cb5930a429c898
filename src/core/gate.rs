//! Concurrency gate bounding the number of in-flight units of work.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

use crate::core::DispatchError;

struct GateInner {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    /// High-water mark of outstanding permits.
    peak: AtomicUsize,
}

/// Bounds in-flight work to a fixed number of permits.
///
/// Permits are handed out as [`GatePermit`] guards. A guard returns its
/// permit exactly once, either through [`GatePermit::release`] or when it is
/// dropped, so a permit can neither leak on an error path nor be returned
/// twice. Cloning the gate shares the same permit pool.
#[derive(Clone)]
pub struct ConcurrencyGate {
    inner: Arc<GateInner>,
}

impl std::fmt::Debug for ConcurrencyGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrencyGate")
            .field("capacity", &self.inner.capacity)
            .field("available", &self.available())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl ConcurrencyGate {
    /// Create a gate with `capacity` permits.
    pub fn new(capacity: usize) -> Result<Self, DispatchError> {
        if capacity == 0 {
            return Err(DispatchError::InvalidConfig(
                "gate capacity must be greater than 0".into(),
            ));
        }
        if capacity > Semaphore::MAX_PERMITS {
            return Err(DispatchError::InvalidConfig(format!(
                "gate capacity {capacity} exceeds {}",
                Semaphore::MAX_PERMITS
            )));
        }
        Ok(Self {
            inner: Arc::new(GateInner {
                semaphore: Arc::new(Semaphore::new(capacity)),
                capacity,
                peak: AtomicUsize::new(0),
            }),
        })
    }

    /// Create a gate sized to the host's available execution units.
    pub fn with_available_parallelism() -> Result<Self, DispatchError> {
        Self::new(num_cpus::get())
    }

    /// Wait until a permit is free and take it.
    ///
    /// Fails only when the gate has been closed.
    pub async fn acquire(&self) -> Result<GatePermit, DispatchError> {
        let permit = Arc::clone(&self.inner.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| DispatchError::GateClosed)?;
        Ok(self.track(permit))
    }

    /// Take a permit without waiting, if one is free.
    pub fn try_acquire(&self) -> Result<Option<GatePermit>, DispatchError> {
        match Arc::clone(&self.inner.semaphore).try_acquire_owned() {
            Ok(permit) => Ok(Some(self.track(permit))),
            Err(TryAcquireError::NoPermits) => Ok(None),
            Err(TryAcquireError::Closed) => Err(DispatchError::GateClosed),
        }
    }

    fn track(&self, permit: OwnedSemaphorePermit) -> GatePermit {
        let outstanding = self.outstanding();
        self.inner.peak.fetch_max(outstanding, Ordering::AcqRel);
        tracing::trace!("permit acquired, outstanding: {}", outstanding);
        GatePermit { _permit: permit }
    }

    /// Close the gate; pending and future acquisitions fail.
    ///
    /// Outstanding permits are unaffected and still return normally.
    pub fn close(&self) {
        self.inner.semaphore.close();
    }

    /// Whether the gate has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.semaphore.is_closed()
    }

    /// Configured number of permits.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Permits currently free.
    pub fn available(&self) -> usize {
        self.inner.semaphore.available_permits()
    }

    /// Permits currently held.
    pub fn outstanding(&self) -> usize {
        self.inner.capacity.saturating_sub(self.available())
    }

    /// Largest number of permits ever held at once.
    pub fn peak_outstanding(&self) -> usize {
        self.inner.peak.load(Ordering::Acquire)
    }
}

/// One unit of the concurrency budget.
///
/// Returning the permit is a total operation: it cannot fail and happens
/// exactly once, on [`release`](Self::release) or drop.
#[must_use = "dropping a permit returns it to the gate immediately"]
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

impl GatePermit {
    /// Return the permit to its gate.
    pub fn release(self) {
        drop(self);
    }
}
