//! Dispatch events and the sinks that receive them.
//!
//! Every dispatch step produces one [`DispatchEvent`]; its `Display` output is
//! the console line for that step. Sinks decide where the lines go.

use std::collections::VecDeque;
use std::fmt;
use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::{ResourceId, WorkIdentity};

/// One event emitted by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEvent {
    /// Dispatcher started with the given parallelism limit.
    Startup {
        /// Configured maximum concurrency.
        parallelism: usize,
    },
    /// A slot was claimed for a unit of work.
    Claimed {
        /// Claiming unit of work.
        identity: WorkIdentity,
        /// Claimed slot.
        resource: ResourceId,
    },
    /// A unit of work finished normally.
    Completed {
        /// Finished unit of work.
        identity: WorkIdentity,
        /// Slot reported by the outcome.
        resource: ResourceId,
        /// Outcome message.
        message: String,
    },
    /// A unit of work observed cancellation and stopped early.
    Interrupted {
        /// Interrupted unit of work.
        identity: WorkIdentity,
        /// Outcome message.
        message: String,
    },
    /// A unit of work failed.
    Faulted {
        /// Failed unit of work.
        identity: WorkIdentity,
        /// Rendered fault.
        error: String,
    },
    /// The target slot was held by another unit of work.
    Contention {
        /// Unit of work that backed off.
        identity: WorkIdentity,
        /// Contended slot.
        resource: ResourceId,
    },
    /// A claimed slot is being returned to the ledger.
    Released {
        /// Unit of work that held the slot.
        identity: WorkIdentity,
        /// Released slot.
        resource: ResourceId,
    },
    /// The dispatch loop observed cancellation and stopped.
    Stopped {
        /// Last identity issued, zero when none was.
        last_identity: WorkIdentity,
    },
    /// The dispatch loop aborted on a structural error.
    Fatal {
        /// Rendered error chain.
        report: String,
    },
}

impl DispatchEvent {
    /// Claim bookkeeping events, hidden from the console by default.
    pub const fn is_instrumentation(&self) -> bool {
        matches!(self, Self::Claimed { .. } | Self::Released { .. })
    }

    /// Identity the event refers to, if any.
    pub const fn identity(&self) -> Option<WorkIdentity> {
        match self {
            Self::Claimed { identity, .. }
            | Self::Completed { identity, .. }
            | Self::Interrupted { identity, .. }
            | Self::Faulted { identity, .. }
            | Self::Contention { identity, .. }
            | Self::Released { identity, .. } => Some(*identity),
            Self::Startup { .. } | Self::Stopped { .. } | Self::Fatal { .. } => None,
        }
    }
}

impl fmt::Display for DispatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Startup { parallelism } => write!(f, "Processor Amount: {parallelism}"),
            Self::Claimed { identity, resource } => {
                write!(f, "Task #{identity} claimed resource #{resource}")
            }
            Self::Completed { message, .. } => f.write_str(message),
            Self::Interrupted { identity, message } => {
                write!(f, "Killing task #{identity}. {message}")
            }
            Self::Faulted { identity, error } => {
                write!(f, "Task#{identity} has an error. Error => {error}")
            }
            Self::Contention { identity, resource } => {
                write!(f, "Task #{identity} CANNOT access resource #{resource}")
            }
            Self::Released { identity, resource } => {
                write!(f, "Task #{identity} released resource #{resource}")
            }
            Self::Stopped { last_identity } => {
                write!(f, "Dispatch stopped after task #{last_identity}")
            }
            Self::Fatal { report } => f.write_str(report),
        }
    }
}

/// Destination for dispatch events.
pub trait EventSink: Send + Sync {
    /// Record one event.
    fn record(&self, event: &DispatchEvent);
}

/// Bounded in-memory sink for tests and inspection.
///
/// Clones share the same buffer.
#[derive(Clone)]
pub struct InMemoryEventSink {
    events: Arc<Mutex<VecDeque<DispatchEvent>>>,
    max_events: usize,
}

impl InMemoryEventSink {
    /// Create a sink keeping at most `max_events`, dropping the oldest.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(max_events.min(1024)))),
            max_events,
        }
    }

    /// Snapshot of stored events, oldest first.
    pub fn events(&self) -> Vec<DispatchEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Stored events rendered as console lines.
    pub fn lines(&self) -> Vec<String> {
        self.events.lock().iter().map(ToString::to_string).collect()
    }
}

impl EventSink for InMemoryEventSink {
    fn record(&self, event: &DispatchEvent) {
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event.clone());
    }
}

/// Writes one line per event to standard output.
#[derive(Debug, Clone, Default)]
pub struct ConsoleEventSink {
    instrumentation: bool,
}

impl ConsoleEventSink {
    /// Console sink that skips claim bookkeeping events.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also print claim/release bookkeeping events.
    #[must_use]
    pub const fn with_instrumentation(mut self, enabled: bool) -> Self {
        self.instrumentation = enabled;
        self
    }

    /// Whether `event` is printed.
    ///
    /// `Fatal` never is: the caller that receives the error renders it.
    pub const fn accepts(&self, event: &DispatchEvent) -> bool {
        match event {
            DispatchEvent::Fatal { .. } => false,
            _ => self.instrumentation || !event.is_instrumentation(),
        }
    }
}

impl EventSink for ConsoleEventSink {
    fn record(&self, event: &DispatchEvent) {
        if !self.accepts(event) {
            return;
        }
        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{event}") {
            tracing::debug!("console sink write failed: {}", e);
        }
    }
}

/// Forwards events to `tracing` at a level matching their severity.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn record(&self, event: &DispatchEvent) {
        match event {
            DispatchEvent::Fatal { .. } => tracing::error!(target: "slot_dispatch::events", "{event}"),
            DispatchEvent::Faulted { identity, .. } => {
                tracing::warn!(target: "slot_dispatch::events", identity, "{event}");
            }
            DispatchEvent::Contention { identity, resource } => {
                tracing::debug!(target: "slot_dispatch::events", identity, resource, "{event}");
            }
            DispatchEvent::Claimed { .. } | DispatchEvent::Released { .. } => {
                tracing::trace!(target: "slot_dispatch::events", "{event}");
            }
            _ => tracing::info!(target: "slot_dispatch::events", "{event}"),
        }
    }
}

/// Sends each event to every inner sink in order.
#[derive(Clone, Default)]
pub struct FanoutEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutEventSink {
    /// Create an empty fan-out.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink.
    #[must_use]
    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for FanoutEventSink {
    fn record(&self, event: &DispatchEvent) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }
}
