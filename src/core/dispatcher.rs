//! The dispatch loop.
//!
//! While cancellation has not been requested the dispatcher takes a permit
//! from the [`ConcurrencyGate`], issues the next [`WorkIdentity`], maps it to a
//! slot and tries to claim that slot in the [`ResourceLedger`]. A successful
//! claim starts a [`Worker`] on its own task; a failed claim backs off and
//! returns the permit.
//!
//! Every worker runs behind an explicit task handle. A completion task awaits
//! that handle and runs exactly one of two paths:
//!
//! - **finished**: report the outcome, release the slot when the outcome names
//!   one, return the permit;
//! - **faulted** (error or panic): report the fault, release the slot only under
//!   [`FaultPolicy::ReleaseClaim`], return the permit.
//!
//! Completion tasks live in a `JoinSet`, so once the loop stops it can wait
//! for in-flight work to drain before returning its [`DispatchReport`].

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use crate::config::{DispatcherConfig, FaultPolicy};
use crate::core::{
    CancellationSignal, ConcurrencyGate, DispatchError, DispatchEvent, EventSink, GatePermit,
    Outcome, ResourceId, ResourceLedger, TracingEventSink, WorkIdentity, Worker, WorkerFault,
};
use crate::util::error_chain::format_error_chain;

/// Lifecycle of a dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatcherState {
    /// Built but never run.
    Idle,
    /// The dispatch loop is issuing work.
    Running,
    /// The loop has exited. Terminal.
    Stopped,
}

impl DispatcherState {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Idle,
            1 => Self::Running,
            _ => Self::Stopped,
        }
    }
}

/// Summary of one dispatch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    /// Run identifier, also attached to the tracing span.
    pub run_id: String,
    /// Last identity issued; zero when none was.
    pub last_identity: WorkIdentity,
    /// Workers started after a successful claim.
    pub dispatched: u64,
    /// Workers that finished with a resource outcome.
    pub completed: u64,
    /// Workers that returned the "nothing to release" sentinel.
    pub interrupted: u64,
    /// Workers that failed or panicked.
    pub faulted: u64,
    /// Iterations that lost the claim and backed off.
    pub contended: u64,
    /// Largest number of permits held at once.
    pub peak_outstanding: usize,
    /// Slots still claimed after in-flight work drained.
    pub stranded: Vec<(ResourceId, WorkIdentity)>,
}

/// Lock-free run counters shared with completion tasks.
#[derive(Debug, Default)]
struct DispatchCounters {
    dispatched: AtomicU64,
    completed: AtomicU64,
    interrupted: AtomicU64,
    faulted: AtomicU64,
    contended: AtomicU64,
}

impl DispatchCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// How a spawned worker ended.
enum Completion {
    Finished(Outcome),
    Faulted(WorkerFault),
}

impl Completion {
    fn from_join(identity: WorkIdentity, joined: Result<Result<Outcome, WorkerFault>, JoinError>) -> Self {
        match joined {
            Ok(Ok(outcome)) => Self::Finished(outcome),
            Ok(Err(fault)) => Self::Faulted(fault),
            Err(join_err) if join_err.is_panic() => {
                let payload = join_err.into_panic();
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".into());
                Self::Faulted(WorkerFault::Panicked { identity, message })
            }
            Err(_) => Self::Faulted(WorkerFault::Aborted(identity)),
        }
    }
}

/// State a completion task needs once its worker has ended.
#[derive(Clone)]
struct CompletionContext {
    ledger: Arc<ResourceLedger>,
    sink: Arc<dyn EventSink>,
    counters: Arc<DispatchCounters>,
    fault_policy: FaultPolicy,
}

impl CompletionContext {
    fn finish(&self, identity: WorkIdentity, claimed: ResourceId, completion: Completion, permit: GatePermit) {
        match completion {
            Completion::Finished(outcome) => match outcome.resource {
                Some(reported) => {
                    if reported != claimed {
                        warn!(
                            "task {} reported resource {} but holds {}",
                            identity, reported, claimed
                        );
                    }
                    DispatchCounters::bump(&self.counters.completed);
                    self.sink.record(&DispatchEvent::Completed {
                        identity,
                        resource: reported,
                        message: outcome.message,
                    });
                    self.release_claim(identity, claimed);
                }
                None => {
                    DispatchCounters::bump(&self.counters.interrupted);
                    self.sink.record(&DispatchEvent::Interrupted {
                        identity,
                        message: outcome.message,
                    });
                    self.apply_fault_policy(identity, claimed);
                }
            },
            Completion::Faulted(fault) => {
                DispatchCounters::bump(&self.counters.faulted);
                warn!("task {} faulted: {}", identity, fault);
                self.sink.record(&DispatchEvent::Faulted {
                    identity,
                    error: fault.to_string(),
                });
                self.apply_fault_policy(identity, claimed);
            }
        }
        permit.release();
    }

    fn apply_fault_policy(&self, identity: WorkIdentity, claimed: ResourceId) {
        match self.fault_policy {
            FaultPolicy::ReleaseClaim => self.release_claim(identity, claimed),
            FaultPolicy::RetainClaim => {
                warn!("resource {} stays claimed by task {}", claimed, identity);
            }
        }
    }

    fn release_claim(&self, identity: WorkIdentity, resource: ResourceId) {
        // The event goes out before the slot is freed so that, in any sink,
        // a slot's release always precedes its next claim.
        self.sink.record(&DispatchEvent::Released { identity, resource });
        self.ledger.release(resource);
    }
}

/// Bounded-concurrency dispatcher over exclusive resource slots.
pub struct Dispatcher<W: Worker> {
    run_id: Uuid,
    worker: W,
    gate: ConcurrencyGate,
    ledger: Arc<ResourceLedger>,
    signal: CancellationSignal,
    sink: Arc<dyn EventSink>,
    counters: Arc<DispatchCounters>,
    next_identity: AtomicU64,
    state: AtomicU8,
    resource_count: u32,
    contention_backoff: Duration,
    fault_policy: FaultPolicy,
    max_dispatches: Option<u64>,
}

impl<W: Worker> Dispatcher<W> {
    /// Create a dispatcher from validated configuration.
    ///
    /// Events go to a [`TracingEventSink`] until [`with_sink`](Self::with_sink)
    /// replaces it.
    pub fn new(config: &DispatcherConfig, worker: W) -> Result<Self, DispatchError> {
        config.validate().map_err(DispatchError::InvalidConfig)?;
        Ok(Self {
            run_id: Uuid::new_v4(),
            worker,
            gate: ConcurrencyGate::new(config.max_concurrency)?,
            ledger: Arc::new(ResourceLedger::new()),
            signal: CancellationSignal::new(),
            sink: Arc::new(TracingEventSink),
            counters: Arc::new(DispatchCounters::default()),
            next_identity: AtomicU64::new(0),
            state: AtomicU8::new(0),
            resource_count: config.resource_count,
            contention_backoff: config.contention_backoff(),
            fault_policy: config.fault_policy,
            max_dispatches: config.max_dispatches,
        })
    }

    /// Route events to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Share an existing cancellation signal.
    #[must_use]
    pub fn with_signal(mut self, signal: CancellationSignal) -> Self {
        self.signal = signal;
        self
    }

    /// Cancellation signal observed by the loop and its workers.
    pub const fn signal(&self) -> &CancellationSignal {
        &self.signal
    }

    /// The permit pool.
    pub const fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    /// The slot ledger.
    pub fn ledger(&self) -> Arc<ResourceLedger> {
        Arc::clone(&self.ledger)
    }

    /// Run identifier.
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DispatcherState {
        DispatcherState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Last identity issued; zero when none was.
    pub fn last_identity(&self) -> WorkIdentity {
        self.next_identity.load(Ordering::Acquire)
    }

    /// Slot targeted by `identity`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn resource_for(&self, identity: WorkIdentity) -> ResourceId {
        // remainder is below resource_count, which is a u32
        (identity % u64::from(self.resource_count)) as ResourceId
    }

    /// Run the dispatch loop until cancellation, then drain in-flight work.
    ///
    /// Per-unit failures are reported through the sink and never end the
    /// run. A structural failure is reported as a `Fatal` event and returned.
    ///
    /// A dispatcher runs once. Later calls return
    /// [`DispatchError::AlreadyStarted`] without emitting any event.
    pub async fn run(&self) -> Result<DispatchReport, DispatchError> {
        let span = tracing::info_span!("dispatch", run_id = %self.run_id);
        self.run_inner().instrument(span).await
    }

    async fn run_inner(&self) -> Result<DispatchReport, DispatchError> {
        if self
            .state
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("dispatcher already started, state {:?}", self.state());
            return Err(DispatchError::AlreadyStarted);
        }
        info!(
            "dispatcher starting: max_concurrency={}, resources={}",
            self.gate.capacity(),
            self.resource_count
        );
        self.sink.record(&DispatchEvent::Startup {
            parallelism: self.gate.capacity(),
        });

        let mut in_flight = JoinSet::new();
        let result = self.dispatch_loop(&mut in_flight).await;
        self.state.store(2, Ordering::Release);

        debug!("draining {} in-flight workers", in_flight.len());
        while let Some(joined) = in_flight.join_next().await {
            Self::log_completion_task(joined);
        }

        match result {
            Ok(()) => {
                let last_identity = self.last_identity();
                self.sink.record(&DispatchEvent::Stopped { last_identity });
                info!("dispatcher stopped after task {}", last_identity);
                Ok(self.report())
            }
            Err(e) => {
                error!("dispatch loop aborted: {}", e);
                self.sink.record(&DispatchEvent::Fatal {
                    report: format_error_chain(&e),
                });
                Err(e)
            }
        }
    }

    async fn dispatch_loop(&self, in_flight: &mut JoinSet<()>) -> Result<(), DispatchError> {
        loop {
            if self.signal.is_requested() {
                info!("cancellation observed, dispatch stopping");
                return Ok(());
            }
            if self.limit_reached() {
                info!("dispatch limit of {} reached", self.last_identity());
                return Ok(());
            }

            let permit = tokio::select! {
                biased;
                permit = self.gate.acquire() => permit?,
                () = self.signal.cancelled() => continue,
            };

            let identity = self.next_identity.fetch_add(1, Ordering::AcqRel) + 1;
            let resource = self.resource_for(identity);

            if self.ledger.try_claim(resource, identity) {
                self.sink.record(&DispatchEvent::Claimed { identity, resource });
                DispatchCounters::bump(&self.counters.dispatched);
                self.spawn_worker(in_flight, identity, resource, permit);
            } else {
                DispatchCounters::bump(&self.counters.contended);
                self.sink
                    .record(&DispatchEvent::Contention { identity, resource });
                tokio::time::sleep(self.contention_backoff).await;
                permit.release();
            }

            while let Some(joined) = in_flight.try_join_next() {
                Self::log_completion_task(joined);
            }
        }
    }

    /// The limit stops the loop like cancellation does, but without
    /// signalling workers, so in-flight work is never interrupted by it.
    fn limit_reached(&self) -> bool {
        self.max_dispatches
            .is_some_and(|max| self.last_identity() >= max)
    }

    fn spawn_worker(
        &self,
        in_flight: &mut JoinSet<()>,
        identity: WorkIdentity,
        resource: ResourceId,
        permit: GatePermit,
    ) {
        let worker = self.worker.clone();
        let signal = self.signal.clone();
        let ctx = CompletionContext {
            ledger: Arc::clone(&self.ledger),
            sink: Arc::clone(&self.sink),
            counters: Arc::clone(&self.counters),
            fault_policy: self.fault_policy,
        };

        debug!("starting task {} on resource {}", identity, resource);
        let handle = tokio::spawn(
            async move { worker.perform(identity, resource, signal).await }.in_current_span(),
        );
        in_flight.spawn(
            async move {
                let completion = Completion::from_join(identity, handle.await);
                ctx.finish(identity, resource, completion, permit);
            }
            .in_current_span(),
        );
    }

    fn log_completion_task(joined: Result<(), JoinError>) {
        if let Err(e) = joined {
            error!("completion task failed: {}", e);
        }
    }

    fn report(&self) -> DispatchReport {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        DispatchReport {
            run_id: self.run_id.to_string(),
            last_identity: self.last_identity(),
            dispatched: load(&self.counters.dispatched),
            completed: load(&self.counters.completed),
            interrupted: load(&self.counters.interrupted),
            faulted: load(&self.counters.faulted),
            contended: load(&self.counters.contended),
            peak_outstanding: self.gate.peak_outstanding(),
            stranded: self.ledger.held(),
        }
    }
}
