//! Core dispatch abstractions: permits, slots, cancellation, workers and the loop.

pub mod cancellation;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod gate;
pub mod ledger;
pub mod worker;

pub use cancellation::CancellationSignal;
pub use dispatcher::{DispatchReport, Dispatcher, DispatcherState};
pub use error::{AppResult, DispatchError, WorkerFault};
pub use events::{
    ConsoleEventSink, DispatchEvent, EventSink, FanoutEventSink, InMemoryEventSink,
    TracingEventSink,
};
pub use gate::{ConcurrencyGate, GatePermit};
pub use ledger::ResourceLedger;
pub use worker::{Outcome, ResourceId, SimulatedWork, WorkIdentity, Worker};
