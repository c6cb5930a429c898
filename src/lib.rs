//! # Slot Dispatch
//!
//! A bounded-concurrency dispatcher over a small set of exclusive resource
//! slots, with cooperative cancellation.
//!
//! The dispatcher launches units of work up to a fixed parallelism limit.
//! Each unit is assigned a strictly increasing identity, maps that identity to
//! one of `resource_count` slots, and runs only if it can claim the slot. A
//! unit that loses the claim backs off and gives its permit back; a unit that
//! wins it runs, reports an outcome, and frees the slot and the permit.
//!
//! ## Key Pieces
//!
//! - **`ConcurrencyGate`**: permit pool; permits return exactly once via guards
//! - **`ResourceLedger`**: atomic claim-if-free / release over slot ids
//! - **`CancellationSignal`**: one-shot stop flag shared with every worker
//! - **`Worker`**: the unit of work; `SimulatedWork` is the built-in one
//! - **`Dispatcher`**: the control loop tying the above together
//! - **`EventSink`**: where dispatch events (console lines) go
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use slot_dispatch::builders::build_simulated_dispatcher;
//! use slot_dispatch::config::DispatcherConfig;
//! use slot_dispatch::core::{CancellationSignal, ConsoleEventSink};
//!
//! let cfg = DispatcherConfig::new()
//!     .with_max_concurrency(4)
//!     .with_worker_duration_ms(250)
//!     .with_max_dispatches(20);
//! let dispatcher = build_simulated_dispatcher(
//!     &cfg,
//!     Arc::new(ConsoleEventSink::new()),
//!     CancellationSignal::new(),
//! )?;
//! let report = dispatcher.run().await?;
//! assert_eq!(report.last_identity, 20);
//! ```
//!
//! For complete scenarios, see `tests/dispatcher_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core dispatch abstractions.
pub mod core;
/// Configuration models.
pub mod config;
/// Builders to construct dispatchers from configuration.
pub mod builders;
/// Runtime helpers.
pub mod runtime;
/// Shared utilities.
pub mod util;
