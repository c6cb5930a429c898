//! Runtime helpers: tokio runtime construction and interrupt wiring.

pub mod tokio_runtime;

pub use tokio_runtime::{build_runtime, cancel_on_ctrl_c};
