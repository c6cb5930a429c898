//! Shared utilities.

pub mod error_chain;
pub mod telemetry;

pub use error_chain::{format_anyhow_chain, format_error_chain, FALLBACK_MESSAGE};
pub use telemetry::init_tracing;
