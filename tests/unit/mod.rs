//! Unit tests for individual components

mod events_test;
mod config_test;
mod runtime_test;
mod ledger_test;
mod gate_test;
