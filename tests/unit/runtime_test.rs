//! Tests for runtime helpers

use slot_dispatch::core::CancellationSignal;
use slot_dispatch::runtime::{build_runtime, cancel_on_ctrl_c};

#[test]
fn test_build_runtime_runs_futures() {
    let runtime = build_runtime(2).expect("runtime");
    let value = runtime.block_on(async { tokio::spawn(async { 123 }).await.unwrap() });
    assert_eq!(value, 123);
}

#[test]
fn test_interrupt_listener_exits_on_cancellation() {
    let runtime = build_runtime(1).expect("runtime");
    runtime.block_on(async {
        let signal = CancellationSignal::new();
        let listener = cancel_on_ctrl_c(signal.clone());
        signal.request_cancellation();
        listener.await.expect("listener");
    });
}
