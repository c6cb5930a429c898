//! Tokio runtime construction and process-interrupt handling.

use tokio::runtime::Runtime;
use tokio::task::JoinHandle;

use crate::core::CancellationSignal;

/// Create a multi-threaded runtime with `worker_threads` workers.
///
/// The dispatch loop and every worker run on this runtime; the thread count
/// is independent of the dispatcher's concurrency limit.
pub fn build_runtime(worker_threads: usize) -> Result<Runtime, std::io::Error> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads.max(1))
        .thread_name("slot-dispatch-worker")
        .enable_all()
        .build()
}

/// Request cancellation on `signal` when the process receives Ctrl-C.
///
/// Must be called from within a runtime. The returned handle finishes once
/// the interrupt has been turned into a cancellation request, or when the
/// signal was cancelled by other means first.
pub fn cancel_on_ctrl_c(signal: CancellationSignal) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => {
                    tracing::info!("interrupt received");
                    signal.request_cancellation();
                }
                Err(e) => tracing::error!("failed to listen for interrupt: {}", e),
            },
            () = signal.cancelled() => {}
        }
    })
}
