//! One-shot cooperative cancellation.

use tokio_util::sync::CancellationToken;

/// Process-wide stop flag shared by the dispatcher and its workers.
///
/// Once requested it never clears. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    token: CancellationToken,
}

impl CancellationSignal {
    /// Create a signal that has not been requested.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn request_cancellation(&self) {
        if !self.token.is_cancelled() {
            tracing::info!("cancellation requested");
        }
        self.token.cancel();
    }

    /// Non-blocking check of the flag.
    pub fn is_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolve once cancellation has been requested.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}
