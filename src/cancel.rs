//! Cancellation Handle
//!
//! Caller-held token used to abort an in-flight lookup.

use tokio_util::sync::CancellationToken;

// == Cancellation Handle ==
/// Cooperative cancellation token handed out per request.
///
/// Clones share the same state. Only the origin fetch is interrupted
/// mid-flight; memory and disk operations observe the flag between steps.
#[derive(Debug, Clone, Default)]
pub struct CancellationHandle {
    token: CancellationToken,
}

impl CancellationHandle {
    /// Creates a new, not yet cancelled handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Repeated calls have no additional effect.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns true once `cancel` has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes when the handle is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}
