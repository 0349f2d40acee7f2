use std::time::Duration;

/// Why a single handler invocation did not succeed.
///
/// Captured into the handler's [`DispatchResult`](crate::DispatchResult);
/// never propagated past the engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    /// The handler returned an error.
    #[error("handler failed: {0}")]
    Failed(String),

    /// The handler panicked or its task was cancelled.
    #[error("handler panicked: {0}")]
    Panicked(String),

    /// The handler exceeded its time budget.
    #[error("handler timed out after {0:?}")]
    TimedOut(Duration),
}

impl HandlerError {
    pub(crate) fn from_join(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            return Self::Panicked("task cancelled".into());
        }
        let panic = err.into_panic();
        let message = panic
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".into());
        Self::Panicked(message)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut(_))
    }
}
