use std::{fmt, future::Future};

use {
    anyhow::Result,
    async_trait::async_trait,
    chatrelay_common::MessageEvent,
    serde::{Deserialize, Serialize},
};

// ── HandlerOutcome ──────────────────────────────────────────────────────────

/// What a handler did with an event. Both variants count as success.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// The handler acted on the event.
    #[default]
    Handled,
    /// The handler looked at the event and chose not to act.
    Skipped(String),
}

impl HandlerOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped(reason.into())
    }
}

// ── ExecutionMode ───────────────────────────────────────────────────────────

/// How the engine schedules a handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// The handler future is spawned on the async runtime. Use for handlers
    /// that suspend on I/O.
    #[default]
    Async,
    /// The handler runs on the blocking thread pool. Use for handlers that
    /// do synchronous work and would otherwise stall a runtime worker.
    Blocking,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Async => f.write_str("async"),
            Self::Blocking => f.write_str("blocking"),
        }
    }
}

// ── MessageHandler trait ────────────────────────────────────────────────────

/// A callback invoked once per dispatched message.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// A human-readable name. Registering a second handler under the same
    /// name replaces the first.
    fn name(&self) -> &str;

    async fn handle(&self, event: &MessageEvent) -> Result<HandlerOutcome>;
}

// ── Closure adapters ────────────────────────────────────────────────────────

/// Adapts a synchronous closure into a [`MessageHandler`].
///
/// Usually registered with [`ExecutionMode::Blocking`].
pub struct FnHandler<F> {
    name: String,
    f: F,
}

/// Wrap a synchronous closure.
pub fn handler_fn<F>(name: impl Into<String>, f: F) -> FnHandler<F>
where
    F: Fn(&MessageEvent) -> Result<HandlerOutcome> + Send + Sync,
{
    FnHandler {
        name: name.into(),
        f,
    }
}

#[async_trait]
impl<F> MessageHandler for FnHandler<F>
where
    F: Fn(&MessageEvent) -> Result<HandlerOutcome> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &MessageEvent) -> Result<HandlerOutcome> {
        (self.f)(event)
    }
}

/// Adapts an async closure into a [`MessageHandler`].
///
/// The closure receives its own copy of the event so the returned future
/// can be `'static`.
pub struct AsyncFnHandler<F> {
    name: String,
    f: F,
}

/// Wrap an async closure.
pub fn async_handler_fn<F, Fut>(name: impl Into<String>, f: F) -> AsyncFnHandler<F>
where
    F: Fn(MessageEvent) -> Fut + Send + Sync,
    Fut: Future<Output = Result<HandlerOutcome>> + Send,
{
    AsyncFnHandler {
        name: name.into(),
        f,
    }
}

#[async_trait]
impl<F, Fut> MessageHandler for AsyncFnHandler<F>
where
    F: Fn(MessageEvent) -> Fut + Send + Sync,
    Fut: Future<Output = Result<HandlerOutcome>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &MessageEvent) -> Result<HandlerOutcome> {
        (self.f)(event.clone()).await
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, chrono::Utc};

    fn event(content: &str) -> MessageEvent {
        MessageEvent::builder("m1", "chat", "alice", Utc::now())
            .content(content)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn sync_closure_adapter() {
        let h = handler_fn("echo", |e: &MessageEvent| {
            if e.content().is_empty() {
                Ok(HandlerOutcome::skipped("empty"))
            } else {
                Ok(HandlerOutcome::Handled)
            }
        });
        assert_eq!(h.name(), "echo");
        assert_eq!(h.handle(&event("hi")).await.unwrap(), HandlerOutcome::Handled);
        assert_eq!(
            h.handle(&event("")).await.unwrap(),
            HandlerOutcome::Skipped("empty".into())
        );
    }

    #[tokio::test]
    async fn async_closure_adapter() {
        let h = async_handler_fn("shout", |e: MessageEvent| async move {
            tokio::task::yield_now().await;
            anyhow::ensure!(e.content() != "boom", "refusing to handle boom");
            Ok(HandlerOutcome::Handled)
        });
        assert!(h.handle(&event("ok")).await.is_ok());
        let err = h.handle(&event("boom")).await.unwrap_err();
        assert!(err.to_string().contains("refusing"));
    }

    #[test]
    fn execution_mode_defaults_to_async() {
        assert_eq!(ExecutionMode::default(), ExecutionMode::Async);
        assert_eq!(ExecutionMode::Blocking.to_string(), "blocking");
    }
}
