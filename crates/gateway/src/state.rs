use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use {
    anyhow::Result,
    chatrelay_config::ChatRelayConfig,
    chatrelay_dispatch::{DispatchConfig, DispatchEngine, HandlerRegistry},
    chatrelay_handlers::{BridgeReplySender, MessageStatsHandler, install_reference_handlers},
};

#[cfg(feature = "metrics")]
use chatrelay_metrics::MetricsHandle;

/// Everything request handlers need, shared behind an `Arc`.
pub struct GatewayState {
    pub engine: DispatchEngine,
    /// Statistics handler, when installed.
    pub stats: Option<Arc<MessageStatsHandler>>,
    /// Hold the response until the dispatch cycle completes.
    pub wait_for_handlers: bool,
    pub version: String,
    pub started_at: Instant,
    #[cfg(feature = "metrics")]
    pub metrics_handle: Option<MetricsHandle>,
}

impl GatewayState {
    pub fn new(engine: DispatchEngine) -> Self {
        Self {
            engine,
            stats: None,
            wait_for_handlers: false,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Instant::now(),
            #[cfg(feature = "metrics")]
            metrics_handle: None,
        }
    }

    /// Build the registry, the bridge reply client and the configured
    /// reference handlers.
    pub fn from_config(config: &ChatRelayConfig) -> Result<Self> {
        let registry = Arc::new(HandlerRegistry::new());
        let reply = Arc::new(BridgeReplySender::from_config(&config.bridge)?);
        let stats = install_reference_handlers(&config.handlers, &registry, reply);

        let engine = DispatchEngine::new(registry, DispatchConfig {
            handler_timeout: Duration::from_secs(config.dispatch.handler_timeout_secs),
        });
        Ok(Self::new(engine)
            .with_stats(stats)
            .with_wait_for_handlers(config.dispatch.wait_for_handlers))
    }

    #[must_use]
    pub fn with_stats(mut self, stats: Option<Arc<MessageStatsHandler>>) -> Self {
        self.stats = stats;
        self
    }

    #[must_use]
    pub fn with_wait_for_handlers(mut self, wait: bool) -> Self {
        self.wait_for_handlers = wait;
        self
    }

    #[cfg(feature = "metrics")]
    #[must_use]
    pub fn with_metrics_handle(mut self, handle: MetricsHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        self.engine.registry()
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}
