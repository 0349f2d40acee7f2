use std::{future::Future, sync::Arc};

use {
    anyhow::Context,
    axum::{
        Router,
        extract::DefaultBodyLimit,
        routing::{get, post},
    },
    chatrelay_config::ChatRelayConfig,
    chatrelay_protocol::{
        HANDLERS_PATH, HEALTH_PATH, MAX_PAYLOAD_BYTES, NOTIFICATION_PATH, STATS_PATH,
    },
    tokio::net::TcpListener,
    tower_http::{
        cors::{Any, CorsLayer},
        trace::TraceLayer,
    },
    tracing::{info, warn},
};

#[cfg(feature = "metrics")]
use chatrelay_metrics::MetricsHandle;

use crate::{
    routes::{
        handlers_handler, health_handler, notification_handler, root_handler, stats_handler,
    },
    state::GatewayState,
};

// ── Shared app state ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<GatewayState>,
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_gateway_app(state: Arc<GatewayState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route("/", get(root_handler))
        .route(HEALTH_PATH, get(health_handler))
        .route(NOTIFICATION_PATH, post(notification_handler))
        .route(HANDLERS_PATH, get(handlers_handler))
        .route(STATS_PATH, get(stats_handler));

    #[cfg(feature = "prometheus")]
    let router = router.route(
        chatrelay_protocol::METRICS_PATH,
        get(crate::metrics_routes::prometheus_metrics_handler),
    );

    router
        .layer(DefaultBodyLimit::max(MAX_PAYLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { gateway: state })
}

/// Build state from `config`, bind, and serve until Ctrl-C / SIGTERM.
pub async fn start_gateway(
    config: &ChatRelayConfig,
    #[cfg(feature = "metrics")] metrics_handle: Option<MetricsHandle>,
) -> anyhow::Result<()> {
    let state = GatewayState::from_config(config)?;
    #[cfg(feature = "metrics")]
    let state = match metrics_handle {
        Some(handle) => state.with_metrics_handle(handle),
        None => state,
    };

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(
        addr = %listener.local_addr()?,
        handlers = state.registry().len(),
        handler_timeout_secs = config.dispatch.handler_timeout_secs,
        bridge = %config.bridge.base_url,
        "chatrelay gateway listening"
    );

    serve_until(listener, Arc::new(state), shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves, then clear
/// the handler registry.
pub async fn serve_until<F>(
    listener: TcpListener,
    state: Arc<GatewayState>,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_gateway_app(Arc::clone(&state));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    let removed = state.registry().clear();
    info!(removed, "gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
