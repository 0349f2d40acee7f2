//! HTTP route handlers.

use std::sync::Arc;

use {
    axum::{
        body::Bytes,
        extract::{State, rejection::BytesRejection},
        http::StatusCode,
        response::{IntoResponse, Json},
    },
    chatrelay_protocol::{
        HANDLERS_PATH, HEALTH_PATH, MAX_PAYLOAD_BYTES, METRICS_PATH, NOTIFICATION_PATH,
        NotificationAck, STATS_PATH, decode,
    },
    serde_json::json,
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use chatrelay_metrics::{counter, labels, notifications as notification_metrics};

use crate::server::AppState;

pub const SERVICE_NAME: &str = "chatrelay";

// ── Notification endpoint ───────────────────────────────────────────────────

/// `POST /api/message-notification`
///
/// Decodes the raw body and acknowledges before handlers run. The ack never
/// reflects handler outcomes; a decode failure is answered with 400 and
/// nothing is dispatched. A body that cannot be read (413 over
/// [`MAX_PAYLOAD_BYTES`]) gets the same rejected ack shape.
pub async fn notification_handler(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> impl IntoResponse {
    #[cfg(feature = "metrics")]
    counter!(notification_metrics::RECEIVED_TOTAL).increment(1);

    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            let status = rejection.status();
            let (reason, ack) = if status == StatusCode::PAYLOAD_TOO_LARGE {
                (
                    "payload_too_large",
                    NotificationAck::unreadable(format!(
                        "payload exceeds {MAX_PAYLOAD_BYTES} bytes"
                    )),
                )
            } else {
                (
                    "unreadable_body",
                    NotificationAck::unreadable(format!(
                        "unreadable body: {}",
                        rejection.body_text()
                    )),
                )
            };
            warn!(%status, reason, "rejected notification body");
            #[cfg(feature = "metrics")]
            counter!(notification_metrics::REJECTED_TOTAL, labels::REASON => reason).increment(1);
            return (status, Json(ack));
        },
    };

    let event = match decode(&body) {
        Ok(event) => Arc::new(event),
        Err(e) => {
            warn!(error = %e, bytes = body.len(), "rejected notification");
            #[cfg(feature = "metrics")]
            counter!(notification_metrics::REJECTED_TOTAL, labels::REASON => e.kind()).increment(1);
            return (StatusCode::BAD_REQUEST, Json(NotificationAck::rejected(&e)));
        },
    };

    info!(
        message_id = %event.message_id(),
        chat = %event.chat_label(),
        sender = %event.sender_id(),
        media_type = %event.media_type(),
        "notification accepted"
    );
    #[cfg(feature = "metrics")]
    counter!(
        notification_metrics::ACCEPTED_TOTAL,
        labels::MEDIA_TYPE => event.media_type().as_str()
    )
    .increment(1);

    let engine = &state.gateway.engine;
    if state.gateway.wait_for_handlers {
        let report = engine.dispatch(event).await;
        debug!(message_id = %report.message_id, handlers = report.results.len(), "handlers finished before ack");
    } else {
        // Dropping the handle detaches the cycle.
        drop(engine.dispatch_detached(event));
    }

    (StatusCode::OK, Json(NotificationAck::accepted()))
}

// ── Introspection ───────────────────────────────────────────────────────────

/// `GET /health`: liveness only.
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": state.gateway.version,
    }))
}

/// `GET /`: service description and endpoint map.
pub async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "service": SERVICE_NAME,
        "version": state.gateway.version,
        "uptime_secs": state.gateway.uptime().as_secs(),
        "handlers": state.gateway.registry().len(),
        "endpoints": {
            "notification": format!("POST {NOTIFICATION_PATH}"),
            "health": format!("GET {HEALTH_PATH}"),
            "handlers": format!("GET {HANDLERS_PATH}"),
            "stats": format!("GET {STATS_PATH}"),
            "metrics": format!("GET {METRICS_PATH}"),
        },
    }))
}

/// `GET /api/handlers`: read-only view of the registry.
pub async fn handlers_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.gateway.registry().summaries())
}

/// `GET /api/stats`: message statistics, when the stats handler is installed.
pub async fn stats_handler(State(state): State<AppState>) -> impl IntoResponse {
    match &state.gateway.stats {
        Some(stats) => Json(stats.snapshot()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "statistics handler is not enabled" })),
        )
            .into_response(),
    }
}
