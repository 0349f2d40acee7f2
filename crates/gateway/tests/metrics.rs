//! Prometheus export of the notification endpoint counters.
#![cfg(feature = "prometheus")]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use {
    axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
    },
    serde_json::{Value, json},
    tower::ServiceExt,
};

use {
    chatrelay_dispatch::{DispatchConfig, DispatchEngine, HandlerRegistry},
    chatrelay_gateway::{server::build_gateway_app, state::GatewayState},
    chatrelay_metrics::{MetricsRecorderConfig, init_metrics},
    chatrelay_protocol::{METRICS_PATH, NOTIFICATION_PATH},
};

fn payload(message_id: &str, media_type: &str, filename: &str) -> Value {
    json!({
        "type": "new_message",
        "message_id": message_id,
        "chat_jid": "1234567890@s.whatsapp.net",
        "sender": "1234567890",
        "content": "",
        "timestamp": "2025-03-01T12:00:00",
        "media_type": media_type,
        "filename": filename,
        "chat_name": ""
    })
}

async fn post(app: &Router, body: Value) -> StatusCode {
    let request = Request::post(NOTIFICATION_PATH)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap().status()
}

#[tokio::test]
async fn notification_counters_are_labelled() {
    let handle = init_metrics(MetricsRecorderConfig {
        enabled: true,
        ..Default::default()
    })
    .unwrap();
    let engine = DispatchEngine::new(Arc::new(HandlerRegistry::new()), DispatchConfig::default());
    let state = GatewayState::new(engine)
        .with_wait_for_handlers(true)
        .with_metrics_handle(handle);
    let app = build_gateway_app(Arc::new(state));

    assert_eq!(post(&app, payload("m1", "", "")).await, StatusCode::OK);
    assert_eq!(post(&app, payload("m2", "image", "photo.jpg")).await, StatusCode::OK);
    let mut missing = payload("m3", "", "");
    missing.as_object_mut().unwrap().remove("message_id");
    assert_eq!(post(&app, missing).await, StatusCode::BAD_REQUEST);

    let resp = app
        .clone()
        .oneshot(Request::get(METRICS_PATH).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    assert!(text.contains("chatrelay_notifications_received_total 3"), "{text}");
    assert!(
        text.contains(r#"chatrelay_notifications_accepted_total{media_type="none"} 1"#),
        "{text}"
    );
    assert!(
        text.contains(r#"chatrelay_notifications_accepted_total{media_type="image"} 1"#),
        "{text}"
    );
    assert!(
        text.contains(r#"chatrelay_notifications_rejected_total{reason="missing_field"} 1"#),
        "{text}"
    );
}
