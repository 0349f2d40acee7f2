//! Bridge → chatrelay notification protocol.
//!
//! The bridge POSTs one JSON object per inbound chat message:
//!
//! ```json
//! {
//!   "type": "new_message",
//!   "message_id": "3EB0C767D26A",
//!   "chat_jid": "1234567890@s.whatsapp.net",
//!   "sender": "1234567890",
//!   "content": "hello",
//!   "timestamp": "2025-03-01T12:00:00Z",
//!   "media_type": "",
//!   "filename": "",
//!   "chat_name": "Alice"
//! }
//! ```
//!
//! and receives a [`NotificationAck`] that only says whether the payload was
//! well formed.

pub mod decode;

pub use decode::{DecodeError, decode, decode_value};

use std::fmt;

use {
    chatrelay_common::MessageEvent,
    serde::{Deserialize, Serialize},
};

// ── Constants ────────────────────────────────────────────────────────────────

pub const NOTIFICATION_PATH: &str = "/api/message-notification";
pub const HEALTH_PATH: &str = "/health";
pub const HANDLERS_PATH: &str = "/api/handlers";
pub const STATS_PATH: &str = "/api/stats";
pub const METRICS_PATH: &str = "/metrics";
pub const MAX_PAYLOAD_BYTES: usize = 1_048_576; // 1 MB

// ── Wire payload ─────────────────────────────────────────────────────────────

/// Notification body as the bridge sends it.
///
/// Used when *producing* notifications (CLI, tests). Inbound payloads go
/// through [`decode`], which validates field shapes individually so that
/// errors name the offending field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    #[serde(rename = "type")]
    pub event_type: String,
    pub message_id: String,
    pub chat_jid: String,
    pub sender: String,
    #[serde(default)]
    pub content: String,
    pub timestamp: String,
    #[serde(default)]
    pub media_type: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub chat_name: String,
}

impl From<&MessageEvent> for NotificationPayload {
    fn from(event: &MessageEvent) -> Self {
        Self {
            event_type: event.event_type().as_str().to_string(),
            message_id: event.message_id().to_string(),
            chat_jid: event.chat_id().to_string(),
            sender: event.sender_id().to_string(),
            content: event.content().to_string(),
            timestamp: event.timestamp().to_rfc3339(),
            media_type: if event.has_media() {
                event.media_type().as_str().to_string()
            } else {
                String::new()
            },
            filename: event.filename().unwrap_or_default().to_string(),
            chat_name: event.chat_display_name().unwrap_or_default().to_string(),
        }
    }
}

// ── Acknowledgement ──────────────────────────────────────────────────────────

/// Response body of the notification endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAck {
    pub success: bool,
    pub message: String,
}

impl NotificationAck {
    pub fn accepted() -> Self {
        Self {
            success: true,
            message: "Notification accepted".into(),
        }
    }

    pub fn rejected(err: &DecodeError) -> Self {
        Self {
            success: false,
            message: format!("rejected: malformed payload: {err}"),
        }
    }

    /// Rejection for a body that could not be read, e.g. one over
    /// [`MAX_PAYLOAD_BYTES`].
    pub fn unreadable(reason: impl fmt::Display) -> Self {
        Self {
            success: false,
            message: format!("rejected: {reason}"),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, chatrelay_common::MediaType, chrono::Utc};

    #[test]
    fn payload_from_event_uses_bridge_conventions() {
        let event = MessageEvent::builder("m1", "c1", "s1", Utc::now())
            .content("hi")
            .build()
            .unwrap();
        let payload = NotificationPayload::from(&event);
        assert_eq!(payload.event_type, "new_message");
        assert_eq!(payload.media_type, "");
        assert_eq!(payload.filename, "");
        assert_eq!(payload.chat_name, "");

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "new_message");
        assert_eq!(json["chat_jid"], "c1");
    }

    #[test]
    fn payload_decodes_back_to_event() {
        let event = MessageEvent::builder("m2", "c2", "s2", Utc::now())
            .media(MediaType::Video, Some("clip.mp4".into()))
            .chat_display_name("Family")
            .build()
            .unwrap();
        let bytes = serde_json::to_vec(&NotificationPayload::from(&event)).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.media_type(), MediaType::Video);
        assert_eq!(decoded.filename(), Some("clip.mp4"));
        assert_eq!(decoded.chat_display_name(), Some("Family"));
        assert_eq!(decoded.timestamp(), event.timestamp());
    }

    #[test]
    fn rejected_ack_mentions_cause() {
        let ack = NotificationAck::rejected(&DecodeError::MissingField("message_id"));
        assert!(!ack.success);
        assert!(ack.message.starts_with("rejected: malformed payload"));
        assert!(ack.message.contains("message_id"));
    }
}
