//! The canonical inbound message record handed to every handler.

use std::fmt;

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

use crate::{Error, Result};

// ── EventType ───────────────────────────────────────────────────────────────

/// Kind of notification emitted by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    NewMessage,
}

impl EventType {
    /// All variants, for iteration.
    pub const ALL: &'static [EventType] = &[Self::NewMessage];

    /// Wire name of the event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewMessage => "new_message",
        }
    }

    /// Parse a wire name. Unknown names yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == raw)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── MediaType ───────────────────────────────────────────────────────────────

/// Attachment kind carried by a message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    None,
    Image,
    Video,
    Audio,
    Document,
}

impl MediaType {
    pub const ALL: &'static [MediaType] = &[
        Self::None,
        Self::Image,
        Self::Video,
        Self::Audio,
        Self::Document,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Document => "document",
        }
    }

    /// Parse a wire value. The bridge sends an empty string for text-only
    /// messages, so `""` maps to [`MediaType::None`].
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Some(Self::None);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(raw))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── MessageEvent ────────────────────────────────────────────────────────────

/// One inbound chat message notification.
///
/// Constructed through [`MessageEventBuilder`], which enforces that the
/// message and chat identifiers are non-empty and that `filename` is present
/// exactly when the message carries media. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageEvent {
    event_type: EventType,
    message_id: String,
    chat_id: String,
    sender_id: String,
    content: String,
    timestamp: DateTime<Utc>,
    media_type: MediaType,
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chat_display_name: Option<String>,
}

impl MessageEvent {
    pub fn builder(
        message_id: impl Into<String>,
        chat_id: impl Into<String>,
        sender_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> MessageEventBuilder {
        MessageEventBuilder {
            event_type: EventType::NewMessage,
            message_id: message_id.into(),
            chat_id: chat_id.into(),
            sender_id: sender_id.into(),
            content: String::new(),
            timestamp,
            media_type: MediaType::None,
            filename: None,
            chat_display_name: None,
        }
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn chat_display_name(&self) -> Option<&str> {
        self.chat_display_name.as_deref()
    }

    pub fn has_media(&self) -> bool {
        !self.media_type.is_none()
    }

    /// Human-readable chat label, falling back to the chat identifier.
    pub fn chat_label(&self) -> &str {
        self.chat_display_name.as_deref().unwrap_or(&self.chat_id)
    }
}

/// Builder for [`MessageEvent`].
#[derive(Debug, Clone)]
pub struct MessageEventBuilder {
    event_type: EventType,
    message_id: String,
    chat_id: String,
    sender_id: String,
    content: String,
    timestamp: DateTime<Utc>,
    media_type: MediaType,
    filename: Option<String>,
    chat_display_name: Option<String>,
}

impl MessageEventBuilder {
    pub fn event_type(mut self, event_type: EventType) -> Self {
        self.event_type = event_type;
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Attach media. Pass [`MediaType::None`] and `None` to clear it.
    pub fn media(mut self, media_type: MediaType, filename: Option<String>) -> Self {
        self.media_type = media_type;
        self.filename = filename;
        self
    }

    pub fn chat_display_name(mut self, name: impl Into<String>) -> Self {
        self.chat_display_name = Some(name.into());
        self
    }

    pub fn build(self) -> Result<MessageEvent> {
        if self.message_id.is_empty() {
            return Err(Error::invalid_event("message_id must not be empty"));
        }
        if self.chat_id.is_empty() {
            return Err(Error::invalid_event("chat_id must not be empty"));
        }
        match (self.media_type.is_none(), self.filename.is_some()) {
            (true, true) => {
                return Err(Error::invalid_event(
                    "filename is only allowed on media messages",
                ));
            },
            (false, false) => {
                return Err(Error::invalid_event(format!(
                    "{} message is missing a filename",
                    self.media_type
                )));
            },
            _ => {},
        }
        Ok(MessageEvent {
            event_type: self.event_type,
            message_id: self.message_id,
            chat_id: self.chat_id,
            sender_id: self.sender_id,
            content: self.content,
            timestamp: self.timestamp,
            media_type: self.media_type,
            filename: self.filename,
            chat_display_name: self.chat_display_name,
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn builds_text_message() {
        let event = MessageEvent::builder("m1", "123@s.whatsapp.net", "123", ts())
            .content("hello")
            .chat_display_name("Alice")
            .build()
            .unwrap();
        assert_eq!(event.event_type(), EventType::NewMessage);
        assert_eq!(event.content(), "hello");
        assert!(!event.has_media());
        assert_eq!(event.filename(), None);
        assert_eq!(event.chat_label(), "Alice");
    }

    #[test]
    fn rejects_empty_ids() {
        assert!(MessageEvent::builder("", "chat", "s", ts()).build().is_err());
        assert!(MessageEvent::builder("m", "", "s", ts()).build().is_err());
    }

    #[test]
    fn filename_tracks_media() {
        let err = MessageEvent::builder("m", "c", "s", ts())
            .media(MediaType::None, Some("a.jpg".into()))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("only allowed on media"));

        let err = MessageEvent::builder("m", "c", "s", ts())
            .media(MediaType::Image, None)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("image message is missing a filename"));

        let event = MessageEvent::builder("m", "c", "s", ts())
            .media(MediaType::Document, Some("report.pdf".into()))
            .build()
            .unwrap();
        assert_eq!(event.filename(), Some("report.pdf"));
        assert_eq!(event.chat_label(), "c");
    }

    #[test]
    fn media_type_parsing() {
        assert_eq!(MediaType::parse(""), Some(MediaType::None));
        assert_eq!(MediaType::parse("none"), Some(MediaType::None));
        assert_eq!(MediaType::parse("IMAGE"), Some(MediaType::Image));
        assert_eq!(MediaType::parse("audio"), Some(MediaType::Audio));
        assert_eq!(MediaType::parse("sticker"), None);
    }

    #[test]
    fn event_type_parsing() {
        assert_eq!(EventType::parse("new_message"), Some(EventType::NewMessage));
        assert_eq!(EventType::parse("NEW_MESSAGE"), None);
        assert_eq!(EventType::parse("message_deleted"), None);
    }
}
