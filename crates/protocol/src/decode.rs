//! Notification decoder: raw bridge payload → [`MessageEvent`].
//!
//! The producer contract is strict. A missing or mistyped required field, an
//! unknown event type, or a media/filename mismatch rejects the whole payload
//! rather than handing half-valid data to handlers.

use {
    chatrelay_common::{EventType, MediaType, MessageEvent},
    chrono::{DateTime, NaiveDateTime, Utc},
    serde_json::{Map, Value},
};

/// Why a notification payload could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("payload must be a JSON object")]
    NotAnObject,

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("unknown event type '{0}'")]
    UnknownEventType(String),

    #[error(transparent)]
    Event(#[from] chatrelay_common::Error),
}

impl DecodeError {
    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidJson(_) => "invalid_json",
            Self::NotAnObject => "not_an_object",
            Self::MissingField(_) => "missing_field",
            Self::InvalidField { .. } => "invalid_field",
            Self::UnknownEventType(_) => "unknown_event_type",
            Self::Event(_) => "invalid_event",
        }
    }

    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

/// Naive timestamp layouts accepted when no UTC offset is present.
const NAIVE_TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Decode raw request bytes.
pub fn decode(raw: &[u8]) -> Result<MessageEvent, DecodeError> {
    let value: Value = serde_json::from_slice(raw)?;
    decode_value(&value)
}

/// Decode an already-parsed JSON value.
pub fn decode_value(value: &Value) -> Result<MessageEvent, DecodeError> {
    let obj = value.as_object().ok_or(DecodeError::NotAnObject)?;

    let type_raw = required_str(obj, "type")?;
    let event_type = EventType::parse(type_raw)
        .ok_or_else(|| DecodeError::UnknownEventType(type_raw.to_string()))?;

    let message_id = required_non_empty(obj, "message_id")?;
    let chat_id = required_non_empty(obj, "chat_jid")?;
    let sender = required_str(obj, "sender")?;
    let timestamp = parse_timestamp(
        obj.get("timestamp")
            .ok_or(DecodeError::MissingField("timestamp"))?,
    )?;

    let content = optional_str(obj, "content")?.unwrap_or_default();
    let media_type = match optional_str(obj, "media_type")? {
        None => MediaType::None,
        Some(raw) => MediaType::parse(raw)
            .ok_or_else(|| DecodeError::invalid("media_type", format!("has unknown value '{raw}'")))?,
    };
    let filename = optional_str(obj, "filename")?
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let chat_name = optional_str(obj, "chat_name")?.filter(|s| !s.is_empty());

    let mut builder = MessageEvent::builder(message_id, chat_id, sender, timestamp)
        .event_type(event_type)
        .content(content)
        .media(media_type, filename);
    if let Some(name) = chat_name {
        builder = builder.chat_display_name(name);
    }
    Ok(builder.build()?)
}

fn required_str<'a>(obj: &'a Map<String, Value>, field: &'static str) -> Result<&'a str, DecodeError> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(DecodeError::MissingField(field)),
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(DecodeError::invalid(
            field,
            format!("must be a string, got {}", type_name(other)),
        )),
    }
}

fn required_non_empty<'a>(
    obj: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, DecodeError> {
    let value = required_str(obj, field)?;
    if value.trim().is_empty() {
        return Err(DecodeError::invalid(field, "must not be empty"));
    }
    Ok(value)
}

fn optional_str<'a>(
    obj: &'a Map<String, Value>,
    field: &'static str,
) -> Result<Option<&'a str>, DecodeError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(DecodeError::invalid(
            field,
            format!("must be a string, got {}", type_name(other)),
        )),
    }
}

fn parse_timestamp(value: &Value) -> Result<DateTime<Utc>, DecodeError> {
    match value {
        Value::String(raw) => {
            let raw = raw.trim();
            if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
                return Ok(ts.with_timezone(&Utc));
            }
            NAIVE_TIMESTAMP_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|naive| naive.and_utc())
                .ok_or_else(|| {
                    DecodeError::invalid("timestamp", format!("is not a valid timestamp: '{raw}'"))
                })
        },
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .ok_or_else(|| DecodeError::invalid("timestamp", format!("is out of range: {n}"))),
        Value::Null => Err(DecodeError::MissingField("timestamp")),
        other => Err(DecodeError::invalid(
            "timestamp",
            format!("must be a string or integer, got {}", type_name(other)),
        )),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
