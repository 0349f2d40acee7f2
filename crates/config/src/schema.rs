//! Config schema types. Every section is `#[serde(default)]`, so an empty
//! file (or no file) yields a working configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatRelayConfig {
    pub server: ServerConfig,
    pub dispatch: DispatchSettings,
    pub bridge: BridgeConfig,
    pub handlers: HandlersConfig,
    pub metrics: MetricsConfig,
}

/// Notification endpoint listener.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "0.0.0.0" so the bridge can reach us
    /// from another container.
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    /// Upper bound on a single handler invocation, in seconds.
    pub handler_timeout_secs: u64,
    /// Hold the HTTP response until every handler has finished.
    pub wait_for_handlers: bool,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            handler_timeout_secs: 30,
            wait_for_handlers: false,
        }
    }
}

/// Bridge REST API used for outbound replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".into(),
            request_timeout_secs: 10,
        }
    }
}

/// Built-in handlers. Each can be switched on or off independently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlersConfig {
    /// Senders whose messages the replying handlers ignore. The `/block` and
    /// `/unblock` commands edit this list at runtime.
    pub blocked_senders: Vec<String>,
    pub commands: CommandsConfig,
    pub auto_reply: AutoReplyConfig,
    pub forward: ForwardConfig,
    pub stats: StatsConfig,
    pub logging: LoggingHandlerConfig,
}

/// Keyword auto-reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoReplyConfig {
    pub enabled: bool,
    /// Keyword → reply text. Keywords match case-insensitively.
    pub rules: BTreeMap<String, String>,
    /// Media type (`image`, `video`, `audio`, `document`) → acknowledgement.
    pub media_responses: BTreeMap<String, String>,
    /// Minimum seconds between two replies to the same sender. 0 disables.
    pub cooldown_secs: u64,
    /// Reply to a message ending in `?` when no keyword matched.
    pub question_response: Option<String>,
    /// Reply to a greeting ("hello", "hey", "good morning", ...) when no
    /// keyword matched.
    pub greeting_response: Option<String>,
}

impl Default for AutoReplyConfig {
    fn default() -> Self {
        let rules = [
            ("hello", "Hello! How can I help you today?"),
            ("hi", "Hi there! What can I do for you?"),
            ("help", "I can help you with various tasks! Just tell me what you need."),
            ("ping", "Pong!"),
            ("thanks", "You're welcome! Is there anything else I can help you with?"),
            ("thank you", "You're welcome! Is there anything else I can help you with?"),
        ];
        let media = [
            ("image", "Thanks for the image!"),
            ("video", "Thanks for the video!"),
            ("audio", "Thanks for the audio message!"),
            ("document", "Thanks for the document!"),
        ];
        Self {
            enabled: false,
            rules: rules
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            media_responses: media
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            cooldown_secs: 30,
            question_response: None,
            greeting_response: None,
        }
    }
}

/// Slash commands (`/help`, `/status`, `/time`, `/stats`, `/block`, `/unblock`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    pub enabled: bool,
}

/// Forward matching messages to another chat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardConfig {
    pub enabled: bool,
    /// Chat identifier that receives forwarded messages.
    pub destination: Option<String>,
    /// Sender identifiers whose messages are always forwarded.
    pub senders: Vec<String>,
    /// Content keywords (case-insensitive substring) that trigger forwarding.
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    pub enabled: bool,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingHandlerConfig {
    pub enabled: bool,
}

impl Default for LoggingHandlerConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg: ChatRelayConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, ChatRelayConfig::default());
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.dispatch.handler_timeout_secs, 30);
        assert!(!cfg.handlers.auto_reply.enabled);
        assert!(cfg.handlers.stats.enabled);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg: ChatRelayConfig = toml::from_str(
            r#"
            [server]
            port = 4000

            [handlers.auto_reply]
            enabled = true
            rules = { help = "I can help" }
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.port, 4000);
        assert_eq!(cfg.server.bind, "0.0.0.0");
        assert_eq!(cfg.handlers.auto_reply.rules.len(), 1);
        assert_eq!(cfg.handlers.auto_reply.cooldown_secs, 30);
        assert_eq!(cfg.handlers.auto_reply.media_responses.len(), 4);
        assert_eq!(cfg.handlers.auto_reply.question_response, None);
    }

    #[test]
    fn commands_and_blocklist_parse() {
        let cfg: ChatRelayConfig = toml::from_str(
            r#"
            [handlers]
            blocked_senders = ["spammer"]

            [handlers.commands]
            enabled = true

            [handlers.auto_reply]
            question_response = "Good question!"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.handlers.blocked_senders, ["spammer"]);
        assert!(cfg.handlers.commands.enabled);
        assert_eq!(
            cfg.handlers.auto_reply.question_response.as_deref(),
            Some("Good question!")
        );
        assert_eq!(cfg.handlers.auto_reply.greeting_response, None);
    }

    #[test]
    fn round_trips_with_blocklist_and_fallbacks() {
        let mut cfg = ChatRelayConfig::default();
        cfg.handlers.blocked_senders = vec!["a".into(), "b".into()];
        cfg.handlers.commands.enabled = true;
        cfg.handlers.auto_reply.greeting_response = Some("Hello!".into());
        let text = toml::to_string_pretty(&cfg).unwrap();
        let back: ChatRelayConfig = toml::from_str(&text).unwrap();
        assert_eq!(cfg, back);
    }

    #[test]
    fn round_trips_through_toml() {
        let cfg = ChatRelayConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let back: ChatRelayConfig = toml::from_str(&text).unwrap();
        assert_eq!(cfg, back);
    }
}
