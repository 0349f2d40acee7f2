//! Slash-command handler.

use std::sync::Arc;

use {
    anyhow::Result,
    async_trait::async_trait,
    chatrelay_common::MessageEvent,
    chatrelay_dispatch::{HandlerOutcome, MessageHandler},
    chrono::{SecondsFormat, Utc},
    tracing::info,
};

use crate::{blocklist::Blocklist, reply::ReplySender, stats::MessageStatsHandler};

pub const NAME: &str = "commands";

pub const HELP_TEXT: &str = "Available commands:
/help - Show this help message
/status - Check bot status
/time - Get current time
/stats - Show message statistics
/block - Block this sender
/unblock - Unblock this sender";

/// A recognised command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    Status,
    Time,
    Stats,
    Block,
    Unblock,
}

impl Command {
    /// Parses a whole message. Matching is case-insensitive and ignores
    /// surrounding whitespace.
    pub fn parse(content: &str) -> Option<Self> {
        match content.trim().to_lowercase().as_str() {
            "/help" => Some(Self::Help),
            "/status" => Some(Self::Status),
            "/time" => Some(Self::Time),
            "/stats" => Some(Self::Stats),
            "/block" => Some(Self::Block),
            "/unblock" => Some(Self::Unblock),
            _ => None,
        }
    }
}

/// Answers `/command` messages in the chat they came from.
///
/// Blocked senders are ignored, except for `/unblock`.
pub struct CommandHandler {
    blocklist: Arc<Blocklist>,
    stats: Option<Arc<MessageStatsHandler>>,
    auto_reply_enabled: bool,
    reply: Arc<dyn ReplySender>,
}

impl CommandHandler {
    pub fn new(blocklist: Arc<Blocklist>, reply: Arc<dyn ReplySender>) -> Self {
        Self {
            blocklist,
            stats: None,
            auto_reply_enabled: false,
            reply,
        }
    }

    /// Source of the `/status` and `/stats` counters.
    pub fn with_stats(mut self, stats: Option<Arc<MessageStatsHandler>>) -> Self {
        self.stats = stats;
        self
    }

    /// Reported by `/status`.
    pub fn with_auto_reply_enabled(mut self, enabled: bool) -> Self {
        self.auto_reply_enabled = enabled;
        self
    }

    /// Reply text for `command` sent by `sender`. Applies `/block` and
    /// `/unblock`.
    pub fn execute(&self, command: Command, sender: &str) -> String {
        match command {
            Command::Help => HELP_TEXT.to_string(),
            Command::Status => {
                let mut text = String::from("Bot status: online");
                if let Some(stats) = &self.stats {
                    text.push_str(&format!("\nMessages processed: {}", stats.total()));
                }
                let auto_reply = if self.auto_reply_enabled {
                    "enabled"
                } else {
                    "disabled"
                };
                text.push_str(&format!("\nAuto-reply: {auto_reply}"));
                text
            },
            Command::Time => format!(
                "Current time: {}",
                Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
            ),
            Command::Stats => match &self.stats {
                Some(stats) => {
                    let snapshot = stats.snapshot();
                    format!(
                        "Message statistics:\nTotal processed: {}\nSenders: {}\nBlocked senders: {}",
                        snapshot.total_messages,
                        snapshot.senders.len(),
                        self.blocklist.len()
                    )
                },
                None => "Message statistics are not enabled.".to_string(),
            },
            Command::Block => {
                self.blocklist.block(sender);
                info!(%sender, "sender blocked");
                format!("Sender {sender} has been blocked.")
            },
            Command::Unblock => {
                self.blocklist.unblock(sender);
                info!(%sender, "sender unblocked");
                format!("Sender {sender} has been unblocked.")
            },
        }
    }
}

#[async_trait]
impl MessageHandler for CommandHandler {
    fn name(&self) -> &str {
        NAME
    }

    async fn handle(&self, event: &MessageEvent) -> Result<HandlerOutcome> {
        let Some(command) = Command::parse(event.content()) else {
            return Ok(HandlerOutcome::skipped("not a command"));
        };
        if command != Command::Unblock && self.blocklist.contains(event.sender_id()) {
            return Ok(HandlerOutcome::skipped("sender is blocked"));
        }

        let text = self.execute(command, event.sender_id());
        self.reply.send_reply(event.chat_id(), &text).await?;
        info!(
            message_id = %event.message_id(),
            sender = %event.sender_id(),
            ?command,
            "command answered"
        );
        Ok(HandlerOutcome::Handled)
    }
}
