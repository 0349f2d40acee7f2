//! Forwards matching messages into a destination chat.

use std::{collections::HashSet, sync::Arc};

use {
    anyhow::Result,
    async_trait::async_trait,
    chatrelay_common::MessageEvent,
    chatrelay_config::ForwardConfig,
    chatrelay_dispatch::{HandlerOutcome, MessageHandler},
    tracing::info,
};

use crate::{blocklist::Blocklist, reply::ReplySender};

pub const NAME: &str = "forward";

pub struct ForwardHandler {
    destination: String,
    senders: HashSet<String>,
    keywords: Vec<String>,
    blocklist: Option<Arc<Blocklist>>,
    reply: Arc<dyn ReplySender>,
}

impl ForwardHandler {
    /// Returns `None` when the config has no destination.
    pub fn new(config: &ForwardConfig, reply: Arc<dyn ReplySender>) -> Option<Self> {
        let destination = config
            .destination
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())?
            .to_string();
        Some(Self {
            destination,
            senders: config.senders.iter().cloned().collect(),
            keywords: config
                .keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            blocklist: None,
            reply,
        })
    }

    /// Never forward messages from senders on `blocklist`.
    pub fn with_blocklist(mut self, blocklist: Arc<Blocklist>) -> Self {
        self.blocklist = Some(blocklist);
        self
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    fn matches(&self, event: &MessageEvent) -> bool {
        if self.senders.contains(event.sender_id()) {
            return true;
        }
        let content = event.content().to_lowercase();
        self.keywords.iter().any(|k| content.contains(k.as_str()))
    }
}

/// Text posted to the destination chat.
pub fn forward_text(event: &MessageEvent) -> String {
    let body = match (event.content().is_empty(), event.filename()) {
        (true, Some(filename)) => format!("[{} {filename}]", event.media_type()),
        _ => event.content().to_string(),
    };
    format!(
        "Forwarded from {} ({}): {body}",
        event.chat_label(),
        event.sender_id()
    )
}

#[async_trait]
impl MessageHandler for ForwardHandler {
    fn name(&self) -> &str {
        NAME
    }

    async fn handle(&self, event: &MessageEvent) -> Result<HandlerOutcome> {
        if event.chat_id() == self.destination {
            return Ok(HandlerOutcome::skipped("event from destination chat"));
        }
        if self
            .blocklist
            .as_ref()
            .is_some_and(|b| b.contains(event.sender_id()))
        {
            return Ok(HandlerOutcome::skipped("sender is blocked"));
        }
        if !self.matches(event) {
            return Ok(HandlerOutcome::skipped("no forwarding rule matched"));
        }
        self.reply
            .send_reply(&self.destination, &forward_text(event))
            .await?;
        info!(
            message_id = %event.message_id(),
            sender = %event.sender_id(),
            destination = %self.destination,
            "message forwarded"
        );
        Ok(HandlerOutcome::Handled)
    }
}
