use {
    anyhow::Result,
    async_trait::async_trait,
    chatrelay_common::MessageEvent,
    chatrelay_dispatch::{HandlerOutcome, MessageHandler},
    tracing::info,
};

pub const NAME: &str = "logger";

/// Logs every message. Registered in blocking mode.
#[derive(Debug, Default)]
pub struct LoggingHandler;

#[async_trait]
impl MessageHandler for LoggingHandler {
    fn name(&self) -> &str {
        NAME
    }

    async fn handle(&self, event: &MessageEvent) -> Result<HandlerOutcome> {
        if event.has_media() {
            info!(
                message_id = %event.message_id(),
                chat = %event.chat_label(),
                sender = %event.sender_id(),
                media_type = %event.media_type(),
                filename = event.filename().unwrap_or_default(),
                "media message received"
            );
        } else {
            info!(
                message_id = %event.message_id(),
                chat = %event.chat_label(),
                sender = %event.sender_id(),
                content = %event.content(),
                "text message received"
            );
        }
        Ok(HandlerOutcome::Handled)
    }
}
