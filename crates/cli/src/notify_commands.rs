use {
    anyhow::{Context, Result},
    chatrelay_protocol::{NOTIFICATION_PATH, NotificationAck, NotificationPayload},
    chrono::Utc,
    clap::Args,
};

#[derive(Args)]
pub struct NotifyArgs {
    /// Gateway base URL.
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,
    /// Sender identifier.
    #[arg(long, default_value = "1234567890")]
    sender: String,
    /// Chat identifier.
    #[arg(long, default_value = "1234567890@s.whatsapp.net")]
    chat: String,
    /// Chat display name.
    #[arg(long)]
    chat_name: Option<String>,
    /// Message text.
    #[arg(long, default_value = "Hello, this is a test message!")]
    content: String,
    /// Media type (image, video, audio, document).
    #[arg(long)]
    media_type: Option<String>,
    /// Attachment filename; required with --media-type.
    #[arg(long)]
    filename: Option<String>,
    /// Message identifier. Generated when omitted.
    #[arg(long)]
    message_id: Option<String>,
}

impl NotifyArgs {
    fn payload(&self) -> NotificationPayload {
        let now = Utc::now();
        NotificationPayload {
            event_type: "new_message".into(),
            message_id: self
                .message_id
                .clone()
                .unwrap_or_else(|| format!("test_{}", now.timestamp_millis())),
            chat_jid: self.chat.clone(),
            sender: self.sender.clone(),
            content: self.content.clone(),
            timestamp: now.to_rfc3339(),
            media_type: self.media_type.clone().unwrap_or_default(),
            filename: self.filename.clone().unwrap_or_default(),
            chat_name: self.chat_name.clone().unwrap_or_default(),
        }
    }
}

pub async fn handle_notify(args: NotifyArgs) -> Result<()> {
    let endpoint = format!("{}{NOTIFICATION_PATH}", args.url.trim_end_matches('/'));
    let payload = args.payload();

    let resp = reqwest::Client::new()
        .post(&endpoint)
        .json(&payload)
        .send()
        .await
        .with_context(|| format!("could not reach {endpoint}"))?;
    let status = resp.status();
    let ack: NotificationAck = resp
        .json()
        .await
        .context("gateway returned an unreadable response")?;

    println!("{status} {}", serde_json::to_string(&ack)?);
    if !ack.success {
        anyhow::bail!("notification {} was rejected", payload.message_id);
    }
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, clap::Parser};

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: NotifyArgs,
    }

    #[test]
    fn builds_text_payload_with_bridge_defaults() {
        let h = Harness::try_parse_from(["notify", "--message-id", "m1", "--content", "help"]).unwrap();
        let payload = h.args.payload();
        assert_eq!(payload.event_type, "new_message");
        assert_eq!(payload.message_id, "m1");
        assert_eq!(payload.content, "help");
        assert_eq!(payload.media_type, "");
        assert_eq!(payload.filename, "");
    }

    #[test]
    fn media_payload_decodes() {
        let h = Harness::try_parse_from([
            "notify",
            "--media-type",
            "image",
            "--filename",
            "photo.jpg",
            "--chat-name",
            "Family",
        ])
        .unwrap();
        let raw = serde_json::to_vec(&h.args.payload()).unwrap();
        let event = chatrelay_protocol::decode(&raw).unwrap();
        assert_eq!(event.filename(), Some("photo.jpg"));
        assert_eq!(event.chat_label(), "Family");
        assert!(event.message_id().starts_with("test_"));
    }
}
