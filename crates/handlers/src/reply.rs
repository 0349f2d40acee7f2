use std::time::Duration;

use {
    anyhow::{Context, Result},
    async_trait::async_trait,
    chatrelay_config::BridgeConfig,
    serde::{Deserialize, Serialize},
    tracing::debug,
};

#[cfg(feature = "metrics")]
use chatrelay_metrics::{counter, replies as reply_metrics};

/// Capability to post a text message back into a chat.
#[async_trait]
pub trait ReplySender: Send + Sync {
    async fn send_reply(&self, chat_id: &str, text: &str) -> Result<()>;
}

/// [`ReplySender`] backed by the bridge REST API (`POST {base_url}/send`).
pub struct BridgeReplySender {
    http: reqwest::Client,
    send_url: String,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    recipient: &'a str,
    message: &'a str,
}

#[derive(Deserialize)]
struct SendResponse {
    success: bool,
    #[serde(default)]
    message: String,
}

impl BridgeReplySender {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("failed to build bridge HTTP client")?;
        Ok(Self {
            http,
            send_url: format!("{}/send", base_url.trim_end_matches('/')),
        })
    }

    pub fn from_config(config: &BridgeConfig) -> Result<Self> {
        Self::new(
            &config.base_url,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn send_url(&self) -> &str {
        &self.send_url
    }

    async fn post(&self, chat_id: &str, text: &str) -> Result<()> {
        let resp = self
            .http
            .post(&self.send_url)
            .json(&SendRequest {
                recipient: chat_id,
                message: text,
            })
            .send()
            .await
            .with_context(|| format!("bridge unreachable at {}", self.send_url))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("bridge send failed ({status}): {body}");
        }
        let body: SendResponse = resp
            .json()
            .await
            .context("bridge returned an unreadable response")?;
        if !body.success {
            anyhow::bail!("bridge rejected message: {}", body.message);
        }
        Ok(())
    }
}

#[async_trait]
impl ReplySender for BridgeReplySender {
    async fn send_reply(&self, chat_id: &str, text: &str) -> Result<()> {
        let result = self.post(chat_id, text).await;

        #[cfg(feature = "metrics")]
        match &result {
            Ok(()) => counter!(reply_metrics::SENT_TOTAL).increment(1),
            Err(_) => counter!(reply_metrics::FAILED_TOTAL).increment(1),
        }

        if result.is_ok() {
            debug!(chat_id, chars = text.chars().count(), "reply sent through bridge");
        }
        result
    }
}
