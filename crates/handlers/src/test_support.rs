#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

use {
    anyhow::Result,
    async_trait::async_trait,
    chatrelay_common::{MediaType, MessageEvent},
    chrono::{TimeZone, Utc},
};

use crate::reply::ReplySender;

/// Records every reply instead of sending it.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(String, String)>>,
    failures_left: AtomicUsize,
}

impl RecordingSender {
    pub fn failing() -> Self {
        Self::failing_times(usize::MAX)
    }

    /// Fails the first `n` sends, then records as usual.
    pub fn failing_times(n: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(n),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplySender for RecordingSender {
    async fn send_reply(&self, chat_id: &str, text: &str) -> Result<()> {
        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        anyhow::ensure!(!failed, "bridge down");
        self.sent
            .lock()
            .unwrap()
            .push((chat_id.to_string(), text.to_string()));
        Ok(())
    }
}

pub fn event(message_id: &str, sender: &str, content: &str) -> MessageEvent {
    let ts = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
    MessageEvent::builder(message_id, "chat@s.whatsapp.net", sender, ts)
        .content(content)
        .chat_display_name("Test Chat")
        .build()
        .unwrap()
}

pub fn media_event(media: MediaType, filename: &str, content: &str) -> MessageEvent {
    let ts = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
    MessageEvent::builder("media-1", "chat@s.whatsapp.net", "alice", ts)
        .content(content)
        .media(media, Some(filename.to_string()))
        .build()
        .unwrap()
}
