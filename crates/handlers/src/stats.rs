//! Message statistics handler.

use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicU64, Ordering},
};

use {
    anyhow::Result,
    async_trait::async_trait,
    chatrelay_common::{MediaType, MessageEvent},
    chatrelay_dispatch::{HandlerOutcome, MessageHandler},
    chrono::{DateTime, Utc},
    dashmap::DashMap,
    serde::Serialize,
};

pub const NAME: &str = "stats";

#[derive(Debug, Clone, Copy)]
struct SenderEntry {
    messages: u64,
    last_seen: DateTime<Utc>,
}

/// Counts messages per sender and per media type.
///
/// Safe to update from concurrent dispatch cycles.
#[derive(Default)]
pub struct MessageStatsHandler {
    total: AtomicU64,
    senders: DashMap<String, SenderEntry>,
    media: DashMap<MediaType, u64>,
}

/// Serializable copy of the counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub total_messages: u64,
    pub senders: BTreeMap<String, SenderSnapshot>,
    pub media: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SenderSnapshot {
    pub messages: u64,
    pub last_seen: DateTime<Utc>,
}

impl MessageStatsHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: &MessageEvent) {
        self.total.fetch_add(1, Ordering::Relaxed);
        self.senders
            .entry(event.sender_id().to_string())
            .and_modify(|e| {
                e.messages += 1;
                e.last_seen = e.last_seen.max(event.timestamp());
            })
            .or_insert(SenderEntry {
                messages: 1,
                last_seen: event.timestamp(),
            });
        *self.media.entry(event.media_type()).or_default() += 1;
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn sender_count(&self, sender: &str) -> u64 {
        self.senders.get(sender).map_or(0, |e| e.messages)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_messages: self.total(),
            senders: self
                .senders
                .iter()
                .map(|e| {
                    (e.key().clone(), SenderSnapshot {
                        messages: e.messages,
                        last_seen: e.last_seen,
                    })
                })
                .collect(),
            media: self
                .media
                .iter()
                .map(|e| (e.key().as_str().to_string(), *e.value()))
                .collect(),
        }
    }
}

#[async_trait]
impl MessageHandler for MessageStatsHandler {
    fn name(&self) -> &str {
        NAME
    }

    async fn handle(&self, event: &MessageEvent) -> Result<HandlerOutcome> {
        self.record(event);
        Ok(HandlerOutcome::Handled)
    }
}
