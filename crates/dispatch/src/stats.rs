use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use serde::Serialize;

use crate::engine::DispatchStatus;

/// Per-handler health statistics, updated after every invocation.
#[derive(Debug, Default)]
pub struct HandlerStats {
    pub call_count: AtomicU64,
    pub failure_count: AtomicU64,
    pub timeout_count: AtomicU64,
    pub total_latency_us: AtomicU64,
}

impl HandlerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, status: DispatchStatus, latency: Duration) {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        match status {
            DispatchStatus::Success => {},
            DispatchStatus::Failure => {
                self.failure_count.fetch_add(1, Ordering::Relaxed);
            },
            DispatchStatus::Timeout => {
                self.timeout_count.fetch_add(1, Ordering::Relaxed);
            },
        }
        self.total_latency_us
            .fetch_add(latency.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn avg_latency(&self) -> Duration {
        let calls = self.call_count.load(Ordering::Relaxed);
        if calls == 0 {
            return Duration::ZERO;
        }
        let total = self.total_latency_us.load(Ordering::Relaxed);
        Duration::from_micros(total / calls)
    }

    pub fn snapshot(&self) -> HandlerStatsSnapshot {
        HandlerStatsSnapshot {
            calls: self.call_count.load(Ordering::Relaxed),
            failures: self.failure_count.load(Ordering::Relaxed),
            timeouts: self.timeout_count.load(Ordering::Relaxed),
            avg_latency_ms: self.avg_latency().as_secs_f64() * 1000.0,
        }
    }
}

/// Point-in-time copy of [`HandlerStats`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerStatsSnapshot {
    pub calls: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub avg_latency_ms: f64,
}
