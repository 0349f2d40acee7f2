use std::{
    fmt,
    sync::{
        Arc, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use {
    anyhow::Result,
    chatrelay_common::MessageEvent,
    serde::{Deserialize, Serialize},
    tracing::{debug, info},
};

#[cfg(feature = "metrics")]
use chatrelay_metrics::{gauge, registry as registry_metrics};

use crate::{
    handler::{ExecutionMode, HandlerOutcome, MessageHandler, async_handler_fn, handler_fn},
    stats::{HandlerStats, HandlerStatsSnapshot},
};

// ── HandlerId ───────────────────────────────────────────────────────────────

/// Identifier assigned at registration, unique for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerId(u64);

impl HandlerId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h-{}", self.0)
    }
}

// ── HandlerRegistration ─────────────────────────────────────────────────────

/// One registered handler. Cheap to clone; snapshots hand these out.
#[derive(Clone)]
pub struct HandlerRegistration {
    pub id: HandlerId,
    pub name: String,
    pub mode: ExecutionMode,
    pub handler: Arc<dyn MessageHandler>,
    pub stats: Arc<HandlerStats>,
}

impl fmt::Debug for HandlerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistration")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// Serializable view of a registration, for introspection endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct HandlerSummary {
    pub id: HandlerId,
    pub name: String,
    pub mode: ExecutionMode,
    pub stats: HandlerStatsSnapshot,
}

// ── HandlerRegistry ─────────────────────────────────────────────────────────

/// Process-wide set of handlers, kept in registration order.
///
/// Mutations take the write lock only for the duration of a `Vec` update.
/// Dispatch never iterates the live list: it takes a [`snapshot`] and runs
/// handlers against that copy, so no lock is held while handlers execute.
///
/// [`snapshot`]: HandlerRegistry::snapshot
pub struct HandlerRegistry {
    entries: RwLock<Vec<HandlerRegistration>>,
    next_id: AtomicU64,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a handler and return its fresh identifier.
    ///
    /// A previously registered handler with the same name is removed, so the
    /// new one takes the last position in dispatch order.
    pub fn register(&self, handler: Arc<dyn MessageHandler>, mode: ExecutionMode) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let name = handler.name().to_string();
        let registration = HandlerRegistration {
            id,
            name: name.clone(),
            mode,
            handler,
            stats: Arc::new(HandlerStats::new()),
        };

        let (replaced, total) = {
            let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
            let before = entries.len();
            entries.retain(|e| e.name != name);
            let replaced = before != entries.len();
            entries.push(registration);
            (replaced, entries.len())
        };

        #[cfg(feature = "metrics")]
        gauge!(registry_metrics::HANDLERS_REGISTERED).set(total as f64);

        if replaced {
            info!(handler_id = %id, handler = %name, %mode, total, "message handler replaced");
        } else {
            info!(handler_id = %id, handler = %name, %mode, total, "message handler registered");
        }
        id
    }

    /// Register a synchronous closure. It runs on the blocking pool.
    pub fn register_fn<F>(&self, name: impl Into<String>, f: F) -> HandlerId
    where
        F: Fn(&MessageEvent) -> Result<HandlerOutcome> + Send + Sync + 'static,
    {
        self.register(Arc::new(handler_fn(name, f)), ExecutionMode::Blocking)
    }

    /// Register an async closure. It runs as a task on the runtime.
    pub fn register_async_fn<F, Fut>(&self, name: impl Into<String>, f: F) -> HandlerId
    where
        F: Fn(MessageEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HandlerOutcome>> + Send + 'static,
    {
        self.register(Arc::new(async_handler_fn(name, f)), ExecutionMode::Async)
    }

    /// Remove a handler. Returns `false` (and changes nothing) when the id
    /// is unknown.
    pub fn unregister(&self, id: HandlerId) -> bool {
        let (removed, total) = {
            let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
            let pos = entries.iter().position(|e| e.id == id);
            let removed = pos.map(|i| entries.remove(i));
            (removed, entries.len())
        };

        match removed {
            Some(entry) => {
                #[cfg(feature = "metrics")]
                gauge!(registry_metrics::HANDLERS_REGISTERED).set(total as f64);
                info!(handler_id = %id, handler = %entry.name, total, "message handler unregistered");
                true
            },
            None => {
                debug!(handler_id = %id, total, "unregister of unknown handler ignored");
                false
            },
        }
    }

    /// Point-in-time copy of all registrations, in registration order.
    pub fn snapshot(&self) -> Vec<HandlerRegistration> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn get(&self, id: HandlerId) -> Option<HandlerRegistration> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registration summaries with current statistics.
    pub fn summaries(&self) -> Vec<HandlerSummary> {
        self.snapshot()
            .into_iter()
            .map(|e| HandlerSummary {
                id: e.id,
                name: e.name,
                mode: e.mode,
                stats: e.stats.snapshot(),
            })
            .collect()
    }

    /// Remove every registration. Called once at shutdown.
    pub fn clear(&self) -> usize {
        let removed = {
            let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *entries).len()
        };
        #[cfg(feature = "metrics")]
        gauge!(registry_metrics::HANDLERS_REGISTERED).set(0.0);
        info!(removed, "handler registry cleared");
        removed
    }
}
