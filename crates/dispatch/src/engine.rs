use std::{
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};

use {
    chatrelay_common::MessageEvent,
    futures::future::join_all,
    serde::Serialize,
    tokio::{runtime::Handle, task::JoinHandle},
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use chatrelay_metrics::{counter, dispatch as dispatch_metrics, histogram, labels};

use crate::{
    error::HandlerError,
    handler::{ExecutionMode, HandlerOutcome},
    registry::{HandlerId, HandlerRegistration, HandlerRegistry},
};

// ── Types ───────────────────────────────────────────────────────────────────

/// Terminal status of one handler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    Success,
    Failure,
    Timeout,
}

impl DispatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of running one handler against one event.
#[derive(Debug, Clone)]
pub struct DispatchResult {
    pub handler_id: HandlerId,
    pub handler_name: String,
    pub status: DispatchStatus,
    /// Set for `Failure` and `Timeout`.
    pub error: Option<HandlerError>,
    /// Set for `Success`.
    pub outcome: Option<HandlerOutcome>,
    pub duration: Duration,
}

impl DispatchResult {
    pub fn is_success(&self) -> bool {
        self.status == DispatchStatus::Success
    }
}

/// Results of one dispatch cycle, ordered like the registry snapshot.
#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub message_id: String,
    pub results: Vec<DispatchResult>,
    pub duration: Duration,
}

impl DispatchReport {
    pub fn count(&self, status: DispatchStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(DispatchResult::is_success)
    }
}

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Upper bound on a single handler invocation.
    pub handler_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            handler_timeout: Duration::from_secs(30),
        }
    }
}

// ── DispatchEngine ──────────────────────────────────────────────────────────

/// Fans an event out to every registered handler.
///
/// Each handler runs in its own task, so an error, a panic or a hung handler
/// affects only that handler's result.
#[derive(Clone)]
pub struct DispatchEngine {
    registry: Arc<HandlerRegistry>,
    config: DispatchConfig,
}

impl DispatchEngine {
    pub fn new(registry: Arc<HandlerRegistry>, config: DispatchConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Run every currently registered handler and wait for all of them.
    ///
    /// Handlers registered or unregistered while the cycle runs do not
    /// affect it.
    pub async fn dispatch(&self, event: Arc<MessageEvent>) -> DispatchReport {
        let snapshot = self.registry.snapshot();
        run_cycle(snapshot, event, self.config.handler_timeout).await
    }

    /// Start a dispatch cycle in the background and return immediately.
    ///
    /// The registry snapshot is taken before this returns.
    pub fn dispatch_detached(&self, event: Arc<MessageEvent>) -> JoinHandle<DispatchReport> {
        let snapshot = self.registry.snapshot();
        let timeout = self.config.handler_timeout;
        tokio::spawn(run_cycle(snapshot, event, timeout))
    }
}

async fn run_cycle(
    snapshot: Vec<HandlerRegistration>,
    event: Arc<MessageEvent>,
    timeout: Duration,
) -> DispatchReport {
    let started = Instant::now();

    #[cfg(feature = "metrics")]
    counter!(dispatch_metrics::CYCLES_TOTAL).increment(1);

    if snapshot.is_empty() {
        debug!(message_id = %event.message_id(), "no handlers registered, nothing to dispatch");
    }

    // Spawn everything before awaiting anything so handlers run concurrently.
    let running: Vec<_> = snapshot
        .into_iter()
        .map(|registration| {
            let task = spawn_handler(&registration, Arc::clone(&event));
            supervise(registration, task, timeout)
        })
        .collect();
    let results = join_all(running).await;

    let report = DispatchReport {
        message_id: event.message_id().to_string(),
        results,
        duration: started.elapsed(),
    };

    #[cfg(feature = "metrics")]
    histogram!(dispatch_metrics::CYCLE_DURATION_SECONDS).record(report.duration.as_secs_f64());

    info!(
        message_id = %report.message_id,
        handlers = report.results.len(),
        succeeded = report.count(DispatchStatus::Success),
        failed = report.count(DispatchStatus::Failure),
        timed_out = report.count(DispatchStatus::Timeout),
        elapsed_ms = report.duration.as_millis() as u64,
        "dispatch cycle complete"
    );
    report
}

type HandlerTask = JoinHandle<anyhow::Result<HandlerOutcome>>;

fn spawn_handler(registration: &HandlerRegistration, event: Arc<MessageEvent>) -> HandlerTask {
    let handler = Arc::clone(&registration.handler);
    match registration.mode {
        ExecutionMode::Async => tokio::spawn(async move { handler.handle(&event).await }),
        ExecutionMode::Blocking => {
            let rt = Handle::current();
            tokio::task::spawn_blocking(move || rt.block_on(handler.handle(&event)))
        },
    }
}

async fn supervise(
    registration: HandlerRegistration,
    mut task: HandlerTask,
    timeout: Duration,
) -> DispatchResult {
    let started = Instant::now();
    let (status, outcome, error) = match tokio::time::timeout(timeout, &mut task).await {
        Ok(Ok(Ok(outcome))) => (DispatchStatus::Success, Some(outcome), None),
        Ok(Ok(Err(e))) => (
            DispatchStatus::Failure,
            None,
            Some(HandlerError::Failed(format!("{e:#}"))),
        ),
        Ok(Err(join_err)) => (
            DispatchStatus::Failure,
            None,
            Some(HandlerError::from_join(join_err)),
        ),
        Err(_) => {
            // Blocking-pool work cannot be interrupted; it is abandoned.
            task.abort();
            (
                DispatchStatus::Timeout,
                None,
                Some(HandlerError::TimedOut(timeout)),
            )
        },
    };
    let duration = started.elapsed();
    registration.stats.record(status, duration);

    #[cfg(feature = "metrics")]
    {
        counter!(
            dispatch_metrics::HANDLER_RESULTS_TOTAL,
            labels::HANDLER => registration.name.clone(),
            labels::STATUS => status.as_str()
        )
        .increment(1);
        histogram!(
            dispatch_metrics::HANDLER_DURATION_SECONDS,
            labels::HANDLER => registration.name.clone()
        )
        .record(duration.as_secs_f64());
    }

    match (&outcome, &error) {
        (Some(HandlerOutcome::Skipped(reason)), _) => {
            debug!(handler_id = %registration.id, handler = %registration.name, %reason, "handler skipped event");
        },
        (_, Some(e)) => {
            warn!(
                handler_id = %registration.id,
                handler = %registration.name,
                %status,
                error = %e,
                "message handler did not complete"
            );
        },
        _ => {
            debug!(
                handler_id = %registration.id,
                handler = %registration.name,
                elapsed_ms = duration.as_millis() as u64,
                "handler completed"
            );
        },
    }

    DispatchResult {
        handler_id: registration.id,
        handler_name: registration.name,
        status,
        error,
        outcome,
        duration,
    }
}
