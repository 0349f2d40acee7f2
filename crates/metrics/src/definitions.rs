//! Metric name and label definitions.
//!
//! Every metric chatrelay records is named here so the set of exported series
//! is documented in one place.

/// Notification endpoint metrics
pub mod notifications {
    /// Notifications received on the ingestion endpoint
    pub const RECEIVED_TOTAL: &str = "chatrelay_notifications_received_total";
    /// Notifications decoded and dispatched, labelled by media type
    pub const ACCEPTED_TOTAL: &str = "chatrelay_notifications_accepted_total";
    /// Notifications rejected (unreadable body or decode failure), labelled by reason
    pub const REJECTED_TOTAL: &str = "chatrelay_notifications_rejected_total";
}

/// Dispatch engine metrics
pub mod dispatch {
    /// Dispatch cycles started
    pub const CYCLES_TOTAL: &str = "chatrelay_dispatch_cycles_total";
    /// Per-handler results, labelled by status (success, failure, timeout)
    pub const HANDLER_RESULTS_TOTAL: &str = "chatrelay_dispatch_handler_results_total";
    /// Handler execution duration in seconds
    pub const HANDLER_DURATION_SECONDS: &str = "chatrelay_dispatch_handler_duration_seconds";
    /// Whole-cycle duration in seconds
    pub const CYCLE_DURATION_SECONDS: &str = "chatrelay_dispatch_cycle_duration_seconds";
}

/// Handler registry metrics
pub mod registry {
    /// Number of currently registered handlers
    pub const HANDLERS_REGISTERED: &str = "chatrelay_registry_handlers_registered";
}

/// Outbound reply metrics
pub mod replies {
    /// Replies sent through the bridge
    pub const SENT_TOTAL: &str = "chatrelay_replies_sent_total";
    /// Replies the bridge refused or that failed in transit
    pub const FAILED_TOTAL: &str = "chatrelay_replies_failed_total";
}

/// Common label keys
pub mod labels {
    pub const STATUS: &str = "status";
    pub const HANDLER: &str = "handler";
    pub const REASON: &str = "reason";
    pub const MEDIA_TYPE: &str = "media_type";
}

/// Histogram bucket boundaries
pub mod buckets {
    /// Handler duration buckets (in seconds).
    /// Covers 1ms to 2 minutes; handlers may call slow remote services.
    pub const HANDLER_DURATION: &[f64] = &[
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0,
    ];
}
