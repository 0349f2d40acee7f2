//! Metrics collection and export for chatrelay.
//!
//! Uses the `metrics` crate facade, so recording is a no-op until a recorder
//! is installed. With the `prometheus` feature, [`init_metrics`] installs a
//! Prometheus recorder whose output the gateway serves on `/metrics`.
//!
//! ```rust,ignore
//! use chatrelay_metrics::{counter, dispatch, labels};
//!
//! counter!(dispatch::HANDLER_RESULTS_TOTAL, labels::STATUS => "success").increment(1);
//! ```

mod definitions;
mod recorder;

pub use {
    definitions::*,
    recorder::{MetricsHandle, MetricsRecorderConfig, init_metrics},
};

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};
