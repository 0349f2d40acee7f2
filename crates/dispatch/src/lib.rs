//! Handler registry and fan-out dispatch engine.
//!
//! Flow: decoded [`MessageEvent`](chatrelay_common::MessageEvent) → registry
//! snapshot → one task per registered handler (bounded by a timeout) →
//! [`DispatchReport`] with one [`DispatchResult`] per handler.
//!
//! A handler's error, panic or timeout is contained in its own result and
//! never stops the other handlers from running.

pub mod engine;
pub mod error;
pub mod handler;
pub mod registry;
pub mod stats;

pub use {
    engine::{DispatchConfig, DispatchEngine, DispatchReport, DispatchResult, DispatchStatus},
    error::HandlerError,
    handler::{
        AsyncFnHandler, ExecutionMode, FnHandler, HandlerOutcome, MessageHandler,
        async_handler_fn, handler_fn,
    },
    registry::{HandlerId, HandlerRegistration, HandlerRegistry, HandlerSummary},
    stats::{HandlerStats, HandlerStatsSnapshot},
};
