//! Shared types and error definitions used across all chatrelay crates.

pub mod error;
pub mod types;

pub use {
    error::{Error, Result},
    types::{EventType, MediaType, MessageEvent},
};
