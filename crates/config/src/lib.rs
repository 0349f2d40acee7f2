//! Configuration loading, validation and env substitution.
//!
//! Config files: `chatrelay.toml`, `chatrelay.yaml`, `chatrelay.yml` or
//! `chatrelay.json`, searched in `./` then the user config directory
//! (`~/.config/chatrelay/` on Linux).
//!
//! Supports `${ENV_VAR}` substitution in all string values, and a handful of
//! `CHATRELAY_*` environment overrides applied after parsing.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{
        apply_env_overrides, config_dir, discover_and_load, find_config_file, load_config,
        load_or_discover,
    },
    schema::{
        AutoReplyConfig, BridgeConfig, ChatRelayConfig, CommandsConfig, DispatchSettings,
        ForwardConfig, HandlersConfig, LoggingHandlerConfig, MetricsConfig, ServerConfig, StatsConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult},
};
