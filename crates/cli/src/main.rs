mod config_commands;
mod notify_commands;

use std::{path::PathBuf, time::Duration};

use {
    chatrelay_config::ChatRelayConfig,
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "chatrelay", version, about = "chatrelay: reactive chat notification relay")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery of ./chatrelay.toml and friends).
    #[arg(long, global = true, env = "CHATRELAY_CONFIG")]
    config: Option<PathBuf>,

    // Gateway arguments (used when no subcommand is provided, or with `gateway` subcommand)
    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the notification gateway (default when no subcommand is provided).
    Gateway,
    /// Send a test notification to a running gateway.
    Notify(notify_commands::NotifyArgs),
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Effective gateway config: file and env, then CLI flags, then validation.
fn gateway_config(cli: &Cli) -> anyhow::Result<ChatRelayConfig> {
    let mut config = chatrelay_config::load_or_discover(cli.config.as_deref())?;

    // CLI args override config and env values
    if let Some(bind) = &cli.bind {
        config.server.bind = bind.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let validation = chatrelay_config::validate::validate_config(&config);
    for d in &validation.diagnostics {
        tracing::warn!(path = %d.path, severity = %d.severity, "{}", d.message);
    }
    if validation.has_errors() {
        anyhow::bail!("invalid configuration; run `chatrelay config check` for details");
    }
    Ok(config)
}

/// How long runtime shutdown waits for handler threads still running.
///
/// A blocking handler that outlived its timeout keeps its thread; without a
/// bound the runtime would wait for it forever.
fn shutdown_grace(config: &ChatRelayConfig) -> Duration {
    Duration::from_secs(config.dispatch.handler_timeout_secs)
}

async fn run_gateway(config: &ChatRelayConfig) -> anyhow::Result<()> {
    #[cfg(feature = "metrics")]
    let metrics_handle = Some(chatrelay_metrics::init_metrics(
        chatrelay_metrics::MetricsRecorderConfig {
            enabled: config.metrics.enabled,
            global_labels: Vec::new(),
        },
    )?);

    chatrelay_gateway::server::start_gateway(
        config,
        #[cfg(feature = "metrics")]
        metrics_handle,
    )
    .await
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "chatrelay starting");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match cli.command {
        // Default: start gateway when no subcommand is provided
        None | Some(Commands::Gateway) => {
            let config = gateway_config(&cli)?;
            let result = runtime.block_on(run_gateway(&config));
            let grace = shutdown_grace(&config);
            info!(grace_secs = grace.as_secs(), "waiting for in-flight handlers");
            runtime.shutdown_timeout(grace);
            result
        },
        Some(Commands::Notify(args)) => runtime.block_on(notify_commands::handle_notify(args)),
        Some(Commands::Config { action }) => {
            config_commands::handle_config(action, cli.config.as_deref())
        },
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, clap::CommandFactory};

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_gateway() {
        let cli = Cli::try_parse_from(["chatrelay", "--port", "4000", "--json-logs"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.port, Some(4000));
        assert!(cli.json_logs);
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::try_parse_from(["chatrelay", "gateway", "--bind", "127.0.0.1"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Gateway)));
        assert_eq!(cli.bind.as_deref(), Some("127.0.0.1"));
    }

    #[test]
    fn shutdown_grace_follows_handler_timeout() {
        let mut config = ChatRelayConfig::default();
        assert_eq!(shutdown_grace(&config), Duration::from_secs(30));
        config.dispatch.handler_timeout_secs = 5;
        assert_eq!(shutdown_grace(&config), Duration::from_secs(5));
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chatrelay.toml");
        std::fs::write(&path, "[server]\nport = 4000\n\n[handlers.commands]\nenabled = true\n")
            .unwrap();
        let path = path.to_str().unwrap();

        let cli = Cli::try_parse_from(["chatrelay", "--config", path, "--port", "4100"]).unwrap();
        let config = gateway_config(&cli).unwrap();
        assert_eq!(config.server.port, 4100);
        assert!(config.handlers.commands.enabled);

        let missing = dir.path().join("missing.toml");
        let cli =
            Cli::try_parse_from(["chatrelay", "--config", missing.to_str().unwrap()]).unwrap();
        assert!(gateway_config(&cli).is_err());
    }
}
