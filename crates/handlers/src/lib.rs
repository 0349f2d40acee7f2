//! Built-in message handlers and the outbound reply capability they use.
//!
//! - [`CommandHandler`]: `/help`, `/status`, `/time`, `/stats`, `/block`, `/unblock`
//! - [`AutoReplyHandler`]: keyword and media auto-replies
//! - [`ForwardHandler`]: forwards matching messages to another chat
//! - [`MessageStatsHandler`]: per-sender and per-media counters
//! - [`LoggingHandler`]: logs each message (blocking mode)

pub mod auto_reply;
pub mod blocklist;
pub mod commands;
pub mod forward;
pub mod logging;
pub mod reply;
pub mod stats;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use {
    chatrelay_config::HandlersConfig,
    chatrelay_dispatch::{ExecutionMode, HandlerRegistry},
    tracing::{info, warn},
};

pub use {
    auto_reply::AutoReplyHandler,
    blocklist::Blocklist,
    commands::{Command, CommandHandler},
    forward::ForwardHandler,
    logging::LoggingHandler,
    reply::{BridgeReplySender, ReplySender},
    stats::{MessageStatsHandler, SenderSnapshot, StatsSnapshot},
};

/// Register every handler enabled in `config`.
///
/// Order: logging, stats, commands, auto-reply, forward. The replying
/// handlers share one [`Blocklist`] seeded from `blocked_senders`.
///
/// Returns the statistics handler when it is enabled, so callers can expose
/// its snapshot.
pub fn install_reference_handlers(
    config: &HandlersConfig,
    registry: &HandlerRegistry,
    reply: Arc<dyn ReplySender>,
) -> Option<Arc<MessageStatsHandler>> {
    if config.logging.enabled {
        registry.register(Arc::new(LoggingHandler), ExecutionMode::Blocking);
    }

    let stats = config.stats.enabled.then(|| {
        let stats = Arc::new(MessageStatsHandler::new());
        registry.register(stats.clone(), ExecutionMode::Async);
        stats
    });

    let blocklist = Arc::new(Blocklist::new(config.blocked_senders.iter().cloned()));

    if config.commands.enabled {
        let handler = CommandHandler::new(Arc::clone(&blocklist), Arc::clone(&reply))
            .with_stats(stats.clone())
            .with_auto_reply_enabled(config.auto_reply.enabled);
        registry.register(Arc::new(handler), ExecutionMode::Async);
    }

    if config.auto_reply.enabled {
        let handler = AutoReplyHandler::new(&config.auto_reply, Arc::clone(&reply))
            .with_blocklist(Arc::clone(&blocklist))
            .with_skip_commands(config.commands.enabled);
        registry.register(Arc::new(handler), ExecutionMode::Async);
    }

    if config.forward.enabled {
        match ForwardHandler::new(&config.forward, Arc::clone(&reply)) {
            Some(handler) => {
                let handler = handler.with_blocklist(Arc::clone(&blocklist));
                registry.register(Arc::new(handler), ExecutionMode::Async);
            },
            None => warn!("forwarding enabled without a destination, handler not installed"),
        }
    }

    info!(
        handlers = registry.len(),
        blocked_senders = blocklist.len(),
        "reference handlers installed"
    );
    stats
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        chatrelay_dispatch::{HandlerOutcome, MessageHandler},
        test_support::RecordingSender,
    };

    fn names(registry: &HandlerRegistry) -> Vec<(String, ExecutionMode)> {
        registry
            .snapshot()
            .into_iter()
            .map(|r| (r.name, r.mode))
            .collect()
    }

    #[test]
    fn defaults_install_logging_and_stats() {
        let registry = HandlerRegistry::new();
        let installed = install_reference_handlers(
            &HandlersConfig::default(),
            &registry,
            Arc::new(RecordingSender::default()),
        );
        assert!(installed.is_some());
        assert_eq!(names(&registry), [
            (logging::NAME.to_string(), ExecutionMode::Blocking),
            (stats::NAME.to_string(), ExecutionMode::Async),
        ]);
    }

    #[test]
    fn installs_enabled_handlers_only() {
        let mut config = HandlersConfig::default();
        config.logging.enabled = false;
        config.stats.enabled = false;
        config.auto_reply.enabled = true;
        config.forward.enabled = true;

        let registry = HandlerRegistry::new();
        let installed =
            install_reference_handlers(&config, &registry, Arc::new(RecordingSender::default()));
        assert!(installed.is_none());
        // Forwarding has no destination, so only auto-reply is installed.
        assert_eq!(names(&registry), [(
            auto_reply::NAME.to_string(),
            ExecutionMode::Async
        )]);
    }

    #[tokio::test]
    async fn commands_share_blocklist_with_auto_reply() {
        let mut config = HandlersConfig::default();
        config.logging.enabled = false;
        config.commands.enabled = true;
        config.auto_reply.enabled = true;
        config.auto_reply.cooldown_secs = 0;

        let registry = HandlerRegistry::new();
        let sender = Arc::new(RecordingSender::default());
        install_reference_handlers(&config, &registry, sender.clone());
        let handlers = registry.snapshot();
        assert_eq!(
            handlers.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
            [stats::NAME, commands::NAME, auto_reply::NAME]
        );
        let (commands, auto_reply) = (&handlers[1].handler, &handlers[2].handler);

        let help = test_support::event("m1", "alice", "/help");
        commands.handle(&help).await.unwrap();
        // The keyword "help" inside a command is not auto-replied.
        assert!(matches!(
            auto_reply.handle(&help).await.unwrap(),
            HandlerOutcome::Skipped(_)
        ));

        commands
            .handle(&test_support::event("m2", "alice", "/block"))
            .await
            .unwrap();
        let out = auto_reply
            .handle(&test_support::event("m3", "alice", "ping"))
            .await
            .unwrap();
        assert_eq!(out, HandlerOutcome::skipped("sender is blocked"));
        assert_eq!(sender.sent().len(), 2);
    }
}
