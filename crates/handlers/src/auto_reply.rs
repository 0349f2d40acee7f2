//! Keyword auto-reply handler.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use {
    anyhow::Result,
    async_trait::async_trait,
    chatrelay_common::{MediaType, MessageEvent},
    chatrelay_config::AutoReplyConfig,
    chatrelay_dispatch::{HandlerOutcome, MessageHandler},
    dashmap::{DashMap, mapref::entry::Entry},
    tracing::{info, warn},
};

use crate::{blocklist::Blocklist, reply::ReplySender};

pub const NAME: &str = "auto_reply";

/// Words and phrases answered by the greeting fallback.
pub const GREETINGS: &[&str] = &[
    "hello",
    "hi",
    "hey",
    "good morning",
    "good afternoon",
    "good evening",
];

/// Replies to messages that match a configured keyword, and acknowledges
/// media messages. Sends at most one reply per event.
pub struct AutoReplyHandler {
    /// Lower-cased keyword → reply, sorted by keyword.
    rules: Vec<(String, String)>,
    media_responses: HashMap<MediaType, String>,
    question_response: Option<String>,
    greeting_response: Option<String>,
    cooldown: Option<Duration>,
    last_reply: DashMap<String, Instant>,
    replies_sent: AtomicU64,
    blocklist: Option<Arc<Blocklist>>,
    skip_commands: bool,
    reply: Arc<dyn ReplySender>,
}

impl AutoReplyHandler {
    pub fn new(config: &AutoReplyConfig, reply: Arc<dyn ReplySender>) -> Self {
        let mut rules: Vec<(String, String)> = config
            .rules
            .iter()
            .map(|(k, v)| (k.trim().to_lowercase(), v.clone()))
            .filter(|(k, _)| !k.is_empty())
            .collect();
        rules.sort_by(|a, b| a.0.cmp(&b.0));
        rules.dedup_by(|a, b| a.0 == b.0);

        let media_responses = config
            .media_responses
            .iter()
            .filter_map(|(kind, text)| match MediaType::parse(kind) {
                Some(media) if !media.is_none() => Some((media, text.clone())),
                _ => {
                    warn!(media_type = %kind, "ignoring auto-reply for unknown media type");
                    None
                },
            })
            .collect();

        let fallback = |text: &Option<String>| text.clone().filter(|t| !t.trim().is_empty());

        Self {
            rules,
            media_responses,
            question_response: fallback(&config.question_response),
            greeting_response: fallback(&config.greeting_response),
            cooldown: (config.cooldown_secs > 0).then(|| Duration::from_secs(config.cooldown_secs)),
            last_reply: DashMap::new(),
            replies_sent: AtomicU64::new(0),
            blocklist: None,
            skip_commands: false,
            reply,
        }
    }

    /// Ignore senders on `blocklist`.
    pub fn with_blocklist(mut self, blocklist: Arc<Blocklist>) -> Self {
        self.blocklist = Some(blocklist);
        self
    }

    /// Leave `/command` messages to the command handler.
    pub fn with_skip_commands(mut self, skip: bool) -> Self {
        self.skip_commands = skip;
        self
    }

    /// Reply text for an event, if any rule applies.
    ///
    /// Media messages use the acknowledgement for their type. Text is
    /// lower-cased and trimmed; an exact match wins, otherwise the longest
    /// keyword contained in the text (ties go to the alphabetically first).
    /// Questions and then greetings fall back to their configured replies.
    pub fn response_for(&self, event: &MessageEvent) -> Option<&str> {
        if event.has_media()
            && let Some(text) = self.media_responses.get(&event.media_type())
        {
            return Some(text);
        }

        let content = event.content().trim().to_lowercase();
        if content.is_empty() || (self.skip_commands && content.starts_with('/')) {
            return None;
        }
        if let Some((_, text)) = self.rules.iter().find(|(k, _)| *k == content) {
            return Some(text);
        }
        let keyword = self
            .rules
            .iter()
            .filter(|(k, _)| content.contains(k.as_str()))
            .fold(None::<&(String, String)>, |best, rule| match best {
                Some(b) if b.0.len() >= rule.0.len() => Some(b),
                _ => Some(rule),
            });
        if let Some((_, text)) = keyword {
            return Some(text);
        }

        if content.ends_with('?')
            && let Some(text) = &self.question_response
        {
            return Some(text);
        }
        match &self.greeting_response {
            Some(text) if is_greeting(&content) => Some(text),
            _ => None,
        }
    }

    pub fn replies_sent(&self) -> u64 {
        self.replies_sent.load(Ordering::Relaxed)
    }

    /// Number of senders currently tracked for cooldown.
    pub fn tracked_senders(&self) -> usize {
        self.last_reply.len()
    }

    /// Claims the reply slot for `sender` at `now`, or returns `false` when
    /// the sender was answered within the cooldown window.
    fn claim_cooldown(&self, sender: &str, now: Instant) -> bool {
        let Some(window) = self.cooldown else {
            return true;
        };
        if !self.last_reply.contains_key(sender) {
            // Expired entries carry no state, drop them before growing.
            self.last_reply
                .retain(|_, at| now.saturating_duration_since(*at) < window);
        }
        match self.last_reply.entry(sender.to_string()) {
            Entry::Occupied(mut e) => {
                if now.saturating_duration_since(*e.get()) < window {
                    return false;
                }
                e.insert(now);
            },
            Entry::Vacant(e) => {
                e.insert(now);
            },
        }
        true
    }

    /// Undo a claim made at `claimed_at` whose reply was never delivered.
    fn release_cooldown(&self, sender: &str, claimed_at: Instant) {
        self.last_reply.remove_if(sender, |_, at| *at == claimed_at);
    }
}

/// Whole-word match for single-word greetings, phrase match for the rest.
fn is_greeting(content: &str) -> bool {
    let words: Vec<&str> = content
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    GREETINGS.iter().any(|greeting| {
        let phrase: Vec<&str> = greeting.split_whitespace().collect();
        words.windows(phrase.len()).any(|w| w == phrase.as_slice())
    })
}

#[async_trait]
impl MessageHandler for AutoReplyHandler {
    fn name(&self) -> &str {
        NAME
    }

    async fn handle(&self, event: &MessageEvent) -> Result<HandlerOutcome> {
        if self
            .blocklist
            .as_ref()
            .is_some_and(|b| b.contains(event.sender_id()))
        {
            return Ok(HandlerOutcome::skipped("sender is blocked"));
        }
        let Some(response) = self.response_for(event) else {
            return Ok(HandlerOutcome::skipped("no matching rule"));
        };
        let now = Instant::now();
        if !self.claim_cooldown(event.sender_id(), now) {
            info!(sender = %event.sender_id(), "skipping auto-reply, sender in cooldown");
            return Ok(HandlerOutcome::skipped("sender in cooldown"));
        }

        if let Err(e) = self.reply.send_reply(event.chat_id(), response).await {
            self.release_cooldown(event.sender_id(), now);
            return Err(e);
        }
        self.replies_sent.fetch_add(1, Ordering::Relaxed);
        info!(
            message_id = %event.message_id(),
            sender = %event.sender_id(),
            chat_id = %event.chat_id(),
            "auto-reply sent"
        );
        Ok(HandlerOutcome::Handled)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::test_support::{RecordingSender, event, media_event},
    };

    fn config(rules: &[(&str, &str)], cooldown_secs: u64) -> AutoReplyConfig {
        AutoReplyConfig {
            enabled: true,
            rules: rules
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            cooldown_secs,
            ..AutoReplyConfig::default()
        }
    }

    fn handler(rules: &[(&str, &str)], cooldown_secs: u64) -> (AutoReplyHandler, Arc<RecordingSender>) {
        let sender = Arc::new(RecordingSender::default());
        let h = AutoReplyHandler::new(&config(rules, cooldown_secs), sender.clone());
        (h, sender)
    }

    #[tokio::test]
    async fn keyword_in_sentence_gets_exactly_one_reply() {
        let (h, sender) = handler(&[("help", "I can help")], 0);

        let out = h.handle(&event("m1", "alice", "I need help please")).await.unwrap();
        assert_eq!(out, HandlerOutcome::Handled);
        assert_eq!(sender.sent(), [("chat@s.whatsapp.net".to_string(), "I can help".to_string())]);

        let out = h.handle(&event("m2", "alice", "goodbye")).await.unwrap();
        assert!(matches!(out, HandlerOutcome::Skipped(_)));
        assert_eq!(sender.sent().len(), 1);
        assert_eq!(h.replies_sent(), 1);
    }

    #[test]
    fn exact_match_beats_longer_partial() {
        let (h, _) = handler(&[("hi", "short"), ("hi there friend", "long"), ("there", "mid")], 0);
        assert_eq!(h.response_for(&event("m", "a", "  HI ")), Some("short"));
        assert_eq!(h.response_for(&event("m", "a", "oh hi there friend!")), Some("long"));
    }

    #[test]
    fn longest_keyword_then_alphabetical() {
        let (h, _) = handler(&[("good", "g"), ("good morning", "gm"), ("abcd", "a"), ("wxyz", "w")], 0);
        assert_eq!(h.response_for(&event("m", "a", "good morning all")), Some("gm"));
        assert_eq!(h.response_for(&event("m", "a", "wxyz abcd")), Some("a"));
        assert_eq!(h.response_for(&event("m", "a", "")), None);
    }

    #[test]
    fn media_gets_acknowledgement() {
        let (h, _) = handler(&[("help", "I can help")], 0);
        let image = media_event(MediaType::Image, "photo.jpg", "help");
        assert_eq!(h.response_for(&image), Some("Thanks for the image!"));
    }

    #[tokio::test]
    async fn cooldown_suppresses_repeat_replies() {
        let (h, sender) = handler(&[("ping", "pong")], 60);
        h.handle(&event("m1", "alice", "ping")).await.unwrap();
        let out = h.handle(&event("m2", "alice", "ping")).await.unwrap();
        assert_eq!(out, HandlerOutcome::skipped("sender in cooldown"));
        h.handle(&event("m3", "bob", "ping")).await.unwrap();
        assert_eq!(sender.sent().len(), 2);
    }

    #[test]
    fn question_and_greeting_fallbacks() {
        let mut cfg = config(&[("price", "See the menu")], 0);
        cfg.question_response = Some("Good question!".into());
        cfg.greeting_response = Some("Hello there!".into());
        let h = AutoReplyHandler::new(&cfg, Arc::new(RecordingSender::default()));

        assert_eq!(h.response_for(&event("m", "a", "what is the price?")), Some("See the menu"));
        assert_eq!(h.response_for(&event("m", "a", "Are you open today?")), Some("Good question!"));
        assert_eq!(h.response_for(&event("m", "a", "Hey, you around")), Some("Hello there!"));
        assert_eq!(h.response_for(&event("m", "a", "good morning team")), Some("Hello there!"));
        // "hi" inside another word is not a greeting.
        assert_eq!(h.response_for(&event("m", "a", "this works")), None);
    }

    #[test]
    fn fallbacks_are_off_by_default() {
        let (h, _) = handler(&[("price", "See the menu")], 0);
        assert_eq!(h.response_for(&event("m", "a", "are you open?")), None);
        assert_eq!(h.response_for(&event("m", "a", "hey")), None);
    }

    #[test]
    fn commands_left_to_command_handler() {
        let sender = Arc::new(RecordingSender::default());
        let h = AutoReplyHandler::new(&config(&[("help", "I can help")], 0), sender)
            .with_skip_commands(true);
        assert_eq!(h.response_for(&event("m", "a", "/help")), None);
        assert_eq!(h.response_for(&event("m", "a", "help")), Some("I can help"));
    }

    #[tokio::test]
    async fn blocked_sender_gets_no_reply() {
        let sender = Arc::new(RecordingSender::default());
        let blocklist = Arc::new(Blocklist::new(["mallory"]));
        let h = AutoReplyHandler::new(&config(&[("ping", "pong")], 0), sender.clone())
            .with_blocklist(Arc::clone(&blocklist));

        let out = h.handle(&event("m1", "mallory", "ping")).await.unwrap();
        assert_eq!(out, HandlerOutcome::skipped("sender is blocked"));
        blocklist.unblock("mallory");
        h.handle(&event("m2", "mallory", "ping")).await.unwrap();
        assert_eq!(sender.sent().len(), 1);
    }

    #[tokio::test]
    async fn failed_send_does_not_start_cooldown() {
        let sender = Arc::new(RecordingSender::failing_times(1));
        let h = AutoReplyHandler::new(&config(&[("ping", "pong")], 60), sender.clone());

        assert!(h.handle(&event("m1", "alice", "ping")).await.is_err());
        let out = h.handle(&event("m2", "alice", "ping")).await.unwrap();
        assert_eq!(out, HandlerOutcome::Handled);
        assert_eq!(sender.sent().len(), 1);

        let out = h.handle(&event("m3", "alice", "ping")).await.unwrap();
        assert_eq!(out, HandlerOutcome::skipped("sender in cooldown"));
    }

    #[tokio::test]
    async fn expired_cooldowns_are_pruned() {
        let (mut h, sender) = handler(&[("ping", "pong")], 60);
        h.cooldown = Some(Duration::from_millis(20));
        for (id, who) in [("m1", "alice"), ("m2", "bob")] {
            h.handle(&event(id, who, "ping")).await.unwrap();
        }
        assert_eq!(h.tracked_senders(), 2);

        tokio::time::sleep(Duration::from_millis(40)).await;
        h.handle(&event("m3", "carol", "ping")).await.unwrap();
        assert_eq!(h.tracked_senders(), 1);
        assert_eq!(sender.sent().len(), 3);
    }

    #[tokio::test]
    async fn send_failure_is_reported() {
        let sender = Arc::new(RecordingSender::failing());
        let h = AutoReplyHandler::new(&config(&[("help", "ok")], 0), sender);
        let err = h.handle(&event("m1", "alice", "help")).await.unwrap_err();
        assert!(err.to_string().contains("bridge down"));
        assert_eq!(h.replies_sent(), 0);
    }
}
