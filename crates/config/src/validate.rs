//! Configuration validation.
//!
//! Reports syntax and type errors, unknown (likely misspelled) keys, and
//! semantic problems such as a zero handler timeout or forwarding enabled
//! without a destination.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use serde_json::Value;

use crate::{
    loader::{find_config_file, parse_config, parse_config_value},
    schema::ChatRelayConfig,
};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "semantic", "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "handlers.forward.destination"
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn new(
        severity: Severity,
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}: {}", self.severity, self.message)
        } else {
            write!(f, "{} [{}]: {}", self.severity, self.path, self.message)
        }
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

/// Keys whose values are free-form maps, not further checked.
const OPAQUE_MAPS: &[&str] = &["handlers.auto_reply.rules", "handlers.auto_reply.media_responses"];

const MEDIA_KEYS: &[&str] = &["image", "video", "audio", "document"];

/// Validate a config file at the given path, or the discovered one if `path`
/// is `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = path.map(Path::to_path_buf).or_else(find_config_file);

    let Some(actual_path) = config_path else {
        let mut result = validate_config(&ChatRelayConfig::default());
        result.diagnostics.insert(
            0,
            Diagnostic::new(
                Severity::Info,
                "file-ref",
                "",
                "no config file found; using defaults",
            ),
        );
        return result;
    };

    let mut result = match std::fs::read_to_string(&actual_path) {
        Ok(content) => validate_str(&content, &actual_path),
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                format!("failed to read config file: {e}"),
            )],
            config_path: None,
        },
    };
    result.config_path = Some(actual_path);
    result
}

/// Validate config text. The format is taken from `path`'s extension.
#[must_use]
pub fn validate_str(raw: &str, path: &Path) -> ValidationResult {
    let raw = crate::env_subst::substitute_env(raw);

    // 1. Syntax
    let tree = match parse_config_value(&raw, path) {
        Ok(v) => v,
        Err(e) => {
            return ValidationResult {
                diagnostics: vec![Diagnostic::new(Severity::Error, "syntax", "", e.to_string())],
                config_path: None,
            };
        },
    };

    // 2. Unknown fields
    let mut diagnostics = Vec::new();
    if let Ok(known) = serde_json::to_value(ChatRelayConfig::default()) {
        check_unknown_fields(&tree, &known, "", &mut diagnostics);
    }

    // 3. Types, then semantics on the typed config
    match parse_config(&raw, path) {
        Ok(config) => diagnostics.extend(validate_config(&config).diagnostics),
        Err(e) => diagnostics.push(Diagnostic::new(
            Severity::Error,
            "type-error",
            "",
            e.to_string(),
        )),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

/// Semantic checks on an already parsed configuration.
#[must_use]
pub fn validate_config(config: &ChatRelayConfig) -> ValidationResult {
    let mut diagnostics = Vec::new();

    if config.dispatch.handler_timeout_secs == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "semantic",
            "dispatch.handler_timeout_secs",
            "handler timeout must be greater than zero",
        ));
    }

    match url::Url::parse(&config.bridge.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {},
        Ok(url) => diagnostics.push(Diagnostic::new(
            Severity::Error,
            "semantic",
            "bridge.base_url",
            format!("unsupported scheme '{}', expected http or https", url.scheme()),
        )),
        Err(e) => diagnostics.push(Diagnostic::new(
            Severity::Error,
            "semantic",
            "bridge.base_url",
            format!("invalid URL '{}': {e}", config.bridge.base_url),
        )),
    }

    if config.bridge.request_timeout_secs == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "semantic",
            "bridge.request_timeout_secs",
            "zero request timeout; outbound replies will fail immediately",
        ));
    }

    let auto_reply = &config.handlers.auto_reply;
    if auto_reply.rules.keys().any(|k| k.trim().is_empty()) {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "semantic",
            "handlers.auto_reply.rules",
            "auto-reply keyword must not be empty",
        ));
    }
    for key in auto_reply.media_responses.keys() {
        if !MEDIA_KEYS.contains(&key.to_ascii_lowercase().as_str()) {
            diagnostics.push(Diagnostic::new(
                Severity::Warning,
                "semantic",
                format!("handlers.auto_reply.media_responses.{key}"),
                format!("unknown media type; expected one of {}", MEDIA_KEYS.join(", ")),
            ));
        }
    }
    if auto_reply.enabled && auto_reply.rules.is_empty() && auto_reply.media_responses.is_empty() {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "semantic",
            "handlers.auto_reply",
            "auto-reply is enabled but has no rules; it will never reply",
        ));
    }
    for (field, response) in [
        ("question_response", &auto_reply.question_response),
        ("greeting_response", &auto_reply.greeting_response),
    ] {
        if response.as_deref().is_some_and(|r| r.trim().is_empty()) {
            diagnostics.push(Diagnostic::new(
                Severity::Warning,
                "semantic",
                format!("handlers.auto_reply.{field}"),
                "empty fallback reply; remove the key to disable it",
            ));
        }
    }

    if config
        .handlers
        .blocked_senders
        .iter()
        .any(|s| s.trim().is_empty())
    {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "semantic",
            "handlers.blocked_senders",
            "empty sender identifier in blocklist",
        ));
    }

    let forward = &config.handlers.forward;
    if forward.enabled {
        if forward
            .destination
            .as_deref()
            .is_none_or(|d| d.trim().is_empty())
        {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "semantic",
                "handlers.forward.destination",
                "forwarding is enabled but no destination is set",
            ));
        }
        if forward.senders.is_empty() && forward.keywords.is_empty() {
            diagnostics.push(Diagnostic::new(
                Severity::Warning,
                "semantic",
                "handlers.forward",
                "forwarding is enabled but has no senders or keywords; nothing will be forwarded",
            ));
        }
    }
    if forward.keywords.iter().any(|k| k.trim().is_empty()) {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "semantic",
            "handlers.forward.keywords",
            "forward keyword must not be empty",
        ));
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

/// Walk the parsed tree against the default config's shape.
fn check_unknown_fields(value: &Value, known: &Value, prefix: &str, out: &mut Vec<Diagnostic>) {
    let (Value::Object(table), Value::Object(fields)) = (value, known) else {
        return;
    };
    for (key, child) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match fields.get(key) {
            Some(_) if OPAQUE_MAPS.contains(&path.as_str()) => {},
            Some(child_known) => check_unknown_fields(child, child_known, &path, out),
            None => {
                let candidates: Vec<&str> = fields.keys().map(String::as_str).collect();
                let message = match suggest(key, &candidates, 3) {
                    Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
                    None => "unknown field".to_string(),
                };
                out.push(Diagnostic::new(Severity::Error, "unknown-field", path, message));
            },
        }
    }
}

/// Closest candidate within `max_distance` edits.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|c| (*c, levenshtein(needle, c)))
        .filter(|(_, d)| *d <= max_distance)
        .min_by_key(|(_, d)| *d)
        .map(|(c, _)| c)
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}
