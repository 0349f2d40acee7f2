use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::ChatRelayConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "chatrelay.toml",
    "chatrelay.yaml",
    "chatrelay.yml",
    "chatrelay.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<ChatRelayConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./chatrelay.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/chatrelay/chatrelay.{toml,yaml,yml,json}` (user-global)
///
/// Returns `ChatRelayConfig::default()` if no config file is found or the
/// file fails to load.
pub fn discover_and_load() -> ChatRelayConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    ChatRelayConfig::default()
}

/// Load an explicitly given file, or fall back to discovery.
///
/// Unlike [`discover_and_load`], an explicit path that cannot be loaded is an
/// error. Environment overrides are applied in both cases.
pub fn load_or_discover(path: Option<&Path>) -> Result<ChatRelayConfig> {
    let mut config = match path {
        Some(p) => load_config(p)?,
        None => discover_and_load(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/chatrelay/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "chatrelay").map(|d| d.config_dir().to_path_buf())
}

/// Apply `CHATRELAY_*` environment overrides on top of file config.
pub fn apply_env_overrides(config: &mut ChatRelayConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_env_overrides_with(config: &mut ChatRelayConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(bind) = lookup("CHATRELAY_BIND") {
        config.server.bind = bind;
    }
    if let Some(raw) = lookup("CHATRELAY_PORT") {
        match raw.parse() {
            Ok(port) => config.server.port = port,
            Err(_) => warn!(value = %raw, "ignoring invalid CHATRELAY_PORT"),
        }
    }
    if let Some(url) = lookup("CHATRELAY_BRIDGE_URL") {
        config.bridge.base_url = url;
    }
    if let Some(raw) = lookup("CHATRELAY_HANDLER_TIMEOUT_SECS") {
        match raw.parse() {
            Ok(secs) => config.dispatch.handler_timeout_secs = secs,
            Err(_) => warn!(value = %raw, "ignoring invalid CHATRELAY_HANDLER_TIMEOUT_SECS"),
        }
    }
}

pub(crate) fn parse_config(raw: &str, path: &Path) -> Result<ChatRelayConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => toml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| Error::parse(path, e)),
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse(path, e)),
        _ => Err(Error::UnsupportedFormat(ext.to_string())),
    }
}

/// Parse into an untyped tree, used by validation to spot unknown keys.
pub(crate) fn parse_config_value(raw: &str, path: &Path) -> Result<serde_json::Value> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => {
            let v: toml::Value = toml::from_str(raw).map_err(|e| Error::parse(path, e))?;
            serde_json::to_value(v).map_err(|e| Error::parse(path, e))
        },
        "yaml" | "yml" => {
            let v: serde_yaml::Value =
                serde_yaml::from_str(raw).map_err(|e| Error::parse(path, e))?;
            serde_json::to_value(v).map_err(|e| Error::parse(path, e))
        },
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse(path, e)),
        _ => Err(Error::UnsupportedFormat(ext.to_string())),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, std::fs};

    #[test]
    fn loads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chatrelay.toml");
        fs::write(
            &path,
            "[server]\nport = 3100\n\n[dispatch]\nhandler_timeout_secs = 5\n",
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.server.port, 3100);
        assert_eq!(cfg.dispatch.handler_timeout_secs, 5);
        assert_eq!(cfg.bridge.request_timeout_secs, 10);
    }

    #[test]
    fn loads_yaml_and_json_files() {
        let dir = tempfile::tempdir().unwrap();

        let yaml = dir.path().join("chatrelay.yaml");
        fs::write(
            &yaml,
            "handlers:\n  forward:\n    enabled: true\n    destination: ops@g.us\n    keywords: [urgent]\n",
        )
        .unwrap();
        let cfg = load_config(&yaml).unwrap();
        assert!(cfg.handlers.forward.enabled);
        assert_eq!(cfg.handlers.forward.destination.as_deref(), Some("ops@g.us"));
        assert_eq!(cfg.handlers.forward.keywords, ["urgent"]);

        let json = dir.path().join("chatrelay.json");
        fs::write(&json, r#"{"bridge": {"base_url": "http://bridge:8080/api"}}"#).unwrap();
        let cfg = load_config(&json).unwrap();
        assert_eq!(cfg.bridge.base_url, "http://bridge:8080/api");
    }

    #[test]
    fn reports_parse_and_format_errors() {
        let dir = tempfile::tempdir().unwrap();

        let bad = dir.path().join("chatrelay.toml");
        fs::write(&bad, "[server\nport = 1").unwrap();
        assert!(matches!(load_config(&bad).unwrap_err(), Error::Parse { .. }));

        let ini = dir.path().join("chatrelay.ini");
        fs::write(&ini, "port=1").unwrap();
        assert!(matches!(
            load_config(&ini).unwrap_err(),
            Error::UnsupportedFormat(ref ext) if ext == "ini"
        ));

        let missing = dir.path().join("nope.toml");
        assert!(matches!(load_config(&missing).unwrap_err(), Error::Read { .. }));
        assert!(load_or_discover(Some(&missing)).is_err());
    }

    #[test]
    fn env_overrides_apply_and_skip_garbage() {
        let mut cfg = ChatRelayConfig::default();
        apply_env_overrides_with(&mut cfg, |name| match name {
            "CHATRELAY_BIND" => Some("127.0.0.1".into()),
            "CHATRELAY_PORT" => Some("not-a-port".into()),
            "CHATRELAY_BRIDGE_URL" => Some("http://bridge:9000/api".into()),
            "CHATRELAY_HANDLER_TIMEOUT_SECS" => Some("7".into()),
            _ => None,
        });
        assert_eq!(cfg.server.bind, "127.0.0.1");
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.bridge.base_url, "http://bridge:9000/api");
        assert_eq!(cfg.dispatch.handler_timeout_secs, 7);
    }

    #[test]
    fn untyped_parse_matches_format() {
        let path = Path::new("chatrelay.yml");
        let value = parse_config_value("server:\n  port: 1\n", path).unwrap();
        assert_eq!(value["server"]["port"], 1);
    }
}
