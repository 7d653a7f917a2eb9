//! Configuration management for the bridge.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default poll cadence in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Default upper bound for a single handler invocation.
pub const DEFAULT_HANDLER_TIMEOUT_MS: u64 = 5_000;

/// File extension (without the dot) that marks an inbox entry as a command.
pub const DEFAULT_PAYLOAD_EXTENSION: &str = "json";

const ENV_LOG_LEVEL: &str = "MODDATA_BRIDGE_LOG_LEVEL";
const ENV_POLL_INTERVAL_SECS: &str = "MODDATA_BRIDGE_POLL_INTERVAL_SECS";

/// Bridge configuration, stored as `config.json` in the base directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Seconds between two poll cycles.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Milliseconds a handler may run before its command is failed.
    #[serde(default = "default_handler_timeout_ms")]
    pub handler_timeout_ms: u64,
    /// Extension of eligible inbox files, without the leading dot.
    #[serde(default = "default_payload_extension")]
    pub payload_extension: String,
    /// Append a line to `events.jsonl` for every archived command.
    #[serde(default = "default_journal_enabled")]
    pub journal_enabled: bool,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_handler_timeout_ms() -> u64 {
    DEFAULT_HANDLER_TIMEOUT_MS
}

fn default_payload_extension() -> String {
    DEFAULT_PAYLOAD_EXTENSION.to_string()
}

fn default_journal_enabled() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            handler_timeout_ms: DEFAULT_HANDLER_TIMEOUT_MS,
            payload_extension: default_payload_extension(),
            journal_enabled: true,
        }
    }
}

impl Config {
    /// Load `config.json` from the base directory, falling back to defaults
    /// when the file does not exist, then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&content)?;
        config.payload_extension = normalize_extension(&config.payload_extension);
        Ok(config)
    }

    /// Save configuration to the base directory.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production). Unparseable values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|v| !v.trim().is_empty()) {
            self.log_level = level.trim().to_string();
        }
        if let Some(secs) = lookup(ENV_POLL_INTERVAL_SECS).and_then(|v| v.trim().parse().ok()) {
            self.poll_interval_secs = secs;
        }
    }

    /// Reject values the runtime cannot work with.
    pub fn validate(&self) -> CoreResult<()> {
        if self.poll_interval_secs == 0 {
            return Err(CoreError::Config(
                "poll_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.handler_timeout_ms == 0 {
            return Err(CoreError::Config(
                "handler_timeout_ms must be greater than zero".to_string(),
            ));
        }
        let ext = &self.payload_extension;
        if ext.is_empty() || ext.contains(['/', '\\', '.']) {
            return Err(CoreError::Config(format!(
                "payload_extension {:?} is not a plain file extension",
                ext
            )));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn handler_timeout(&self) -> Duration {
        Duration::from_millis(self.handler_timeout_ms)
    }
}

fn normalize_extension(raw: &str) -> String {
    raw.trim().trim_start_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.handler_timeout(), Duration::from_secs(5));
        assert_eq!(config.payload_extension, "json");
        assert!(config.journal_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_load_from_file_fills_missing_fields() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(&config_path, r#"{ "log_level": "debug", "payload_extension": ".cmd" }"#)
            .unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.payload_extension, "cmd");
        assert_eq!(config.poll_interval_secs, DEFAULT_POLL_INTERVAL_SECS);
        assert!(config.journal_enabled);
    }

    #[test]
    fn test_config_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config {
            poll_interval_secs: 3,
            journal_enabled: false,
            ..Config::default()
        };
        config.save(&paths).unwrap();

        let loaded = Config::load_from_file(&paths.config_file()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_nonexistent_uses_defaults() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config::load(&paths).unwrap();
        assert_eq!(config.payload_extension, DEFAULT_PAYLOAD_EXTENSION);
        assert_eq!(config.handler_timeout_ms, DEFAULT_HANDLER_TIMEOUT_MS);
    }

    #[test]
    fn test_config_load_invalid_json_fails() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        std::fs::write(paths.config_file(), "{ not json").unwrap();

        assert!(matches!(Config::load(&paths), Err(CoreError::Json(_))));
    }

    #[test]
    fn test_overrides_apply_and_ignore_garbage() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_LOG_LEVEL, "trace"),
            (ENV_POLL_INTERVAL_SECS, "not-a-number"),
        ]);
        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.log_level, "trace");
        assert_eq!(config.poll_interval_secs, DEFAULT_POLL_INTERVAL_SECS);

        config.apply_overrides(|key| (key == ENV_POLL_INTERVAL_SECS).then(|| " 2 ".to_string()));
        assert_eq!(config.poll_interval_secs, 2);
    }

    #[test]
    fn test_validate_rejects_zero_and_bad_extension() {
        let zero_interval = Config {
            poll_interval_secs: 0,
            ..Config::default()
        };
        assert!(zero_interval.validate().is_err());

        let zero_timeout = Config {
            handler_timeout_ms: 0,
            ..Config::default()
        };
        assert!(zero_timeout.validate().is_err());

        for ext in ["", "a/b", "tar.gz"] {
            let config = Config {
                payload_extension: ext.to_string(),
                ..Config::default()
            };
            assert!(config.validate().is_err(), "extension {:?} accepted", ext);
        }
    }
}
