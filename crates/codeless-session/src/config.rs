//! Configuration for the live-edit session.
//!
//! Layered, later layers win:
//!
//! 1. built-in defaults
//! 2. an optional TOML file
//! 3. environment variables:
//!    - `CODELESS_EDITOR_URL`          (default: "ws://127.0.0.1:8765/connect")
//!    - `CODELESS_KEEP_TRYING`         (default: "false")
//!    - `CODELESS_COMMAND_CONCURRENCY` (default: "1")
//!    - `CODELESS_UI_THREAD_NAME`      (default: "ui-context")
//!
//! Command-line flags are applied on top by the binary.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid value {value:?} for {key}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("command_concurrency must be at least 1")]
    ZeroConcurrency,
}

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// WebSocket URL of the editor.
    pub editor_url: String,

    /// Keep retrying the first connection for a long while instead of
    /// trying once.
    pub keep_trying: bool,

    /// Maximum number of units of work running at once per connection.
    pub command_concurrency: usize,

    /// Name of the UI thread.
    pub ui_thread_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            editor_url: "ws://127.0.0.1:8765/connect".to_string(),
            keep_trying: false,
            command_concurrency: 1,
            ui_thread_name: "ui-context".to_string(),
        }
    }
}

impl Config {
    /// Defaults, then environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::default().with_overrides(|key| env::var(key).ok())
    }

    /// Defaults, then `path` (if given), then environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Config::from_toml_str(&text)?
            }
            None => Config::default(),
        };
        base.with_overrides(|key| env::var(key).ok())
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()
    }

    /// Apply `CODELESS_*` overrides read through `lookup`.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("CODELESS_EDITOR_URL") {
            self.editor_url = url;
        }
        if let Some(v) = parse_override(&lookup, "CODELESS_KEEP_TRYING")? {
            self.keep_trying = v;
        }
        if let Some(v) = parse_override(&lookup, "CODELESS_COMMAND_CONCURRENCY")? {
            self.command_concurrency = v;
        }
        if let Some(name) = lookup("CODELESS_UI_THREAD_NAME") {
            self.ui_thread_name = name;
        }
        self.validate()
    }

    /// Retry policy for the first connection attempt.
    pub fn initial_retry_policy(&self) -> RetryPolicy {
        if self.keep_trying {
            RetryPolicy::KEEP_TRYING
        } else {
            RetryPolicy::SINGLE_ATTEMPT
        }
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.command_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(self)
    }
}

fn parse_override<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { key, value }),
        None => Ok(None),
    }
}

/// How often, and how patiently, to (re)open the editor connection.
///
/// Before retry `n` (0-based) the client waits `min(1.4^n, max_interval)`
/// seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub max_interval: Duration,
}

impl RetryPolicy {
    /// One attempt, no retries.
    pub const SINGLE_ATTEMPT: RetryPolicy = RetryPolicy {
        max_retries: 0,
        max_interval: Duration::ZERO,
    };

    pub const KEEP_TRYING: RetryPolicy = RetryPolicy {
        max_retries: 40,
        max_interval: Duration::from_secs(30),
    };

    /// Used to reconnect after an established session dropped.
    pub const AFTER_DISCONNECT: RetryPolicy = RetryPolicy {
        max_retries: 10,
        max_interval: Duration::from_secs(10),
    };

    pub fn delay(&self, retry: u32) -> Duration {
        let backoff = Duration::from_secs_f64(1.4_f64.powi(retry.min(64) as i32));
        backoff.min(self.max_interval)
    }
}
