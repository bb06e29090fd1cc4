//! Client configuration.
//!
//! Read from `config.toml` in the platform config directory (or an explicit
//! path), then overridden by `DOCUINTEL_*` environment variables.

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use directories::ProjectDirs;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::library::MAX_UPLOAD_BYTES;
use crate::retry::RetryPolicy;
use crate::workflow::{BackoffPoll, CompletionSignal, FixedDelayPoll};

const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
const CONFIG_FILENAME: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid {key}='{value}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// How the processing monitor decides when to look for classified files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PollStrategy {
    /// One look after a fixed delay.
    #[default]
    Fixed,
    /// Repeated looks with exponential backoff.
    Backoff,
}

impl FromStr for PollStrategy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "backoff" => Ok(Self::Backoff),
            other => Err(format!("unknown poll strategy '{other}' (expected fixed or backoff)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct MonitorConfig {
    pub strategy: PollStrategy,
    /// Pause after the processing notice appears.
    pub settle_delay_ms: u64,
    /// Fixed strategy: wait before the single reconciliation attempt.
    pub first_attempt_delay_ms: u64,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    /// Backoff strategy: reconciliation attempts before giving up.
    pub max_attempts: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            strategy: PollStrategy::Fixed,
            settle_delay_ms: 1_000,
            first_attempt_delay_ms: 4_000,
            backoff_base_ms: 2_000,
            backoff_max_ms: 15_000,
            max_attempts: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SummaryPollConfig {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_attempts: u32,
}

impl Default for SummaryPollConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            max_delay_ms: 8_000,
            max_attempts: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the backend REST API, including the `/api` prefix.
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    /// Advisory per-file upload ceiling; the server has the final say.
    pub max_upload_bytes: u64,
    pub monitor: MonitorConfig,
    pub summary_poll: SummaryPollConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: 30,
            max_upload_bytes: MAX_UPLOAD_BYTES,
            monitor: MonitorConfig::default(),
            summary_poll: SummaryPollConfig::default(),
        }
    }
}

impl ClientConfig {
    /// `<config dir>/docuintel/config.toml`, when the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "docuintel").map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
    }

    /// Load from `path` (must exist) or the default location (may be
    /// absent), then apply environment overrides.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => {
                let expanded = PathBuf::from(shellexpand::tilde(path).to_string());
                Self::from_file(&expanded)?
            }
            None => match Self::default_path() {
                Some(default) if default.exists() => Self::from_file(&default)?,
                _ => Self::default(),
            },
        };
        let config = base.with_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn with_overrides<F>(mut self, mut lookup: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(url) = optional_trimmed_env("DOCUINTEL_API_URL", &mut lookup) {
            self.api_base_url = url;
        }
        if let Some(secs) = parse_optional("DOCUINTEL_TIMEOUT_SECS", &mut lookup)? {
            self.request_timeout_secs = secs;
        }
        if let Some(bytes) = parse_optional("DOCUINTEL_MAX_UPLOAD_BYTES", &mut lookup)? {
            self.max_upload_bytes = bytes;
        }
        if let Some(strategy) = parse_optional("DOCUINTEL_POLL_STRATEGY", &mut lookup)? {
            self.monitor.strategy = strategy;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(ConfigError::InvalidValue {
                key: "api_base_url",
                value: self.api_base_url.clone(),
                reason: "must start with http:// or https://".into(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "request_timeout_secs",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_upload_bytes",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.monitor.backoff_max_ms < self.monitor.backoff_base_ms {
            return Err(ConfigError::InvalidValue {
                key: "monitor.backoff_max_ms",
                value: self.monitor.backoff_max_ms.to_string(),
                reason: "must not be below monitor.backoff_base_ms".into(),
            });
        }
        if self.summary_poll.max_delay_ms < self.summary_poll.base_delay_ms {
            return Err(ConfigError::InvalidValue {
                key: "summary_poll.max_delay_ms",
                value: self.summary_poll.max_delay_ms.to_string(),
                reason: "must not be below summary_poll.base_delay_ms".into(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn completion_signal(&self) -> Arc<dyn CompletionSignal> {
        let monitor = &self.monitor;
        let settle = Duration::from_millis(monitor.settle_delay_ms);
        match monitor.strategy {
            PollStrategy::Fixed => Arc::new(FixedDelayPoll::new(
                settle,
                Duration::from_millis(monitor.first_attempt_delay_ms),
            )),
            PollStrategy::Backoff => Arc::new(BackoffPoll::new(
                settle,
                RetryPolicy::new(monitor.backoff_base_ms, monitor.backoff_max_ms),
                monitor.max_attempts,
            )),
        }
    }

    pub fn summary_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.summary_poll.base_delay_ms, self.summary_poll.max_delay_ms)
    }

    /// JSON schema of the config file.
    pub fn json_schema() -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(ClientConfig)).unwrap_or_default()
    }
}

fn optional_trimmed_env<F>(key: &'static str, lookup: &mut F) -> Option<String>
where
    F: FnMut(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_optional<T, F>(key: &'static str, lookup: &mut F) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: FnMut(&str) -> Option<String>,
{
    let Some(value) = optional_trimmed_env(key, lookup) else {
        return Ok(None);
    };
    value
        .parse::<T>()
        .map(Some)
        .map_err(|err| ConfigError::InvalidValue {
            key,
            value,
            reason: err.to_string(),
        })
}
