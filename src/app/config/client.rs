use super::serde_helpers::{
    load_env_millis, load_env_string, load_env_var, load_env_var_opt,
};
use super::{ConfigError, LogLevel};
use crate::codec::Encoding;
use crate::transport::TransportOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(5000);
pub const DEFAULT_METRICS_INTERVAL: Duration = Duration::from_millis(20_000);

const FALLBACK_CLIENT_NAME: &str = "rask-telemetry-client";

/// Host name of the machine, used as the client identity when none is configured.
pub fn default_client_name() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_CLIENT_NAME.to_string())
}

/// Client settings. Not modified after the client is built.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Identity the collector attributes the stream to (`name` query value).
    pub name: String,

    /// Collector base URL; `/log` is appended on connect.
    pub collector_address: String,

    /// Passed through as the `auth` query value.
    pub credential: String,

    /// Reconnect after an unexpected close when no close hook is set.
    pub reconnect: bool,

    /// Delay before each reconnect attempt, in milliseconds on the wire.
    #[serde(with = "super::serde_helpers")]
    pub reconnect_interval: Duration,

    /// Reject collectors with an unverifiable TLS certificate.
    pub reject_unauthorized: bool,

    /// Per-message compression; unset leaves the transport default.
    pub per_message_deflate: Option<bool>,

    /// Wire encoding agreed with the collector.
    pub encoding: Encoding,

    /// Period of the metrics sampler, in milliseconds on the wire.
    #[serde(with = "super::serde_helpers")]
    pub metrics_interval: Duration,

    /// Verbosity of the client's own diagnostics.
    pub log_level: LogLevel,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: default_client_name(),
            collector_address: "ws://rask-log-aggregator:9600".to_string(),
            credential: String::new(),
            reconnect: true,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            reject_unauthorized: false,
            per_message_deflate: None,
            encoding: Encoding::Structured,
            metrics_interval: DEFAULT_METRICS_INTERVAL,
            log_level: LogLevel::Info,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("name", &self.name)
            .field("collector_address", &self.collector_address)
            .field("credential", &"<redacted>")
            .field("reconnect", &self.reconnect)
            .field("reconnect_interval", &self.reconnect_interval)
            .field("reject_unauthorized", &self.reject_unauthorized)
            .field("per_message_deflate", &self.per_message_deflate)
            .field("encoding", &self.encoding)
            .field("metrics_interval", &self.metrics_interval)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(
        name: impl Into<String>,
        collector_address: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            collector_address: collector_address.into(),
            credential: credential.into(),
            ..Self::default()
        }
    }

    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            reject_unauthorized: self.reject_unauthorized,
            per_message_deflate: self.per_message_deflate,
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `TELEMETRY_*` variables (and `LOG_LEVEL`).
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = ClientConfig::default();

        load_env_string("TELEMETRY_NAME", &mut config.name);
        load_env_string("TELEMETRY_COLLECTOR_ADDRESS", &mut config.collector_address);
        load_env_string("TELEMETRY_CREDENTIAL", &mut config.credential);
        load_env_var("TELEMETRY_RECONNECT", &mut config.reconnect)?;
        load_env_millis(
            "TELEMETRY_RECONNECT_INTERVAL_MS",
            &mut config.reconnect_interval,
        )?;
        load_env_var(
            "TELEMETRY_REJECT_UNAUTHORIZED",
            &mut config.reject_unauthorized,
        )?;
        load_env_var_opt(
            "TELEMETRY_PER_MESSAGE_DEFLATE",
            &mut config.per_message_deflate,
        )?;
        load_env_var("TELEMETRY_ENCODING", &mut config.encoding)?;
        load_env_millis("TELEMETRY_METRICS_INTERVAL_MS", &mut config.metrics_interval)?;
        load_env_var("LOG_LEVEL", &mut config.log_level)?;

        config.validate()?;
        Ok(config)
    }
}
