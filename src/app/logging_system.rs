use super::config::LogLevel;
use parking_lot::RwLock;
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid directive format '{input}'. Expected: 'target=level'")]
    InvalidDirectiveFormat { input: String },

    #[error("Invalid level in directive '{input}': {reason}")]
    InvalidLevel { input: String, reason: String },

    #[error("Logging system initialization failed: {details}")]
    InitFailed { details: String },
}

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogDirective {
    pub target: String,
    pub level: LogLevel,
}

impl LogDirective {
    pub fn new(target: impl Into<String>, level: LogLevel) -> Self {
        Self {
            target: target.into(),
            level,
        }
    }

    pub fn parse(directive: &str) -> Result<Self, LoggingError> {
        let Some((target, level)) = directive.split_once('=') else {
            return Err(LoggingError::InvalidDirectiveFormat {
                input: directive.to_string(),
            });
        };

        let target = target.trim();
        if target.is_empty() || level.contains('=') {
            return Err(LoggingError::InvalidDirectiveFormat {
                input: directive.to_string(),
            });
        }

        let level = level
            .trim()
            .parse::<LogLevel>()
            .map_err(|reason| LoggingError::InvalidLevel {
                input: directive.to_string(),
                reason,
            })?;

        Ok(Self::new(target, level))
    }

    pub fn to_filter_string(&self) -> String {
        format!("{}={}", self.target, self.level.as_str())
    }
}

pub struct LoggingSystem {
    directives: Arc<RwLock<Vec<LogDirective>>>,
}

impl LoggingSystem {
    pub fn new() -> Self {
        Self {
            directives: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn add_directive(&self, directive_str: &str) -> Result<(), LoggingError> {
        let directive = LogDirective::parse(directive_str)?;
        self.directives.write().push(directive);
        Ok(())
    }

    /// Quiets runtime internals that are chatty at debug level.
    pub fn add_default_directives(&self) {
        let defaults = [("mio", LogLevel::Warn), ("tokio_util", LogLevel::Warn)];

        let mut directives = self.directives.write();
        for (target, level) in defaults {
            directives.push(LogDirective::new(target, level));
        }
    }

    pub fn build_filter_string(&self, default_level: LogLevel) -> String {
        let directives = self.directives.read();

        let mut filter_parts = Vec::with_capacity(directives.len() + 1);
        filter_parts.push(default_level.as_str().to_string());
        filter_parts.extend(directives.iter().map(LogDirective::to_filter_string));

        filter_parts.join(",")
    }

    pub fn initialize_tracing(
        &self,
        default_level: LogLevel,
        format: LogFormat,
    ) -> Result<(), LoggingError> {
        let filter_string = self.build_filter_string(default_level);
        let env_filter =
            EnvFilter::try_new(&filter_string).map_err(|e| LoggingError::InitFailed {
                details: format!("Failed to create EnvFilter with '{filter_string}': {e}"),
            })?;

        let registry = tracing_subscriber::registry().with(env_filter);
        let result = match format {
            LogFormat::Compact => registry
                .with(fmt::layer().with_target(true).with_level(true).compact())
                .try_init(),
            LogFormat::Json => registry
                .with(fmt::layer().with_target(true).json())
                .try_init(),
        };

        result.map_err(|e| LoggingError::InitFailed {
            details: format!("Failed to set global tracing subscriber: {e}"),
        })
    }

    pub fn directive_count(&self) -> usize {
        self.directives.read().len()
    }
}

impl Default for LoggingSystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Installs the global subscriber once per process; later calls return the
/// outcome of the first one.
pub fn setup_logging_safe(level: LogLevel, format: LogFormat) -> Result<(), LoggingError> {
    static INIT: OnceLock<Result<(), String>> = OnceLock::new();

    let outcome = INIT.get_or_init(|| {
        let logging_system = LoggingSystem::new();
        logging_system.add_default_directives();
        logging_system
            .initialize_tracing(level, format)
            .map_err(|e| e.to_string())
    });

    outcome
        .clone()
        .map_err(|details| LoggingError::InitFailed { details })
}
