use super::{LogData, Severity};
use serde::{Deserialize, Serialize};

/// A single log event bound for the collector.
///
/// Built once per `log` call and dropped after the send attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub level: Severity,
    pub channel: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<LogData>,
}

impl LogRecord {
    pub fn new(level: Severity, channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            channel: channel.into(),
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: impl Into<LogData>) -> Self {
        self.data = Some(data.into());
        self
    }
}
