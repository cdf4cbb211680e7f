use serde::{Deserialize, Serialize};
use std::error::Error;

/// Payload attached to a log record.
///
/// Resolved once at the call site so that the codec never has to inspect
/// arbitrary values. Native error values are flattened into [`ErrorDetails`]
/// before they get here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogData {
    Text(String),
    Failure(ErrorDetails),
    Structured(serde_json::Value),
}

/// Plain representation of an error as it travels on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorDetails {
    pub name: String,
    pub message: String,
    /// Error headline followed by one `caused by:` line per source.
    pub stack: String,
}

impl ErrorDetails {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        let name = name.into();
        let message = message.into();
        let stack = format!("{name}: {message}");
        Self {
            name,
            message,
            stack,
        }
    }

    pub fn from_error<E>(error: &E) -> Self
    where
        E: Error + ?Sized,
    {
        let name = short_type_name(std::any::type_name::<E>());
        let mut details = Self::new(name, error.to_string());

        let mut source = error.source();
        while let Some(cause) = source {
            details.stack.push_str("\n    caused by: ");
            details.stack.push_str(&cause.to_string());
            source = cause.source();
        }

        details
    }
}

// `core::fmt::Error` -> `Error`, `my::Wrapper<inner::E>` -> `Wrapper`
fn short_type_name(full: &str) -> String {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

impl LogData {
    pub fn failure<E>(error: &E) -> Self
    where
        E: Error + ?Sized,
    {
        LogData::Failure(ErrorDetails::from_error(error))
    }

    pub fn structured<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(LogData::Structured)
    }

    /// Single-string rendering used by the compact encoding.
    pub fn to_compact_text(&self) -> String {
        match self {
            LogData::Text(text) => text.clone(),
            LogData::Failure(details) => details.stack.clone(),
            LogData::Structured(value) => value.to_string(),
        }
    }
}

impl From<&str> for LogData {
    fn from(text: &str) -> Self {
        LogData::Text(text.to_string())
    }
}

impl From<String> for LogData {
    fn from(text: String) -> Self {
        LogData::Text(text)
    }
}

impl From<serde_json::Value> for LogData {
    fn from(value: serde_json::Value) -> Self {
        LogData::Structured(value)
    }
}

impl From<ErrorDetails> for LogData {
    fn from(details: ErrorDetails) -> Self {
        LogData::Failure(details)
    }
}
