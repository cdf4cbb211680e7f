//! Wire codec for log records and metrics samples.
//!
//! One [`Codec`] with a selectable [`Encoding`]:
//! - `structured`: self-describing JSON objects
//! - `compact`: `|`-delimited text with backslash escaping
//! - `binary`: fixed 29-byte metrics frames (log records fall back to compact)

pub mod binary;
pub mod compact;
pub mod structured;

use crate::domain::{LogRecord, MetricsSample};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Malformed frame: {0}")]
    Malformed(String),
    #[error("Expected a {expected} frame, got a {found} frame")]
    UnexpectedFrame {
        expected: &'static str,
        found: &'static str,
    },
    #[error("Unknown frame tag: {0:#04x}")]
    UnknownTag(u8),
    #[error("Frame length mismatch: expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
}

/// One message handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
}

impl Frame {
    pub fn len(&self) -> usize {
        match self {
            Frame::Text(text) => text.len(),
            Frame::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Text(_) => "text",
            Frame::Binary(_) => "binary",
        }
    }

    pub fn as_text(&self) -> Result<&str, CodecError> {
        match self {
            Frame::Text(text) => Ok(text),
            Frame::Binary(_) => Err(CodecError::UnexpectedFrame {
                expected: "text",
                found: "binary",
            }),
        }
    }

    pub fn as_binary(&self) -> Result<&[u8], CodecError> {
        match self {
            Frame::Binary(bytes) => Ok(bytes),
            Frame::Text(_) => Err(CodecError::UnexpectedFrame {
                expected: "binary",
                found: "text",
            }),
        }
    }
}

/// Wire encoding agreed with the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// JSON objects (default)
    #[default]
    Structured,
    /// Delimited text for bandwidth-sensitive deployments
    Compact,
    /// Compact text for logs, fixed-layout binary for metrics
    Binary,
}

impl Encoding {
    pub fn as_str(self) -> &'static str {
        match self {
            Encoding::Structured => "structured",
            Encoding::Compact => "compact",
            Encoding::Binary => "binary",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "structured" | "json" => Ok(Encoding::Structured),
            "compact" => Ok(Encoding::Compact),
            "binary" => Ok(Encoding::Binary),
            other => Err(format!(
                "unknown encoding '{other}'. Valid values: structured, compact, binary"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Codec {
    encoding: Encoding,
}

impl Codec {
    pub fn new(encoding: Encoding) -> Self {
        Self { encoding }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn encode_log(&self, record: &LogRecord) -> Result<Frame, CodecError> {
        match self.encoding {
            Encoding::Structured => structured::encode_log(record).map(Frame::Text),
            Encoding::Compact | Encoding::Binary => Ok(Frame::Text(compact::encode_log(record))),
        }
    }

    pub fn encode_metrics(&self, sample: &MetricsSample) -> Result<Frame, CodecError> {
        match self.encoding {
            Encoding::Structured => structured::encode_metrics(sample).map(Frame::Text),
            Encoding::Compact => Ok(Frame::Text(compact::encode_metrics(sample))),
            Encoding::Binary => Ok(Frame::Binary(binary::encode_metrics(sample))),
        }
    }

    pub fn decode_log(&self, frame: &Frame) -> Result<LogRecord, CodecError> {
        let text = frame.as_text()?;
        match self.encoding {
            Encoding::Structured => structured::decode_log(text),
            Encoding::Compact | Encoding::Binary => compact::decode_log(text),
        }
    }

    pub fn decode_metrics(&self, frame: &Frame) -> Result<MetricsSample, CodecError> {
        match self.encoding {
            Encoding::Structured => structured::decode_metrics(frame.as_text()?),
            Encoding::Compact => compact::decode_metrics(frame.as_text()?),
            Encoding::Binary => binary::decode_metrics(frame.as_binary()?),
        }
    }
}
