//! Domain layer for rask-telemetry-client.
//!
//! Contains the canonical types shared across all modules:
//! - `LogRecord`: One log event bound for the collector
//! - `Severity`: Log level on the collector's 1..=6 scale
//! - `LogData`: The optional payload attached to a log event
//! - `MetricsSample`: One rounded host utilization snapshot
//! - `ClientError`: Top-level error type

pub mod error;
pub mod log_data;
pub mod log_record;
pub mod metrics_sample;
pub mod severity;

pub use error::ClientError;
pub use log_data::{ErrorDetails, LogData};
pub use log_record::LogRecord;
pub use metrics_sample::MetricsSample;
pub use severity::Severity;
