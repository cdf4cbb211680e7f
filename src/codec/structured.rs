use super::CodecError;
use crate::domain::{LogRecord, MetricsSample};

pub fn encode_log(record: &LogRecord) -> Result<String, CodecError> {
    Ok(serde_json::to_string(record)?)
}

pub fn encode_metrics(sample: &MetricsSample) -> Result<String, CodecError> {
    Ok(serde_json::to_string(sample)?)
}

pub fn decode_log(text: &str) -> Result<LogRecord, CodecError> {
    Ok(serde_json::from_str(text)?)
}

pub fn decode_metrics(text: &str) -> Result<MetricsSample, CodecError> {
    Ok(serde_json::from_str(text)?)
}
