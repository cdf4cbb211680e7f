//! Delimited text frames.
//!
//! Log frame: `level|channel|message|data`. Metrics frame:
//! `0|cpu|mem_used|io_read|io_write|disk_used|net_in|net_out`.
//!
//! Inside every field `\` is written as `\\` and `|` as `\|`, so any text
//! survives a round trip. The collector must apply the same unescaping.

use super::CodecError;
use crate::domain::metrics_sample::FIELD_COUNT;
use crate::domain::{LogData, LogRecord, MetricsSample, Severity};

pub const DELIMITER: char = '|';
pub const ESCAPE: char = '\\';
/// Level slot value that marks a metrics frame.
pub const METRICS_LEVEL: u8 = 0;

const LOG_FIELDS: usize = 4;

fn push_escaped(out: &mut String, field: &str) {
    for ch in field.chars() {
        if ch == DELIMITER || ch == ESCAPE {
            out.push(ESCAPE);
        }
        out.push(ch);
    }
}

/// Splits a frame on unescaped delimiters and unescapes each field.
pub fn split_fields(frame: &str) -> Result<Vec<String>, CodecError> {
    let mut fields = Vec::with_capacity(LOG_FIELDS);
    let mut current = String::new();
    let mut chars = frame.chars();

    while let Some(ch) = chars.next() {
        match ch {
            ESCAPE => match chars.next() {
                Some(next @ (DELIMITER | ESCAPE)) => current.push(next),
                Some(other) => {
                    return Err(CodecError::Malformed(format!(
                        "invalid escape sequence '{ESCAPE}{other}'"
                    )));
                }
                None => {
                    return Err(CodecError::Malformed(
                        "dangling escape at end of frame".to_string(),
                    ));
                }
            },
            DELIMITER => fields.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    fields.push(current);

    Ok(fields)
}

pub fn encode_log(record: &LogRecord) -> String {
    let data = record
        .data
        .as_ref()
        .map(LogData::to_compact_text)
        .unwrap_or_default();

    let mut out =
        String::with_capacity(record.channel.len() + record.message.len() + data.len() + 8);
    out.push_str(&record.level.to_string());
    out.push(DELIMITER);
    push_escaped(&mut out, &record.channel);
    out.push(DELIMITER);
    push_escaped(&mut out, &record.message);
    out.push(DELIMITER);
    push_escaped(&mut out, &data);
    out
}

/// Decodes a log frame. Typed payloads do not survive the compact
/// encoding: any non-empty data field comes back as `LogData::Text`.
pub fn decode_log(frame: &str) -> Result<LogRecord, CodecError> {
    let fields = split_fields(frame)?;
    let Ok([level, channel, message, data]) = <[String; LOG_FIELDS]>::try_from(fields) else {
        return Err(CodecError::Malformed(format!(
            "log frame must have {LOG_FIELDS} fields"
        )));
    };

    let level = level
        .parse::<u8>()
        .ok()
        .and_then(Severity::new)
        .ok_or_else(|| CodecError::Malformed(format!("invalid level '{level}'")))?;

    Ok(LogRecord {
        level,
        channel,
        message,
        data: (!data.is_empty()).then_some(LogData::Text(data)),
    })
}

pub fn encode_metrics(sample: &MetricsSample) -> String {
    let mut out = METRICS_LEVEL.to_string();
    for value in sample.to_array() {
        out.push(DELIMITER);
        out.push_str(&value.to_string());
    }
    out
}

pub fn decode_metrics(frame: &str) -> Result<MetricsSample, CodecError> {
    let fields = split_fields(frame)?;
    if fields.len() != FIELD_COUNT + 1 {
        return Err(CodecError::Malformed(format!(
            "metrics frame must have {} fields, got {}",
            FIELD_COUNT + 1,
            fields.len()
        )));
    }
    if fields[0] != METRICS_LEVEL.to_string() {
        return Err(CodecError::Malformed(format!(
            "metrics frame must start with level {METRICS_LEVEL}"
        )));
    }

    let mut values = [0.0; FIELD_COUNT];
    for (slot, field) in values.iter_mut().zip(&fields[1..]) {
        *slot = field
            .parse()
            .map_err(|_| CodecError::Malformed(format!("invalid metric value '{field}'")))?;
    }

    Ok(MetricsSample::from_array(values))
}
