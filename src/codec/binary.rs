//! Fixed-layout metrics frame: one tag byte followed by seven big-endian
//! `f32` values in the order cpu, mem, io_read, io_write, disk_used,
//! net_in, net_out. Layout and width are fixed by the collector.

use super::CodecError;
use crate::domain::MetricsSample;
use crate::domain::metrics_sample::FIELD_COUNT;
use bytes::{Buf, BufMut, Bytes, BytesMut};

pub const METRICS_TAG: u8 = 0x01;
pub const FRAME_LEN: usize = 1 + FIELD_COUNT * 4;

pub fn encode_metrics(sample: &MetricsSample) -> Bytes {
    let mut buf = BytesMut::with_capacity(FRAME_LEN);
    buf.put_u8(METRICS_TAG);
    for value in sample.to_array() {
        buf.put_f32(value as f32);
    }
    buf.freeze()
}

pub fn decode_metrics(mut frame: &[u8]) -> Result<MetricsSample, CodecError> {
    if frame.len() != FRAME_LEN {
        return Err(CodecError::Length {
            expected: FRAME_LEN,
            actual: frame.len(),
        });
    }

    let tag = frame.get_u8();
    if tag != METRICS_TAG {
        return Err(CodecError::UnknownTag(tag));
    }

    let mut values = [0.0; FIELD_COUNT];
    for slot in &mut values {
        *slot = f64::from(frame.get_f32());
    }
    // f32 widening reintroduces digits past the two decimals that were sent
    Ok(MetricsSample::from_array(values).rounded())
}
