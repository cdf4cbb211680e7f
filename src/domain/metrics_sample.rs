use serde::{Deserialize, Serialize};

/// One snapshot of host utilization.
///
/// Field names on the wire follow the collector's metrics map
/// (`cpu`, `mem_used`, `io_read`, ...). The declaration order is also the
/// order used by the compact and binary encodings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSample {
    /// One-minute load average scaled by 100.
    #[serde(rename = "cpu")]
    pub cpu_load: f64,
    #[serde(rename = "mem_used")]
    pub mem_used_pct: f64,
    /// Bytes read per second across all disks.
    #[serde(rename = "io_read")]
    pub io_read_per_sec: f64,
    /// Bytes written per second across all disks.
    #[serde(rename = "io_write")]
    pub io_write_per_sec: f64,
    #[serde(rename = "disk_used")]
    pub disk_used_pct: f64,
    #[serde(rename = "net_in")]
    pub net_in_mbps: f64,
    #[serde(rename = "net_out")]
    pub net_out_mbps: f64,
}

pub const FIELD_COUNT: usize = 7;

impl MetricsSample {
    pub fn to_array(&self) -> [f64; FIELD_COUNT] {
        [
            self.cpu_load,
            self.mem_used_pct,
            self.io_read_per_sec,
            self.io_write_per_sec,
            self.disk_used_pct,
            self.net_in_mbps,
            self.net_out_mbps,
        ]
    }

    pub fn from_array(values: [f64; FIELD_COUNT]) -> Self {
        let [
            cpu_load,
            mem_used_pct,
            io_read_per_sec,
            io_write_per_sec,
            disk_used_pct,
            net_in_mbps,
            net_out_mbps,
        ] = values;
        Self {
            cpu_load,
            mem_used_pct,
            io_read_per_sec,
            io_write_per_sec,
            disk_used_pct,
            net_in_mbps,
            net_out_mbps,
        }
    }

    /// Rounds every field to two decimal places.
    pub fn rounded(self) -> Self {
        Self::from_array(self.to_array().map(round2))
    }
}

/// Rounds to two decimals; NaN and infinities collapse to zero.
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let rounded = (value * 100.0).round() / 100.0;
    // avoid shipping -0.0
    if rounded == 0.0 { 0.0 } else { rounded }
}
