use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a log record as understood by the collector.
///
/// The collector accepts levels 1 through 6, higher meaning more severe.
/// Level 0 never appears on a log record: compact frames reserve it for metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Severity(u8);

impl Severity {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 6;

    pub const TRACE: Severity = Severity(1);
    pub const DEBUG: Severity = Severity(2);
    pub const INFO: Severity = Severity(3);
    pub const WARN: Severity = Severity(4);
    pub const ERROR: Severity = Severity(5);
    pub const FATAL: Severity = Severity(6);

    /// Returns `None` when `level` is outside 1..=6.
    pub fn new(level: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&level).then_some(Self(level))
    }

    /// Clamps any level into 1..=6.
    pub fn clamped(level: u8) -> Self {
        Self(level.clamp(Self::MIN, Self::MAX))
    }

    pub fn level(self) -> u8 {
        self.0
    }
}

impl Default for Severity {
    fn default() -> Self {
        Self::INFO
    }
}

impl From<Severity> for u8 {
    fn from(severity: Severity) -> Self {
        severity.0
    }
}

impl TryFrom<u8> for Severity {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level).ok_or_else(|| {
            format!(
                "severity {level} out of range {}..={}",
                Self::MIN,
                Self::MAX
            )
        })
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
