use async_trait::async_trait;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Reading unavailable: {0}")]
    Unavailable(String),
    #[error("IO error while reading host metrics: {0}")]
    Io(#[from] std::io::Error),
    #[error("Metrics task failed: {0}")]
    TaskFailed(String),
}

/// Disk throughput summed over all devices.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DiskIo {
    pub read_bytes_per_sec: f64,
    pub write_bytes_per_sec: f64,
}

/// Network throughput summed over all non-loopback interfaces.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NetworkThroughput {
    pub rx_bytes_per_sec: f64,
    pub tx_bytes_per_sec: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilesystemUsage {
    pub used_bytes: u64,
    pub total_bytes: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryUsage {
    pub free_bytes: u64,
    pub total_bytes: u64,
}

/// Source of host readings, consulted once per sampler tick.
///
/// `Ok(None)` means the host has nothing to report for that reading (no
/// disks, no interfaces); the sampler then reports zeros for those fields.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    async fn disk_io(&self) -> Result<Option<DiskIo>, ProviderError>;

    async fn network(&self) -> Result<Option<NetworkThroughput>, ProviderError>;

    async fn filesystem(&self) -> Result<Option<FilesystemUsage>, ProviderError>;

    /// One-minute load average.
    async fn load_average(&self) -> Result<f64, ProviderError>;

    async fn memory(&self) -> Result<MemoryUsage, ProviderError>;
}
