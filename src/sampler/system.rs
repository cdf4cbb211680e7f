use super::provider::{
    DiskIo, FilesystemUsage, MemoryUsage, MetricsProvider, NetworkThroughput, ProviderError,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use sysinfo::{Disks, Networks, System};

/// Counters that report deltas since their previous refresh.
struct RateSource<T> {
    source: T,
    last_refresh: Instant,
}

impl<T> RateSource<T> {
    fn new(source: T) -> Self {
        Self {
            source,
            last_refresh: Instant::now(),
        }
    }

    /// Seconds since the previous call (or since creation).
    fn lap(&mut self) -> f64 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refresh).as_secs_f64();
        self.last_refresh = now;
        elapsed
    }
}

fn per_second(amount: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs > 0.0 {
        amount as f64 / elapsed_secs
    } else {
        0.0
    }
}

fn is_loopback(interface: &str) -> bool {
    interface == "lo" || interface.starts_with("lo0") || interface.starts_with("Loopback")
}

/// Host readings through `sysinfo`.
///
/// Disk and network figures are rates over the time since the previous
/// reading, so the first reading after construction covers a short window.
#[derive(Clone)]
pub struct SystemMetricsProvider {
    system: Arc<Mutex<System>>,
    disks: Arc<Mutex<RateSource<Disks>>>,
    networks: Arc<Mutex<RateSource<Networks>>>,
}

impl SystemMetricsProvider {
    pub fn new() -> Self {
        Self {
            system: Arc::new(Mutex::new(System::new())),
            disks: Arc::new(Mutex::new(RateSource::new(Disks::new_with_refreshed_list()))),
            networks: Arc::new(Mutex::new(RateSource::new(
                Networks::new_with_refreshed_list(),
            ))),
        }
    }
}

impl Default for SystemMetricsProvider {
    fn default() -> Self {
        Self::new()
    }
}

async fn blocking<T, F>(read: F) -> Result<T, ProviderError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(read)
        .await
        .map_err(|e| ProviderError::TaskFailed(e.to_string()))
}

#[async_trait]
impl MetricsProvider for SystemMetricsProvider {
    async fn disk_io(&self) -> Result<Option<DiskIo>, ProviderError> {
        let disks = self.disks.clone();
        blocking(move || {
            let mut disks = disks.lock();
            disks.source.refresh(true);
            let elapsed = disks.lap();

            if disks.source.list().is_empty() {
                return None;
            }

            let (read, written) = disks
                .source
                .list()
                .iter()
                .map(|disk| disk.usage())
                .fold((0u64, 0u64), |(read, written), usage| {
                    (read + usage.read_bytes, written + usage.written_bytes)
                });

            Some(DiskIo {
                read_bytes_per_sec: per_second(read, elapsed),
                write_bytes_per_sec: per_second(written, elapsed),
            })
        })
        .await
    }

    async fn network(&self) -> Result<Option<NetworkThroughput>, ProviderError> {
        let networks = self.networks.clone();
        blocking(move || {
            let mut networks = networks.lock();
            networks.source.refresh(true);
            let elapsed = networks.lap();

            let mut seen = false;
            let (mut rx, mut tx) = (0u64, 0u64);
            for (name, data) in networks.source.list() {
                if is_loopback(name) {
                    continue;
                }
                seen = true;
                rx += data.received();
                tx += data.transmitted();
            }

            seen.then(|| NetworkThroughput {
                rx_bytes_per_sec: per_second(rx, elapsed),
                tx_bytes_per_sec: per_second(tx, elapsed),
            })
        })
        .await
    }

    async fn filesystem(&self) -> Result<Option<FilesystemUsage>, ProviderError> {
        blocking(|| {
            let disks = Disks::new_with_refreshed_list();
            let root = disks
                .list()
                .iter()
                .find(|disk| disk.mount_point() == Path::new("/"))
                .or_else(|| disks.list().first())?;

            let total_bytes = root.total_space();
            Some(FilesystemUsage {
                used_bytes: total_bytes.saturating_sub(root.available_space()),
                total_bytes,
            })
        })
        .await
    }

    async fn load_average(&self) -> Result<f64, ProviderError> {
        Ok(System::load_average().one)
    }

    async fn memory(&self) -> Result<MemoryUsage, ProviderError> {
        let system = self.system.clone();
        blocking(move || {
            let mut system = system.lock();
            system.refresh_memory();
            MemoryUsage {
                free_bytes: system.available_memory(),
                total_bytes: system.total_memory(),
            }
        })
        .await
    }
}
