//! Periodic host metrics sampler.
//!
//! Each tick checks the connection first and skips the provider entirely
//! while it is down. Otherwise disk I/O, network and filesystem readings are
//! gathered concurrently, turned into a rounded [`MetricsSample`] and sent
//! through the supervisor.

pub mod provider;
pub mod system;

pub use provider::{
    DiskIo, FilesystemUsage, MemoryUsage, MetricsProvider, NetworkThroughput, ProviderError,
};
pub use system::SystemMetricsProvider;

use crate::codec::Codec;
use crate::domain::MetricsSample;
use crate::supervisor::ConnectionSupervisor;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const BYTES_PER_MB: f64 = 1_000_000.0;

/// Raw provider output for one tick; `None` marks a missing reading.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Readings {
    pub load_average: Option<f64>,
    pub memory: Option<MemoryUsage>,
    pub disk_io: Option<DiskIo>,
    pub network: Option<NetworkThroughput>,
    pub filesystem: Option<FilesystemUsage>,
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole * 100.0 } else { 0.0 }
}

impl Readings {
    /// Normalizes the readings; missing ones contribute zeros.
    pub fn to_sample(&self) -> MetricsSample {
        let disk_io = self.disk_io.unwrap_or_default();
        let network = self.network.unwrap_or_default();

        let mem_used_pct = self.memory.map_or(0.0, |memory| {
            let total = memory.total_bytes as f64;
            let used = memory.total_bytes.saturating_sub(memory.free_bytes) as f64;
            percent(used, total)
        });

        let disk_used_pct = self.filesystem.map_or(0.0, |fs| {
            percent(fs.used_bytes as f64, fs.total_bytes as f64)
        });

        MetricsSample {
            cpu_load: self.load_average.unwrap_or(0.0) * 100.0,
            mem_used_pct,
            io_read_per_sec: disk_io.read_bytes_per_sec,
            io_write_per_sec: disk_io.write_bytes_per_sec,
            disk_used_pct,
            net_in_mbps: network.rx_bytes_per_sec / BYTES_PER_MB,
            net_out_mbps: network.tx_bytes_per_sec / BYTES_PER_MB,
        }
        .rounded()
    }
}

fn settle<T>(reading: &str, result: Result<T, ProviderError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            debug!(reading, %error, "Metrics reading failed, reporting zero");
            None
        }
    }
}

/// Encodes `sample` and hands it to the supervisor.
///
/// Returns whether the frame reached the transport. Encoding and transport
/// failures are reported through the supervisor's message channel.
pub fn dispatch_sample(
    supervisor: &ConnectionSupervisor,
    codec: &Codec,
    sample: &MetricsSample,
) -> bool {
    let frame = match codec.encode_metrics(sample) {
        Ok(frame) => frame,
        Err(error) => {
            supervisor.notify(&format!("Error while encoding metrics: {error}"));
            return false;
        }
    };

    match supervisor.send(frame) {
        Ok(sent) => sent,
        Err(error) => {
            supervisor.notify(&format!("Error while logging metrics: {error}"));
            false
        }
    }
}

pub struct MetricsSampler {
    supervisor: ConnectionSupervisor,
    codec: Codec,
    provider: Arc<dyn MetricsProvider>,
}

impl MetricsSampler {
    pub fn new(
        supervisor: ConnectionSupervisor,
        codec: Codec,
        provider: Arc<dyn MetricsProvider>,
    ) -> Self {
        Self {
            supervisor,
            codec,
            provider,
        }
    }

    pub async fn gather(&self) -> Readings {
        let provider = &self.provider;
        let (disk_io, network, filesystem, load_average, memory) = tokio::join!(
            provider.disk_io(),
            provider.network(),
            provider.filesystem(),
            provider.load_average(),
            provider.memory(),
        );

        Readings {
            load_average: settle("load_average", load_average),
            memory: settle("memory", memory),
            disk_io: settle("disk_io", disk_io).flatten(),
            network: settle("network", network).flatten(),
            filesystem: settle("filesystem", filesystem).flatten(),
        }
    }

    /// One sampler tick. Returns the sample when one was taken, `None` when
    /// the connection was closed and the provider was not consulted.
    pub async fn tick(&self) -> Option<MetricsSample> {
        if !self.supervisor.is_open() {
            debug!("Connection closed, skipping metrics tick");
            return None;
        }

        let sample = self.gather().await.to_sample();
        dispatch_sample(&self.supervisor, &self.codec, &sample);
        Some(sample)
    }

    /// Runs `tick` every `period` until the returned handle is stopped.
    /// The first tick happens one full period after the call.
    pub fn spawn(self: Arc<Self>, period: Duration) -> SamplerHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        self.tick().await;
                    }
                }
            }
            debug!("Metrics sampler stopped");
        });

        SamplerHandle {
            cancel,
            task: Some(task),
        }
    }
}

/// Running sampler; stopping it cancels the timer, not an in-flight tick's send.
#[derive(Debug)]
pub struct SamplerHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SamplerHandle {
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stops the sampler and waits for its task to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        let Some(task) = self.task.take() else {
            return;
        };
        if let Err(error) = task.await {
            warn!(%error, "Metrics sampler task ended abnormally");
        }
    }
}

impl Drop for SamplerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
