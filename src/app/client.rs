//! Client facade.
//!
//! [`LogClient`] composes the supervisor, the codec and the metrics sampler
//! behind the calls an application actually makes: `log`, `log_metrics`,
//! `start_metrics` and `close`.

use super::config::ClientConfig;
use crate::codec::Codec;
use crate::domain::{ClientError, LogData, LogRecord, MetricsSample, Severity};
use crate::sampler::{
    MetricsProvider, MetricsSampler, SamplerHandle, SystemMetricsProvider, dispatch_sample,
};
use crate::supervisor::{
    CloseHook, ConnectionSupervisor, ErrorHook, MessageHook, StatsSnapshot, SupervisorHooks,
    SupervisorSettings,
};
use crate::transport::{Connector, TransportError};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct LogClientBuilder {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    hooks: SupervisorHooks,
    provider: Option<Arc<dyn MetricsProvider>>,
}

impl LogClientBuilder {
    /// Replaces the automatic reconnect after an unexpected close.
    pub fn on_close<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ConnectionSupervisor, u16) + Send + Sync + 'static,
    {
        let hook: CloseHook = Arc::new(hook);
        self.hooks.on_close = Some(hook);
        self
    }

    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ConnectionSupervisor, &TransportError) + Send + Sync + 'static,
    {
        let hook: ErrorHook = Arc::new(hook);
        self.hooks.on_error = Some(hook);
        self
    }

    /// Receives the client's informational messages instead of `tracing`.
    pub fn on_message<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let hook: MessageHook = Arc::new(hook);
        self.hooks.on_message = Some(hook);
        self
    }

    /// Host readings for the sampler. Defaults to [`SystemMetricsProvider`],
    /// created on first use.
    pub fn metrics_provider(mut self, provider: Arc<dyn MetricsProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// The collector address is checked by `start`, not here.
    pub fn build(self) -> LogClient {
        let supervisor = ConnectionSupervisor::new(
            SupervisorSettings::from_config(&self.config),
            self.connector,
            self.hooks,
        );

        LogClient {
            inner: Arc::new(ClientInner {
                codec: Codec::new(self.config.encoding),
                config: self.config,
                supervisor,
                provider: Mutex::new(self.provider),
                sampler: Mutex::new(None),
            }),
        }
    }
}

struct ClientInner {
    config: ClientConfig,
    codec: Codec,
    supervisor: ConnectionSupervisor,
    provider: Mutex<Option<Arc<dyn MetricsProvider>>>,
    sampler: Mutex<Option<SamplerHandle>>,
}

/// Cheap to clone; clones share one connection.
#[derive(Clone)]
pub struct LogClient {
    inner: Arc<ClientInner>,
}

impl fmt::Debug for LogClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogClient")
            .field("name", &self.inner.config.name)
            .field("encoding", &self.inner.codec.encoding())
            .field("supervisor", &self.inner.supervisor)
            .finish()
    }
}

impl LogClient {
    pub fn builder(config: ClientConfig, connector: Arc<dyn Connector>) -> LogClientBuilder {
        LogClientBuilder {
            config,
            connector,
            hooks: SupervisorHooks::default(),
            provider: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn supervisor(&self) -> &ConnectionSupervisor {
        &self.inner.supervisor
    }

    /// Opens the connection with the configured credential.
    ///
    /// An invalid collector address is returned here; nothing is opened or
    /// scheduled in that case.
    pub fn start(&self) -> Result<(), ClientError> {
        self.inner.supervisor.connect(&self.inner.config.credential)?;
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.inner.supervisor.is_open()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.supervisor.stats()
    }

    /// Sends one log record. Levels outside 1..=6 are clamped.
    ///
    /// A no-op while the connection is down. Transport failures are
    /// reported through the message channel, never returned.
    pub fn log(&self, level: u8, channel: &str, message: &str, data: Option<LogData>) {
        let mut record = LogRecord::new(Severity::clamped(level), channel, message);
        record.data = data;
        self.send_record(&record);
    }

    pub fn send_record(&self, record: &LogRecord) {
        let supervisor = &self.inner.supervisor;
        if !supervisor.is_open() {
            debug!(channel = %record.channel, "Connection closed, dropping log record");
            return;
        }

        let frame = match self.inner.codec.encode_log(record) {
            Ok(frame) => frame,
            Err(error) => {
                supervisor.notify(&format!("Error while encoding log record: {error}"));
                return;
            }
        };

        if let Err(error) = supervisor.send(frame) {
            supervisor.notify(&format!("Error while logging: {error}"));
        }
    }

    /// Sends a caller-supplied sample, rounded like sampled ones.
    pub fn log_metrics(&self, sample: &MetricsSample) {
        if !self.is_open() {
            return;
        }
        dispatch_sample(&self.inner.supervisor, &self.inner.codec, &sample.rounded());
    }

    /// Takes one sample right away and sends it. Returns the sample, or
    /// `None` when the connection was closed.
    pub async fn send_metrics(&self) -> Option<MetricsSample> {
        self.sampler().tick().await
    }

    /// Starts periodic sampling, replacing a running sampler.
    /// `None` uses the configured metrics interval.
    pub fn start_metrics(&self, interval: Option<Duration>) {
        let period = interval
            .filter(|period| !period.is_zero())
            .unwrap_or(self.inner.config.metrics_interval);

        let handle = Arc::new(self.sampler()).spawn(period);
        if let Some(previous) = self.inner.sampler.lock().replace(handle) {
            previous.stop();
        }
        debug!(?period, "Metrics sampler started");
    }

    pub fn stop_metrics(&self) {
        if let Some(handle) = self.inner.sampler.lock().take() {
            handle.stop();
        }
    }

    pub fn metrics_running(&self) -> bool {
        self.inner
            .sampler
            .lock()
            .as_ref()
            .is_some_and(SamplerHandle::is_running)
    }

    /// Stops the sampler, cancels any pending reconnect and closes the
    /// transport with a normal close code. No close hook or reconnect follows.
    pub fn close(&self) {
        self.stop_metrics();
        self.inner.supervisor.close();
    }

    fn sampler(&self) -> MetricsSampler {
        MetricsSampler::new(
            self.inner.supervisor.clone(),
            self.inner.codec,
            self.provider(),
        )
    }

    fn provider(&self) -> Arc<dyn MetricsProvider> {
        let mut slot = self.inner.provider.lock();
        let provider = slot.get_or_insert_with(|| {
            let provider: Arc<dyn MetricsProvider> = Arc::new(SystemMetricsProvider::new());
            provider
        });
        Arc::clone(provider)
    }
}
