//! Connection supervisor.
//!
//! Owns the one transport a client talks through. The supervisor opens it,
//! follows its open/error/close events, exposes `send` and, after an
//! unexpected close, either hands control to the caller's close hook or
//! reconnects after a fixed interval.

pub mod reconnect;
pub mod state;
pub mod stats;

pub use reconnect::ReconnectTimer;
pub use state::ConnectionState;
pub use stats::{StatsSnapshot, SupervisorStats};

use crate::app::config::{ClientConfig, ConfigError};
use crate::codec::Frame;
use crate::transport::{
    Connection, Connector, Transport, TransportError, TransportEvent, TransportOptions,
    close_code,
};
use futures::StreamExt;
use futures::stream::BoxStream;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

/// Called with the close code after an unexpected close. Replaces the
/// automatic reconnect for that closure.
pub type CloseHook = Arc<dyn Fn(&ConnectionSupervisor, u16) + Send + Sync>;
/// Called for every transport error instead of the local log line.
pub type ErrorHook = Arc<dyn Fn(&ConnectionSupervisor, &TransportError) + Send + Sync>;
/// Receives every informational message instead of `tracing`.
pub type MessageHook = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Clone, Default)]
pub struct SupervisorHooks {
    pub on_close: Option<CloseHook>,
    pub on_error: Option<ErrorHook>,
    pub on_message: Option<MessageHook>,
}

impl fmt::Debug for SupervisorHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupervisorHooks")
            .field("on_close", &self.on_close.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_message", &self.on_message.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    pub collector_address: String,
    pub name: String,
    pub reconnect: bool,
    pub reconnect_interval: Duration,
    pub transport: TransportOptions,
}

impl SupervisorSettings {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            collector_address: config.collector_address.clone(),
            name: config.name.clone(),
            reconnect: config.reconnect,
            reconnect_interval: config.reconnect_interval,
            transport: config.transport_options(),
        }
    }
}

/// Builds `<address>/log?auth=<credential>&name=<name>`.
///
/// Fails when `address` is not an absolute URL that can carry a path.
pub fn collector_url(address: &str, credential: &str, name: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(address).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid collector address '{address}': {e}"))
    })?;

    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidUrl(format!(
            "Invalid collector address '{address}': cannot carry a path"
        )));
    }

    let base_path = url.path().trim_end_matches('/').to_string();
    url.set_path(&format!("{base_path}/log"));
    url.set_query(None);
    url.query_pairs_mut()
        .append_pair("auth", credential)
        .append_pair("name", name);

    Ok(url)
}

struct Link {
    state: ConnectionState,
    /// Bumped on every connect and on close; events from older
    /// generations are ignored.
    generation: u64,
    transport: Option<Box<dyn Transport>>,
    events_task: Option<JoinHandle<()>>,
}

struct Inner {
    settings: SupervisorSettings,
    connector: Arc<dyn Connector>,
    hooks: SupervisorHooks,
    link: Mutex<Link>,
    credential: Mutex<Option<String>>,
    reconnect_timer: ReconnectTimer,
    closed_by_client: AtomicBool,
    /// Bumped by every `close`; a reconnect scheduled before it is void.
    close_epoch: AtomicU64,
    stats: SupervisorStats,
}

#[derive(Clone)]
pub struct ConnectionSupervisor {
    inner: Arc<Inner>,
}

impl fmt::Debug for ConnectionSupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSupervisor")
            .field("collector", &self.inner.settings.collector_address)
            .field("state", &self.state())
            .finish()
    }
}

impl ConnectionSupervisor {
    pub fn new(
        settings: SupervisorSettings,
        connector: Arc<dyn Connector>,
        hooks: SupervisorHooks,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                settings,
                connector,
                hooks,
                link: Mutex::new(Link {
                    state: ConnectionState::Disconnected,
                    generation: 0,
                    transport: None,
                    events_task: None,
                }),
                credential: Mutex::new(None),
                reconnect_timer: ReconnectTimer::new(),
                closed_by_client: AtomicBool::new(false),
                close_epoch: AtomicU64::new(0),
                stats: SupervisorStats::new(),
            }),
        }
    }

    pub fn settings(&self) -> &SupervisorSettings {
        &self.inner.settings
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.link.lock().state
    }

    pub fn is_open(&self) -> bool {
        self.state().is_connected()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    pub fn reconnect_pending(&self) -> bool {
        self.inner.reconnect_timer.is_pending()
    }

    /// Opens a new transport, retiring the current one.
    ///
    /// Must run inside a tokio runtime. An invalid collector address is
    /// returned before anything is opened or scheduled; every later failure
    /// arrives as transport events, a refused open included.
    pub fn connect(&self, credential: &str) -> Result<(), ConfigError> {
        let settings = &self.inner.settings;
        let url = collector_url(&settings.collector_address, credential, &settings.name)?;

        self.inner.reconnect_timer.cancel();
        self.inner.closed_by_client.store(false, Ordering::SeqCst);
        *self.inner.credential.lock() = Some(credential.to_string());

        let (generation, retired) = {
            let mut link = self.inner.link.lock();
            let retired = Self::retire(&mut link);
            link.generation += 1;
            link.state = ConnectionState::Connecting;
            (link.generation, retired)
        };
        if let Some(transport) = retired {
            transport.close(close_code::NORMAL);
        }

        debug!(
            collector = %settings.collector_address,
            generation,
            "Opening transport"
        );

        match self.inner.connector.open(&url, &settings.transport) {
            Ok(Connection { transport, events }) => {
                self.attach(generation, Some(transport), events);
            }
            Err(error) => {
                debug!(generation, %error, "Transport failed to open");
                // reported from the events task so hooks never run inside `connect`
                let events = futures::stream::iter([
                    TransportEvent::Error(error),
                    TransportEvent::Close(close_code::ABNORMAL),
                ])
                .boxed();
                self.attach(generation, None, events);
            }
        }

        Ok(())
    }

    /// Connects again with the credential of the last `connect` call.
    pub fn reconnect(&self) -> Result<(), ConfigError> {
        let credential = self.inner.credential.lock().clone().ok_or_else(|| {
            ConfigError::InvalidConfig("reconnect requested before any connect".to_string())
        })?;
        self.connect(&credential)
    }

    /// Hands `frame` to the transport.
    ///
    /// Returns `Ok(false)` without touching the transport when the
    /// connection is not open; the frame is dropped, not queued.
    pub fn send(&self, frame: Frame) -> Result<bool, TransportError> {
        let link = self.inner.link.lock();
        let transport = match (&link.state, &link.transport) {
            (ConnectionState::Connected, Some(transport)) => transport,
            _ => {
                self.inner.stats.record_dropped();
                return Ok(false);
            }
        };

        match transport.send(frame) {
            Ok(()) => {
                self.inner.stats.record_sent();
                Ok(true)
            }
            Err(error) => {
                self.inner.stats.record_send_failure();
                Err(error)
            }
        }
    }

    /// Closes the transport for good: cancels any pending reconnect and
    /// suppresses the close hook and reconnection for this closure.
    pub fn close(&self) {
        self.inner.closed_by_client.store(true, Ordering::SeqCst);
        self.inner.close_epoch.fetch_add(1, Ordering::SeqCst);
        self.inner.reconnect_timer.cancel();

        let retired = {
            let mut link = self.inner.link.lock();
            let retired = Self::retire(&mut link);
            link.generation += 1;
            link.state = ConnectionState::Disconnected;
            retired
        };

        if let Some(transport) = retired {
            transport.close(close_code::NORMAL);
            self.notify("Logger closed.");
        }
    }

    /// Informational message: the message hook if set, `tracing` otherwise.
    pub fn notify(&self, message: &str) {
        match &self.inner.hooks.on_message {
            Some(hook) => hook(message),
            None => info!(collector = %self.inner.settings.collector_address, "{message}"),
        }
    }

    fn notify_warning(&self, message: &str) {
        match &self.inner.hooks.on_message {
            Some(hook) => hook(message),
            None => warn!(collector = %self.inner.settings.collector_address, "{message}"),
        }
    }

    fn retire(link: &mut Link) -> Option<Box<dyn Transport>> {
        if let Some(task) = link.events_task.take() {
            task.abort();
        }
        link.transport.take()
    }

    fn attach(
        &self,
        generation: u64,
        transport: Option<Box<dyn Transport>>,
        events: BoxStream<'static, TransportEvent>,
    ) {
        let mut link = self.inner.link.lock();
        if link.generation != generation {
            drop(link);
            if let Some(transport) = transport {
                transport.close(close_code::NORMAL);
            }
            return;
        }

        link.transport = transport;
        let supervisor = self.clone();
        link.events_task = Some(tokio::spawn(async move {
            supervisor.drive(generation, events).await;
        }));
    }

    async fn drive(self, generation: u64, mut events: BoxStream<'static, TransportEvent>) {
        loop {
            match events.next().await {
                Some(TransportEvent::Open) => self.handle_open(generation),
                Some(TransportEvent::Error(error)) => self.handle_error(generation, error),
                Some(TransportEvent::Close(code)) => {
                    self.handle_close(generation, code);
                    break;
                }
                None => {
                    debug!(generation, "Transport event stream ended without close");
                    self.handle_close(generation, close_code::ABNORMAL);
                    break;
                }
            }
        }
    }

    fn handle_open(&self, generation: u64) {
        {
            let mut link = self.inner.link.lock();
            if link.generation != generation || link.state != ConnectionState::Connecting {
                return;
            }
            link.state = ConnectionState::Connected;
        }

        self.inner.stats.record_connection_opened();
        self.notify("Logger connected.");
    }

    fn handle_error(&self, generation: u64, error: TransportError) {
        if self.inner.link.lock().generation != generation {
            debug!(generation, %error, "Ignoring error from retired transport");
            return;
        }

        match &self.inner.hooks.on_error {
            Some(hook) => hook(self, &error),
            None => self.notify_warning(&error.to_string()),
        }
    }

    fn handle_close(&self, generation: u64, code: u16) {
        let retired = {
            let mut link = self.inner.link.lock();
            if link.generation != generation {
                return;
            }
            link.state = ConnectionState::Disconnected;
            // the events task is the caller here; detach instead of aborting it
            link.events_task.take();
            link.transport.take()
        };
        drop(retired);

        self.notify(&format!("Logger disconnected. Code: {code}"));

        if self.inner.closed_by_client.load(Ordering::SeqCst) {
            return;
        }

        if let Some(hook) = &self.inner.hooks.on_close {
            hook(self, code);
            return;
        }

        if self.inner.settings.reconnect {
            self.schedule_reconnect();
        }
    }

    fn schedule_reconnect(&self) {
        let supervisor = self.clone();
        let interval = self.inner.settings.reconnect_interval;
        let epoch = self.inner.close_epoch.load(Ordering::SeqCst);

        debug!(?interval, "Scheduling reconnect");
        self.inner.reconnect_timer.schedule(interval, async move {
            if supervisor.closed_since(epoch) {
                return;
            }
            supervisor.notify("Attempting reconnect.");
            // the message hook may have closed the client
            if supervisor.closed_since(epoch) {
                debug!("Client closed, dropping scheduled reconnect");
                return;
            }
            supervisor.inner.stats.record_reconnect_attempt();
            if let Err(error) = supervisor.reconnect() {
                supervisor.notify_warning(&format!("Reconnect failed: {error}"));
            }
        });
    }

    fn closed_since(&self, epoch: u64) -> bool {
        self.inner.close_epoch.load(Ordering::SeqCst) != epoch
    }
}
