//! In-process connector.
//!
//! Records every frame and lets the caller drive the connection events by
//! hand. Meant for tests: frames are kept for the life of a connection and
//! only the most recent [`RETAINED_CONNECTIONS`] connections are kept, so a
//! long-lived client reconnecting through it still holds bounded memory.

use super::{
    Connection, Connector, Transport, TransportError, TransportEvent, TransportOptions,
};
use crate::codec::Frame;
use futures::StreamExt;
use futures::channel::mpsc;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use url::Url;

/// Handles kept by a [`LoopbackConnector`]; older ones are evicted.
pub const RETAINED_CONNECTIONS: usize = 64;

#[derive(Debug, Default)]
struct ConnectorState {
    connections: VecDeque<LoopbackHandle>,
    attempts: usize,
    fail_next: Option<String>,
    auto_open: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LoopbackConnector {
    state: Arc<Mutex<ConnectorState>>,
}

impl LoopbackConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every connection fires `Open` as soon as it is created.
    pub fn auto_open() -> Self {
        let connector = Self::default();
        connector.state.lock().auto_open = true;
        connector
    }

    /// The next `open` call fails synchronously with `message`.
    pub fn fail_next_open(&self, message: impl Into<String>) {
        self.state.lock().fail_next = Some(message.into());
    }

    /// Number of `open` calls, failed ones included.
    pub fn attempts(&self) -> usize {
        self.state.lock().attempts
    }

    /// Handle of the `index`-th `open` call, counting from zero. `None` once
    /// it has been evicted.
    pub fn connection(&self, index: usize) -> Option<LoopbackHandle> {
        let state = self.state.lock();
        let evicted = state.attempts - state.connections.len();
        index
            .checked_sub(evicted)
            .and_then(|position| state.connections.get(position))
            .cloned()
    }

    pub fn last(&self) -> Option<LoopbackHandle> {
        self.state.lock().connections.back().cloned()
    }
}

impl Connector for LoopbackConnector {
    fn open(&self, url: &Url, options: &TransportOptions) -> Result<Connection, TransportError> {
        let (events_tx, events_rx) = mpsc::unbounded();
        let handle = LoopbackHandle {
            url: url.clone(),
            options: *options,
            shared: Arc::new(Mutex::new(Shared::default())),
            events_tx,
        };

        let mut state = self.state.lock();
        state.attempts += 1;
        if state.connections.len() == RETAINED_CONNECTIONS {
            state.connections.pop_front();
        }
        state.connections.push_back(handle.clone());

        if let Some(message) = state.fail_next.take() {
            return Err(TransportError::ConnectionFailed(message));
        }
        if state.auto_open {
            handle.fire_open();
        }

        let transport = LoopbackTransport {
            handle: handle.clone(),
        };
        Ok(Connection::new(Box::new(transport), events_rx.boxed()))
    }
}

#[derive(Debug, Default)]
struct Shared {
    frames: Vec<Frame>,
    closed_with: Option<u16>,
    fail_sends: Option<String>,
}

/// Test-side view of one connection.
#[derive(Debug, Clone)]
pub struct LoopbackHandle {
    url: Url,
    options: TransportOptions,
    shared: Arc<Mutex<Shared>>,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
}

impl LoopbackHandle {
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn options(&self) -> TransportOptions {
        self.options
    }

    /// Query value for `key` on the connection URL.
    pub fn query(&self, key: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    pub fn fire_open(&self) {
        let _ = self.events_tx.unbounded_send(TransportEvent::Open);
    }

    pub fn fire_error(&self, message: impl Into<String>) {
        let error = TransportError::Protocol(message.into());
        let _ = self.events_tx.unbounded_send(TransportEvent::Error(error));
    }

    pub fn fire_close(&self, code: u16) {
        let _ = self.events_tx.unbounded_send(TransportEvent::Close(code));
    }

    /// Ends the event stream without a close event.
    pub fn drop_events(&self) {
        self.events_tx.close_channel();
    }

    /// Subsequent sends fail with `message`.
    pub fn fail_sends(&self, message: impl Into<String>) {
        self.shared.lock().fail_sends = Some(message.into());
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.shared.lock().frames.clone()
    }

    pub fn frame_count(&self) -> usize {
        self.shared.lock().frames.len()
    }

    /// Close code passed to `Transport::close`, if the client closed it.
    pub fn closed_with(&self) -> Option<u16> {
        self.shared.lock().closed_with
    }
}

struct LoopbackTransport {
    handle: LoopbackHandle,
}

impl Transport for LoopbackTransport {
    fn send(&self, frame: Frame) -> Result<(), TransportError> {
        let mut shared = self.handle.shared.lock();
        if shared.closed_with.is_some() {
            return Err(TransportError::Closed);
        }
        if let Some(message) = &shared.fail_sends {
            return Err(TransportError::SendFailed(message.clone()));
        }
        shared.frames.push(frame);
        Ok(())
    }

    fn close(&self, code: u16) {
        let mut shared = self.handle.shared.lock();
        if shared.closed_with.is_none() {
            shared.closed_with = Some(code);
            drop(shared);
            self.handle.fire_close(code);
        }
    }
}
