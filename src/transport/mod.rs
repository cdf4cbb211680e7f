//! Transport boundary.
//!
//! The client never speaks a wire protocol itself. A [`Connector`] turns the
//! collector URL into a [`Connection`]: a [`Transport`] sink for outgoing
//! frames plus a stream of [`TransportEvent`]s (open, error, close), the same
//! shape a WebSocket exposes.

pub mod loopback;

use crate::codec::Frame;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub use loopback::{LoopbackConnector, LoopbackHandle};

/// Close codes used by the client itself.
pub mod close_code {
    /// Orderly shutdown requested by the client.
    pub const NORMAL: u16 = 1000;
    /// Connection dropped without a close frame (also used when the
    /// connector fails synchronously or the event stream ends).
    pub const ABNORMAL: u16 = 1006;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Send failed: {0}")]
    SendFailed(String),
    #[error("Connection closed")]
    Closed,
    #[error("Protocol error: {0}")]
    Protocol(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Open,
    Error(TransportError),
    Close(u16),
}

/// Options forwarded verbatim to the connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransportOptions {
    /// Reject collectors whose TLS certificate does not verify.
    pub reject_unauthorized: bool,
    /// Per-message compression; `None` leaves the connector's default.
    pub per_message_deflate: Option<bool>,
}

/// Outgoing half of an open connection.
pub trait Transport: Send + Sync {
    fn send(&self, frame: Frame) -> Result<(), TransportError>;

    fn close(&self, code: u16);
}

pub struct Connection {
    pub transport: Box<dyn Transport>,
    pub events: BoxStream<'static, TransportEvent>,
}

impl Connection {
    pub fn new(transport: Box<dyn Transport>, events: BoxStream<'static, TransportEvent>) -> Self {
        Self { transport, events }
    }
}

/// Opens transports towards the collector.
///
/// `open` must not block: the handshake completes in the background and is
/// reported as `TransportEvent::Open` (or `Error` followed by `Close`).
pub trait Connector: Send + Sync + 'static {
    fn open(&self, url: &Url, options: &TransportOptions) -> Result<Connection, TransportError>;
}
