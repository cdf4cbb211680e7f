//! Connection state of a supervised transport.

use std::fmt;

/// Lifecycle of the single transport owned by a supervisor.
///
/// - `Disconnected` -> `Connecting` (connect or reconnect attempt)
/// - `Connecting` -> `Connected` (transport fired `open`)
/// - any -> `Disconnected` (transport fired `close`, or the client closed it)
///
/// Only the supervisor moves between states; everyone else observes them
/// through `is_open()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
