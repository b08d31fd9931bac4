//! Runtime and socket configuration for clients.

use std::{io, time::Duration};

use socket2::{SockRef, TcpKeepalive};
use tokio::net::TcpSocket;

/// Default pause between dial attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(3);
/// Default bound on a single dial attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default sleep used by loops that are waiting for a connection.
pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_millis(100);
/// Default stream read buffer size.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;
/// Default capacity of the read-to-dispatch queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// How outgoing packages are carried over a WebSocket.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WsMessageKind {
    /// Text messages, falling back to binary for non-UTF-8 payloads.
    #[default]
    Text,
    /// Always binary messages.
    Binary,
}

/// Timing and buffering parameters for a [`Client`](super::Client).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use wirelink::client::ClientConfig;
///
/// let config = ClientConfig::default().retry_interval(Duration::ZERO);
/// assert_eq!(config.retry_interval_value(), Duration::ZERO);
/// assert_eq!(config.queue_capacity_value(), 10);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    retry_interval: Duration,
    connect_timeout: Duration,
    idle_interval: Duration,
    read_buffer_size: usize,
    queue_capacity: usize,
    ws_message_kind: WsMessageKind,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retry_interval: DEFAULT_RETRY_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            idle_interval: DEFAULT_IDLE_INTERVAL,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            ws_message_kind: WsMessageKind::default(),
        }
    }
}

impl ClientConfig {
    /// Pause between dial attempts. Zero means a single attempt.
    #[must_use]
    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Upper bound on one dial attempt.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sleep used while waiting for a connection or after a transient read
    /// error. Clamped to at least one millisecond.
    #[must_use]
    pub fn idle_interval(mut self, interval: Duration) -> Self {
        self.idle_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Stream read buffer size. Clamped to at least one byte.
    #[must_use]
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }

    /// Capacity of the read-to-dispatch queue. Clamped to at least one.
    #[must_use]
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// WebSocket message kind used for outgoing packages.
    #[must_use]
    pub fn ws_message_kind(mut self, kind: WsMessageKind) -> Self {
        self.ws_message_kind = kind;
        self
    }

    #[must_use]
    pub fn retry_interval_value(&self) -> Duration { self.retry_interval }

    #[must_use]
    pub fn connect_timeout_value(&self) -> Duration { self.connect_timeout }

    #[must_use]
    pub fn idle_interval_value(&self) -> Duration { self.idle_interval }

    #[must_use]
    pub fn read_buffer_size_value(&self) -> usize { self.read_buffer_size }

    #[must_use]
    pub fn queue_capacity_value(&self) -> usize { self.queue_capacity }

    #[must_use]
    pub fn ws_message_kind_value(&self) -> WsMessageKind { self.ws_message_kind }
}

/// Socket options applied to TCP sockets before connecting.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use wirelink::client::SocketOptions;
///
/// let options = SocketOptions::default()
///     .nodelay(true)
///     .keepalive(Some(Duration::from_secs(30)));
/// assert_ne!(options, SocketOptions::default());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SocketOptions {
    nodelay: Option<bool>,
    keepalive: Option<Option<Duration>>,
}

impl SocketOptions {
    /// Configure `TCP_NODELAY`.
    #[must_use]
    pub fn nodelay(mut self, enabled: bool) -> Self {
        self.nodelay = Some(enabled);
        self
    }

    /// Configure `SO_KEEPALIVE`; `None` disables it, `Some(idle)` enables it
    /// with the given idle time before probes start.
    #[must_use]
    pub fn keepalive(mut self, idle: Option<Duration>) -> Self {
        self.keepalive = Some(idle);
        self
    }

    pub(crate) fn apply(&self, socket: &TcpSocket) -> io::Result<()> {
        if let Some(enabled) = self.nodelay {
            socket.set_nodelay(enabled)?;
        }
        match self.keepalive {
            Some(Some(idle)) => {
                socket.set_keepalive(true)?;
                let config = TcpKeepalive::new().with_time(idle);
                SockRef::from(socket).set_tcp_keepalive(&config)?;
            }
            Some(None) => socket.set_keepalive(false)?,
            None => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ClientConfig::default();
        assert_eq!(config.retry_interval_value(), Duration::from_secs(3));
        assert_eq!(config.connect_timeout_value(), Duration::from_secs(10));
        assert_eq!(config.idle_interval_value(), Duration::from_millis(100));
        assert_eq!(config.read_buffer_size_value(), 1024);
        assert_eq!(config.queue_capacity_value(), 10);
        assert_eq!(config.ws_message_kind_value(), WsMessageKind::Text);
    }

    #[test]
    fn degenerate_values_are_clamped() {
        let config = ClientConfig::default()
            .idle_interval(Duration::ZERO)
            .read_buffer_size(0)
            .queue_capacity(0);
        assert_eq!(config.idle_interval_value(), Duration::from_millis(1));
        assert_eq!(config.read_buffer_size_value(), 1);
        assert_eq!(config.queue_capacity_value(), 1);
    }

    #[tokio::test]
    async fn options_apply_to_a_fresh_socket() {
        let socket = TcpSocket::new_v4().expect("socket");
        SocketOptions::default()
            .nodelay(true)
            .keepalive(Some(Duration::from_secs(30)))
            .apply(&socket)
            .expect("apply options");
        assert!(socket.nodelay().expect("nodelay"));
        assert!(socket.keepalive().expect("keepalive"));
    }
}
