//! Error types for client operations.

use std::io;

/// Errors emitted by [`crate::client::Client`] and its dialers.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A send was attempted without a live connection.
    #[error("not connected")]
    NotConnected,
    /// Socket or stream error.
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
    /// WebSocket handshake or framing error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    /// A dial attempt did not finish within the connect timeout.
    #[error("connect timed out")]
    ConnectTimeout,
    /// The host resolved to no address of the requested family.
    #[error("no usable address for host {0}")]
    Resolve(String),
    /// The network name is not one of the supported transports.
    #[error("invalid network: {0}")]
    InvalidNetwork(String),
}
