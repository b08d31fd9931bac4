//! Connection manager for stream and message transports.
//!
//! A [`Client`] owns one transport at a time. Once started it runs a
//! connect-retry loop, a read loop feeding a bounded queue, and a dispatch
//! loop that hands raw chunks to the registered message handler. Connect,
//! disconnect, raw traffic and log events are reported through hooks set on
//! the [`ClientBuilder`].

mod builder;
mod config;
mod error;
mod heartbeat;
mod hooks;
mod link;
mod runtime;
mod transport;
mod udp;

pub use builder::ClientBuilder;
pub use config::{
    ClientConfig,
    DEFAULT_CONNECT_TIMEOUT,
    DEFAULT_IDLE_INTERVAL,
    DEFAULT_QUEUE_CAPACITY,
    DEFAULT_READ_BUFFER_SIZE,
    DEFAULT_RETRY_INTERVAL,
    SocketOptions,
    WsMessageKind,
};
pub use error::ClientError;
pub use hooks::{Chunk, ConnectHook, DisconnectHook, LogHook, MessageHandler, MsgType, PackageHook};
pub use runtime::{Client, ConnectionState};
pub use transport::{ClientStream, Connection, Dialer, MessageStream, Network, NetworkDialer};
pub use udp::UdpStream;
