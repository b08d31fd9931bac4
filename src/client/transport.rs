//! Transport kinds and dialers.
//!
//! A [`Dialer`] produces one [`Connection`] per attempt. [`NetworkDialer`]
//! covers TCP, UDP and WebSocket targets; tests substitute scripted dialers.

use std::{fmt, io, net::SocketAddr, str::FromStr, time::Duration};

use async_trait::async_trait;
use futures::{Sink, Stream};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{TcpSocket, UdpSocket, lookup_host},
};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message},
};

use super::{ClientError, SocketOptions, udp::UdpStream};

/// Byte stream usable as a client transport.
pub trait ClientStream: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> ClientStream for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

/// Message-oriented transport usable as a client transport.
pub trait MessageStream:
    Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError> + Send + Unpin + 'static
{
}

impl<T> MessageStream for T where
    T: Stream<Item = Result<Message, WsError>>
        + Sink<Message, Error = WsError>
        + Send
        + Unpin
        + 'static
{
}

/// A freshly dialed transport.
pub enum Connection {
    /// Byte stream that needs framing.
    Stream(Box<dyn ClientStream>),
    /// Datagram socket read as a byte stream; an empty read is an empty
    /// datagram, not end of stream.
    Datagram(Box<dyn ClientStream>),
    /// Transport that delivers whole messages.
    Message(Box<dyn MessageStream>),
}

impl Connection {
    /// Wrap a byte stream.
    pub fn stream(stream: impl ClientStream) -> Self { Self::Stream(Box::new(stream)) }

    /// Wrap a connected datagram socket.
    pub fn datagram(socket: impl ClientStream) -> Self { Self::Datagram(Box::new(socket)) }

    /// Wrap a message transport.
    pub fn message(stream: impl MessageStream) -> Self { Self::Message(Box::new(stream)) }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream(_) => f.write_str("Connection::Stream"),
            Self::Datagram(_) => f.write_str("Connection::Datagram"),
            Self::Message(_) => f.write_str("Connection::Message"),
        }
    }
}

/// Establishes transports for a client.
///
/// Each call is one attempt; retrying is the client's job.
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial(&self) -> Result<Connection, ClientError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Family {
    Any,
    V4,
    V6,
}

impl Family {
    fn admits(self, addr: &SocketAddr) -> bool {
        match self {
            Self::Any => true,
            Self::V4 => addr.is_ipv4(),
            Self::V6 => addr.is_ipv6(),
        }
    }
}

/// Supported transport kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Network {
    Tcp,
    Tcp4,
    Tcp6,
    Udp,
    Udp4,
    Udp6,
    Ws,
    Wss,
}

impl Network {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Tcp4 => "tcp4",
            Self::Tcp6 => "tcp6",
            Self::Udp => "udp",
            Self::Udp4 => "udp4",
            Self::Udp6 => "udp6",
            Self::Ws => "ws",
            Self::Wss => "wss",
        }
    }

    /// Whether this network delivers whole messages.
    #[must_use]
    pub const fn is_message(self) -> bool { matches!(self, Self::Ws | Self::Wss) }

    const fn family(self) -> Family {
        match self {
            Self::Tcp4 | Self::Udp4 => Family::V4,
            Self::Tcp6 | Self::Udp6 => Family::V6,
            Self::Tcp | Self::Udp | Self::Ws | Self::Wss => Family::Any,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Network {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "tcp" => Self::Tcp,
            "tcp4" => Self::Tcp4,
            "tcp6" => Self::Tcp6,
            "udp" => Self::Udp,
            "udp4" => Self::Udp4,
            "udp6" => Self::Udp6,
            "ws" => Self::Ws,
            "wss" => Self::Wss,
            other => return Err(ClientError::InvalidNetwork(other.to_owned())),
        })
    }
}

/// Dialer for a `(network, host)` target.
///
/// ```
/// use wirelink::client::{Network, NetworkDialer};
///
/// let dialer = NetworkDialer::new(Network::Ws, "127.0.0.1:9000");
/// assert_eq!(dialer.url(), "ws://127.0.0.1:9000");
/// ```
#[derive(Clone, Debug)]
pub struct NetworkDialer {
    network: Network,
    host: String,
    socket_options: SocketOptions,
}

impl NetworkDialer {
    #[must_use]
    pub fn new(network: Network, host: impl Into<String>) -> Self {
        Self {
            network,
            host: host.into(),
            socket_options: SocketOptions::default(),
        }
    }

    /// Options applied to TCP sockets before connecting.
    #[must_use]
    pub fn socket_options(mut self, options: SocketOptions) -> Self {
        self.socket_options = options;
        self
    }

    /// WebSocket URL for message networks, or the bare host otherwise.
    #[must_use]
    pub fn url(&self) -> String {
        if self.network.is_message() {
            format!("{}://{}", self.network, self.host)
        } else {
            self.host.clone()
        }
    }

    async fn resolve(&self) -> Result<Vec<SocketAddr>, ClientError> {
        let family = self.network.family();
        let addrs: Vec<SocketAddr> = lookup_host(self.host.as_str())
            .await?
            .filter(|addr| family.admits(addr))
            .collect();
        if addrs.is_empty() {
            return Err(ClientError::Resolve(self.host.clone()));
        }
        Ok(addrs)
    }

    async fn dial_tcp(&self) -> Result<Connection, ClientError> {
        let mut last_err = None;
        for addr in self.resolve().await? {
            let socket = if addr.is_ipv4() {
                TcpSocket::new_v4()?
            } else {
                TcpSocket::new_v6()?
            };
            self.socket_options.apply(&socket)?;
            match socket.connect(addr).await {
                Ok(stream) => return Ok(Connection::stream(stream)),
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.map_or_else(|| ClientError::Resolve(self.host.clone()), ClientError::Io))
    }

    async fn dial_udp(&self) -> Result<Connection, ClientError> {
        let mut last_err = None;
        for addr in self.resolve().await? {
            let local: SocketAddr = if addr.is_ipv4() {
                (std::net::Ipv4Addr::UNSPECIFIED, 0).into()
            } else {
                (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
            };
            let socket = UdpSocket::bind(local).await?;
            match socket.connect(addr).await {
                Ok(()) => return Ok(Connection::datagram(UdpStream::new(socket))),
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.map_or_else(|| ClientError::Resolve(self.host.clone()), ClientError::Io))
    }

    async fn dial_ws(&self) -> Result<Connection, ClientError> {
        let (stream, _response) = connect_async(self.url()).await?;
        Ok(Connection::message(stream))
    }
}

#[async_trait]
impl Dialer for NetworkDialer {
    async fn dial(&self) -> Result<Connection, ClientError> {
        match self.network {
            Network::Tcp | Network::Tcp4 | Network::Tcp6 => self.dial_tcp().await,
            Network::Udp | Network::Udp4 | Network::Udp6 => self.dial_udp().await,
            Network::Ws | Network::Wss => self.dial_ws().await,
        }
    }
}

/// Bound a dial attempt by `timeout`.
pub(crate) async fn dial_with_timeout(
    dialer: &dyn Dialer,
    timeout: Duration,
) -> Result<Connection, ClientError> {
    tokio::time::timeout(timeout, dialer.dial())
        .await
        .map_err(|_| ClientError::ConnectTimeout)?
}

/// Classify an I/O error kind as connection-ending.
pub(crate) fn is_terminal_io(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
            | io::ErrorKind::InvalidInput
    )
}
