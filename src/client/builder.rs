//! Builder for configuring a [`Client`].

use std::{future::Future, sync::Arc};

use tracing::Level;

use super::{
    Client,
    ClientConfig,
    MsgType,
    Network,
    NetworkDialer,
    SocketOptions,
    hooks::{Chunk, ClientHooks, MessageHandler},
    transport::Dialer,
};

/// Builder for [`Client`].
///
/// Hooks default to no-ops. Without an explicit [`dialer`](Self::dialer),
/// the client dials its `(network, host)` target with a [`NetworkDialer`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use wirelink::client::{ClientBuilder, ClientConfig, Network};
///
/// let client = ClientBuilder::new()
///     .config(ClientConfig::default().retry_interval(Duration::from_secs(1)))
///     .on_connect(|index| println!("connected #{index}"))
///     .on_disconnect(|index| println!("disconnected #{index}"))
///     .build(Network::Ws, "127.0.0.1:9000");
/// assert_eq!(client.host(), "127.0.0.1:9000");
/// ```
#[derive(Default)]
pub struct ClientBuilder {
    config: ClientConfig,
    socket_options: SocketOptions,
    dialer: Option<Arc<dyn Dialer>>,
    hooks: ClientHooks,
    handler: Option<MessageHandler>,
}

impl ClientBuilder {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Socket options for the default TCP dialer.
    #[must_use]
    pub fn socket_options(mut self, options: SocketOptions) -> Self {
        self.socket_options = options;
        self
    }

    /// Replace the default dialer.
    #[must_use]
    pub fn dialer(mut self, dialer: impl Dialer + 'static) -> Self {
        self.dialer = Some(Arc::new(dialer));
        self
    }

    /// Register a connect observer. Observers run in registration order.
    #[must_use]
    pub fn on_connect<F>(mut self, f: F) -> Self
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.hooks.on_connect.push(Arc::new(f));
        self
    }

    /// Register a disconnect observer. Observers run in registration order.
    #[must_use]
    pub fn on_disconnect<F>(mut self, f: F) -> Self
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.hooks.on_disconnect.push(Arc::new(f));
        self
    }

    /// Observe every raw chunk written or read.
    #[must_use]
    pub fn on_package<F>(mut self, f: F) -> Self
    where
        F: Fn(MsgType, &[u8]) + Send + Sync + 'static,
    {
        self.hooks.on_package = Some(Arc::new(f));
        self
    }

    /// Receive every log event alongside `tracing`.
    #[must_use]
    pub fn on_log<F>(mut self, f: F) -> Self
    where
        F: Fn(Level, &str) + Send + Sync + 'static,
    {
        self.hooks.on_log = Some(Arc::new(f));
        self
    }

    /// Consume raw chunks from the dispatch loop.
    #[must_use]
    pub fn on_message<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Chunk) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.handler = Some(Arc::new(move |chunk| Box::pin(f(chunk))));
        self
    }

    /// Build a client for `(network, host)`. Nothing is dialed until
    /// [`Client::start`].
    #[must_use]
    pub fn build(self, network: Network, host: impl Into<String>) -> Client {
        let host = host.into();
        let dialer = self.dialer.unwrap_or_else(|| {
            Arc::new(NetworkDialer::new(network, host.clone()).socket_options(self.socket_options))
        });
        Client::from_parts(network, host, self.config, dialer, self.hooks, self.handler)
    }
}
