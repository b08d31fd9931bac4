//! Client runtime: connection slot, counters and the long-running loops.

use std::{
    fmt,
    sync::{
        Arc,
        Mutex,
        MutexGuard,
        PoisonError,
        RwLock,
        atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering},
    },
    time::Duration,
};

use bytes::Bytes;
use tokio::{select, sync::mpsc, time::sleep};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::Level;

use super::{
    ClientBuilder,
    ClientConfig,
    ClientError,
    Network,
    hooks::{Chunk, ClientHooks, MessageHandler, MsgType, emit},
    link::{Link, ReadOutcome},
    transport::{Dialer, dial_with_timeout, is_terminal_io},
};
use crate::{metrics, panic::catch_panic};

/// Lifecycle state of the client's connection slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    const fn as_u8(self) -> u8 {
        match self {
            Self::Disconnected => 0,
            Self::Connecting => 1,
            Self::Connected => 2,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            _ => Self::Disconnected,
        }
    }
}

pub(super) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(super) struct Inner {
    pub(super) network: Network,
    pub(super) host: String,
    pub(super) config: ClientConfig,
    pub(super) dialer: Arc<dyn Dialer>,
    pub(super) hooks: ClientHooks,
    link: Mutex<Option<Arc<Link>>>,
    state: AtomicU8,
    connects: AtomicU64,
    disconnects: AtomicU64,
    handler: RwLock<Option<MessageHandler>>,
    pub(super) shutdown: CancellationToken,
    pub(super) tasks: TaskTracker,
    started: AtomicBool,
    pub(super) heartbeat: Mutex<Option<CancellationToken>>,
    pub(super) heartbeat_paused: AtomicBool,
}

/// Connection manager for one `(network, host)` target.
///
/// Cloning is cheap; clones share the same connection and loops. Call
/// [`Client::stop`] to end the loops, after which the client is not reusable.
///
/// # Examples
///
/// ```no_run
/// use wirelink::client::{Client, Network};
///
/// # #[tokio::main]
/// # async fn main() {
/// let client = Client::builder()
///     .on_connect(|index| println!("connected #{index}"))
///     .build(Network::Tcp, "127.0.0.1:9000");
/// client.start();
/// client.stop().await;
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    pub(super) inner: Arc<Inner>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("network", &self.inner.network)
            .field("host", &self.inner.host)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Start configuring a client.
    #[must_use]
    pub fn builder() -> ClientBuilder { ClientBuilder::new() }

    pub(super) fn from_parts(
        network: Network,
        host: String,
        config: ClientConfig,
        dialer: Arc<dyn Dialer>,
        hooks: ClientHooks,
        handler: Option<MessageHandler>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                network,
                host,
                config,
                dialer,
                hooks,
                link: Mutex::new(None),
                state: AtomicU8::new(ConnectionState::Disconnected.as_u8()),
                connects: AtomicU64::new(0),
                disconnects: AtomicU64::new(0),
                handler: RwLock::new(handler),
                shutdown: CancellationToken::new(),
                tasks: TaskTracker::new(),
                started: AtomicBool::new(false),
                heartbeat: Mutex::new(None),
                heartbeat_paused: AtomicBool::new(false),
            }),
        }
    }

    #[must_use]
    pub fn network(&self) -> Network { self.inner.network }

    #[must_use]
    pub fn host(&self) -> &str { &self.inner.host }

    #[must_use]
    pub fn config(&self) -> &ClientConfig { &self.inner.config }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    #[must_use]
    pub fn is_connected(&self) -> bool { lock(&self.inner.link).is_some() }

    /// Number of successful connects so far.
    #[must_use]
    pub fn connect_count(&self) -> u64 { self.inner.connects.load(Ordering::Acquire) }

    /// Number of closes so far.
    #[must_use]
    pub fn disconnect_count(&self) -> u64 { self.inner.disconnects.load(Ordering::Acquire) }

    /// Emit `message` through `tracing` and the configured log hook.
    pub(crate) fn log(&self, level: Level, message: &str) { self.inner.log(level, message); }

    /// Replace the consumer of raw chunks pulled by the dispatch loop.
    pub fn set_message_handler(&self, handler: MessageHandler) {
        *self
            .inner
            .handler
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(handler);
    }

    /// Spawn the read, dispatch and connect-retry loops, in that order.
    ///
    /// Must be called from within a Tokio runtime. Calling it again, or after
    /// [`Client::stop`], has no effect.
    pub fn start(&self) {
        if self.inner.shutdown.is_cancelled() {
            tracing::warn!("client was stopped and cannot be restarted");
            return;
        }
        if self.inner.started.swap(true, Ordering::AcqRel) {
            return;
        }
        let (tx, rx) = mpsc::channel(self.inner.config.queue_capacity_value());
        self.inner.tasks.spawn(read_loop(Arc::clone(&self.inner), tx));
        self.inner.tasks.spawn(dispatch_loop(Arc::clone(&self.inner), rx));
        self.inner.tasks.spawn(retry_loop(Arc::clone(&self.inner)));
    }

    /// Reset the connection, cancel every loop and wait for them to end.
    pub async fn stop(&self) {
        self.inner.shutdown.cancel();
        self.inner.tasks.close();
        self.inner.tasks.wait().await;
        self.inner.reset().await;
    }

    /// Close the active connection and notify disconnect observers.
    ///
    /// No-op while disconnected. The retry loop reconnects afterwards unless
    /// the retry interval is zero.
    pub async fn reset(&self) { self.inner.reset().await; }

    /// Reset only if the active connection is the one numbered `index`.
    pub(crate) async fn reset_connection(&self, index: u64) {
        if let Some(link) = self.inner.take_link(|current| current.index() == index) {
            self.inner.close(link).await;
        }
    }

    /// Write `bytes` to the active connection.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] without a live connection, or
    /// the transport error. A terminal transport error also resets the
    /// connection.
    pub async fn send(&self, bytes: impl Into<Bytes>) -> Result<(), ClientError> {
        self.inner.send(bytes.into()).await
    }
}

impl Inner {
    pub(super) fn current_link(&self) -> Option<Arc<Link>> { lock(&self.link).clone() }

    fn set_state(&self, state: ConnectionState) { self.state.store(state.as_u8(), Ordering::Release); }

    pub(super) fn log(&self, level: Level, message: &str) { emit(&self.hooks, level, message); }

    pub(super) async fn send(&self, bytes: Bytes) -> Result<(), ClientError> {
        let link = self.current_link().ok_or(ClientError::NotConnected)?;
        match link.send(&bytes, self.config.ws_message_kind_value()).await {
            Ok(()) => {
                self.hooks.package(MsgType::Send, &bytes);
                Ok(())
            }
            Err(err) => {
                if is_terminal_send_error(&err) {
                    self.reset_link(&link).await;
                }
                Err(err)
            }
        }
    }

    /// Sleep for the idle interval. Returns `false` once shutdown begins.
    async fn idle(&self) -> bool {
        select! {
            biased;

            () = self.shutdown.cancelled() => false,
            () = sleep(self.config.idle_interval_value()) => true,
        }
    }

    async fn connect_once(&self) {
        self.set_state(ConnectionState::Connecting);
        match dial_with_timeout(&*self.dialer, self.config.connect_timeout_value()).await {
            Ok(connection) => {
                let index = {
                    let mut slot = lock(&self.link);
                    let index = self.connects.fetch_add(1, Ordering::AcqRel) + 1;
                    *slot = Some(Arc::new(Link::new(connection).indexed(index)));
                    self.set_state(ConnectionState::Connected);
                    index
                };
                metrics::inc_connections();
                self.log(
                    Level::INFO,
                    &format!("connected to {}://{}, index={index}", self.network, self.host),
                );
                self.hooks.connected(index);
            }
            Err(err) => {
                self.set_state(ConnectionState::Disconnected);
                metrics::inc_connect_failures();
                self.log(
                    Level::ERROR,
                    &format!("connect to {}://{} failed: {err}", self.network, self.host),
                );
            }
        }
    }

    pub(super) async fn reset(&self) {
        if let Some(link) = self.take_link(|_| true) {
            self.close(link).await;
        }
    }

    /// Reset only if `link` is still the active connection.
    async fn reset_link(&self, link: &Arc<Link>) {
        if let Some(link) = self.take_link(|current| Arc::ptr_eq(current, link)) {
            self.close(link).await;
        }
    }

    /// Empty the slot if `matches` accepts its link.
    ///
    /// The state changes under the slot lock so [`Client::state`] and
    /// [`Client::is_connected`] never disagree after a concurrent reconnect.
    fn take_link(&self, matches: impl FnOnce(&Arc<Link>) -> bool) -> Option<Arc<Link>> {
        let mut slot = lock(&self.link);
        if !slot.as_ref().is_some_and(matches) {
            return None;
        }
        self.set_state(ConnectionState::Disconnected);
        slot.take()
    }

    async fn close(&self, link: Arc<Link>) {
        link.close().await;
        let index = self.disconnects.fetch_add(1, Ordering::AcqRel) + 1;
        metrics::dec_connections();
        self.log(
            Level::INFO,
            &format!("disconnected from {}://{}, index={index}", self.network, self.host),
        );
        self.hooks.disconnected(index);
    }

    fn handler(&self) -> Option<MessageHandler> {
        self.handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn is_terminal_send_error(err: &ClientError) -> bool {
    use tokio_tungstenite::tungstenite::Error as WsError;

    match err {
        ClientError::Io(io) => is_terminal_io(io.kind()),
        ClientError::WebSocket(WsError::ConnectionClosed | WsError::AlreadyClosed) => true,
        ClientError::WebSocket(WsError::Io(io)) => is_terminal_io(io.kind()),
        _ => false,
    }
}

async fn retry_loop(inner: Arc<Inner>) {
    let interval = inner.config.retry_interval_value();
    loop {
        if inner.current_link().is_none() {
            select! {
                biased;

                () = inner.shutdown.cancelled() => break,
                () = inner.connect_once() => {}
            }
        }
        if interval == Duration::ZERO {
            tracing::debug!("retry interval is zero; connect loop finished");
            break;
        }
        select! {
            biased;

            () = inner.shutdown.cancelled() => break,
            () = sleep(interval) => {}
        }
    }
}

async fn read_loop(inner: Arc<Inner>, queue: mpsc::Sender<Chunk>) {
    let buffer_size = inner.config.read_buffer_size_value();
    loop {
        let Some(link) = inner.current_link() else {
            if inner.idle().await {
                continue;
            }
            break;
        };
        let outcome = select! {
            biased;

            () = inner.shutdown.cancelled() => break,
            outcome = link.read(buffer_size) => outcome,
        };
        match outcome {
            ReadOutcome::Data(chunk) => {
                let sent = select! {
                    biased;

                    () = inner.shutdown.cancelled() => break,
                    sent = queue.send(Chunk::new(link.index(), chunk)) => sent,
                };
                if sent.is_err() {
                    break;
                }
            }
            ReadOutcome::Empty => {}
            ReadOutcome::Terminal(reason) => {
                inner.log(Level::WARN, &format!("connection closed: {reason}"));
                inner.reset_link(&link).await;
            }
            ReadOutcome::Transient(reason) => {
                inner.log(Level::WARN, &format!("read failed, retrying: {reason}"));
                if !inner.idle().await {
                    break;
                }
            }
        }
    }
}

async fn dispatch_loop(inner: Arc<Inner>, mut queue: mpsc::Receiver<Chunk>) {
    loop {
        let chunk = select! {
            biased;

            () = inner.shutdown.cancelled() => break,
            chunk = queue.recv() => match chunk {
                Some(chunk) => chunk,
                None => break,
            },
        };
        inner.hooks.package(MsgType::Receive, &chunk);
        let Some(handler) = inner.handler() else {
            tracing::debug!(len = chunk.len(), "no message handler; chunk dropped");
            continue;
        };
        if let Err(report) = catch_panic(handler(chunk)).await {
            inner.log(
                Level::ERROR,
                &format!(
                    "message handler panicked: {report}\n{}",
                    report.backtrace()
                ),
            );
        }
    }
    queue.close();
}
