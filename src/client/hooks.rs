//! Observer hooks for connection events and raw traffic.
//!
//! Every hook is optional; absent hooks are no-ops. Hooks run inline on the
//! task that raised the event, so they should return quickly.

use std::{ops::Deref, sync::Arc};

use bytes::Bytes;
use futures::future::BoxFuture;
use tracing::Level;

/// Direction of a raw package reported to a [`PackageHook`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MsgType {
    /// Bytes written to the transport.
    Send,
    /// Bytes read from the transport.
    Receive,
}

/// Hook invoked after each successful connect with the connect counter.
///
/// # Examples
///
/// ```
/// use std::sync::{
///     Arc,
///     atomic::{AtomicU64, Ordering},
/// };
///
/// use wirelink::client::ConnectHook;
///
/// let last = Arc::new(AtomicU64::new(0));
/// let seen = last.clone();
/// let hook: ConnectHook = Arc::new(move |index| seen.store(index, Ordering::SeqCst));
/// hook(1);
/// assert_eq!(last.load(Ordering::SeqCst), 1);
/// ```
pub type ConnectHook = Arc<dyn Fn(u64) + Send + Sync>;

/// Hook invoked after each close with the disconnect counter.
pub type DisconnectHook = Arc<dyn Fn(u64) + Send + Sync>;

/// Hook invoked with every raw chunk written or read.
pub type PackageHook = Arc<dyn Fn(MsgType, &[u8]) + Send + Sync>;

/// Leveled log hook receiving the same events as `tracing`.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use wirelink::client::LogHook;
///
/// let hook: LogHook = Arc::new(|level, message| eprintln!("{level}: {message}"));
/// hook(tracing::Level::INFO, "connected");
/// ```
pub type LogHook = Arc<dyn Fn(Level, &str) + Send + Sync>;

/// Raw bytes from one read, tagged with the connection that produced them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    connection: u64,
    bytes: Bytes,
}

impl Chunk {
    pub(crate) fn new(connection: u64, bytes: Bytes) -> Self { Self { connection, bytes } }

    /// Connect counter value of the connection the bytes were read from.
    ///
    /// Chunks queued before a reconnect keep the old value.
    #[must_use]
    pub fn connection(&self) -> u64 { self.connection }

    #[must_use]
    pub fn bytes(&self) -> &Bytes { &self.bytes }

    #[must_use]
    pub fn into_bytes(self) -> Bytes { self.bytes }
}

impl Deref for Chunk {
    type Target = [u8];

    fn deref(&self) -> &[u8] { &self.bytes }
}

/// Consumer of raw chunks pulled by the dispatch loop.
///
/// At most one invocation is in flight at a time.
pub type MessageHandler = Arc<dyn Fn(Chunk) -> BoxFuture<'static, ()> + Send + Sync>;

/// Hooks configured on a client.
#[derive(Clone, Default)]
pub(crate) struct ClientHooks {
    pub(crate) on_connect: Vec<ConnectHook>,
    pub(crate) on_disconnect: Vec<DisconnectHook>,
    pub(crate) on_package: Option<PackageHook>,
    pub(crate) on_log: Option<LogHook>,
}

impl ClientHooks {
    pub(crate) fn connected(&self, index: u64) {
        for hook in &self.on_connect {
            hook(index);
        }
    }

    pub(crate) fn disconnected(&self, index: u64) {
        for hook in &self.on_disconnect {
            hook(index);
        }
    }

    pub(crate) fn package(&self, kind: MsgType, bytes: &[u8]) {
        if let Some(hook) = &self.on_package {
            hook(kind, bytes);
        }
    }

    pub(crate) fn log(&self, level: Level, message: &str) {
        if let Some(hook) = &self.on_log {
            hook(level, message);
        }
    }
}

/// Emit `message` through `tracing` at `level` and forward it to `hooks`.
pub(crate) fn emit(hooks: &ClientHooks, level: Level, message: &str) {
    if level == Level::ERROR {
        tracing::error!("{message}");
    } else if level == Level::WARN {
        tracing::warn!("{message}");
    } else if level == Level::INFO {
        tracing::info!("{message}");
    } else if level == Level::DEBUG {
        tracing::debug!("{message}");
    } else {
        tracing::trace!("{message}");
    }
    hooks.log(level, message);
}
