//! A [`Dialer`] that fails on cue and connects to in-memory peers.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use tokio::{
    io::{DuplexStream, duplex},
    sync::mpsc,
};
use wirelink::client::{ClientError, Connection, Dialer};

/// Buffer size of each in-memory connection.
const PIPE_CAPACITY: usize = 64 * 1024;

/// Refuses the first `failures` dials, then connects each dial to a fresh
/// duplex pipe whose remote end is delivered through [`Peers`].
pub struct ScriptedDialer {
    failures: usize,
    attempts: Arc<AtomicUsize>,
    peers: mpsc::UnboundedSender<DuplexStream>,
}

impl ScriptedDialer {
    /// A dialer that connects on every attempt.
    #[must_use]
    pub fn connecting() -> (Self, Peers) { Self::failing(0) }

    /// A dialer that refuses the first `failures` attempts.
    #[must_use]
    pub fn failing(failures: usize) -> (Self, Peers) {
        let (tx, rx) = mpsc::unbounded_channel();
        let attempts = Arc::new(AtomicUsize::new(0));
        (
            Self {
                failures,
                attempts: Arc::clone(&attempts),
                peers: tx,
            },
            Peers { rx, attempts },
        )
    }
}

#[async_trait]
impl Dialer for ScriptedDialer {
    async fn dial(&self) -> Result<Connection, ClientError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            return Err(ClientError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "scripted refusal",
            )));
        }
        let (local, remote) = duplex(PIPE_CAPACITY);
        let _ = self.peers.send(remote);
        Ok(Connection::stream(local))
    }
}

/// Remote ends of the connections made by a [`ScriptedDialer`].
pub struct Peers {
    rx: mpsc::UnboundedReceiver<DuplexStream>,
    attempts: Arc<AtomicUsize>,
}

impl Peers {
    /// Wait for the next successful dial.
    ///
    /// # Panics
    ///
    /// Panics if the dialer has been dropped.
    pub async fn accept(&mut self) -> DuplexStream {
        self.rx.recv().await.expect("dialer dropped before connecting")
    }

    /// Number of dial attempts so far, successful or not.
    #[must_use]
    pub fn attempts(&self) -> usize { self.attempts.load(Ordering::SeqCst) }
}
