//! Loopback TCP and WebSocket echo servers.

use std::{future::Future, net::SocketAddr, time::Duration};

use futures::{SinkExt, StreamExt};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    task::JoinHandle,
};

/// A server bound to an ephemeral loopback port. Aborted on drop.
pub struct LoopbackServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl LoopbackServer {
    #[must_use]
    pub fn addr(&self) -> SocketAddr { self.addr }

    /// `host:port` suitable for [`wirelink::Client`].
    #[must_use]
    pub fn host(&self) -> String { self.addr.to_string() }
}

impl Drop for LoopbackServer {
    fn drop(&mut self) { self.handle.abort(); }
}

async fn serve<F, Fut>(per_connection: F) -> LoopbackServer
where
    F: Fn(tokio::net::TcpStream) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback listener");
    let addr = listener.local_addr().expect("listener address");
    let handle = tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(per_connection(stream));
        }
    });
    LoopbackServer { addr, handle }
}

/// Echo every byte received on each accepted TCP connection.
pub async fn tcp_echo_server() -> LoopbackServer {
    serve(|mut stream| async move {
        let mut buf = [0_u8; 4096];
        loop {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if stream.write_all(&buf[..n]).await.is_err() {
                        break;
                    }
                }
            }
        }
    })
    .await
}

/// Echo every text and binary message on each accepted WebSocket.
pub async fn ws_echo_server() -> LoopbackServer {
    serve(|stream| async move {
        let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
            return;
        };
        let (mut tx, mut rx) = ws.split();
        while let Some(Ok(message)) = rx.next().await {
            if (message.is_text() || message.is_binary()) && tx.send(message).await.is_err() {
                break;
            }
        }
    })
    .await
}

/// Poll `condition` until it holds.
///
/// # Panics
///
/// Panics if it does not hold within five seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
