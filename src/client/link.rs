//! One live transport, split into independently locked halves.

use bytes::{Bytes, BytesMut};
use futures::{
    SinkExt,
    StreamExt,
    stream::{SplitSink, SplitStream},
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf},
    sync::Mutex,
};
use tokio_tungstenite::tungstenite::{Error as WsError, Message, error::ProtocolError};
use tokio_util::sync::CancellationToken;

use super::{
    ClientError,
    WsMessageKind,
    transport::{ClientStream, Connection, MessageStream, is_terminal_io},
};

/// Result of one read from a [`Link`].
#[derive(Debug)]
pub(crate) enum ReadOutcome {
    /// Bytes to dispatch.
    Data(Bytes),
    /// Nothing to dispatch, e.g. a control message.
    Empty,
    /// The connection ended.
    Terminal(String),
    /// A recoverable error; poll again after idling.
    Transient(String),
}

enum Reader {
    Stream {
        half: ReadHalf<Box<dyn ClientStream>>,
        datagram: bool,
    },
    Message(SplitStream<Box<dyn MessageStream>>),
}

enum Writer {
    Stream(WriteHalf<Box<dyn ClientStream>>),
    Message(SplitSink<Box<dyn MessageStream>, Message>),
}

pub(crate) struct Link {
    reader: Mutex<Reader>,
    writer: Mutex<Writer>,
    closed: CancellationToken,
    index: u64,
}

impl Link {
    pub(crate) fn new(connection: Connection) -> Self {
        let (reader, writer) = match connection {
            Connection::Stream(stream) => split_stream(stream, false),
            Connection::Datagram(socket) => split_stream(socket, true),
            Connection::Message(stream) => {
                let (w, r) = stream.split();
                (Reader::Message(r), Writer::Message(w))
            }
        };
        Self {
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
            closed: CancellationToken::new(),
            index: 0,
        }
    }

    /// Tag the link with the connect counter value it was opened under.
    pub(crate) fn indexed(mut self, index: u64) -> Self {
        self.index = index;
        self
    }

    pub(crate) fn index(&self) -> u64 { self.index }

    /// Read one chunk, or report why none is available.
    ///
    /// Returns [`ReadOutcome::Terminal`] promptly once [`Link::close`] runs.
    pub(crate) async fn read(&self, buffer_size: usize) -> ReadOutcome {
        let mut reader = self.reader.lock().await;
        tokio::select! {
            biased;

            () = self.closed.cancelled() => ReadOutcome::Terminal("closed locally".into()),
            outcome = read_once(&mut reader, buffer_size) => outcome,
        }
    }

    /// Write `bytes` as one unit.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] after [`Link::close`], or the
    /// transport error.
    pub(crate) async fn send(&self, bytes: &Bytes, kind: WsMessageKind) -> Result<(), ClientError> {
        if self.closed.is_cancelled() {
            return Err(ClientError::NotConnected);
        }
        let mut writer = self.writer.lock().await;
        match &mut *writer {
            Writer::Stream(w) => {
                w.write_all(bytes).await?;
                w.flush().await?;
            }
            Writer::Message(w) => w.send(to_message(bytes, kind)).await?,
        }
        Ok(())
    }

    /// Close the transport. Idempotent.
    pub(crate) async fn close(&self) {
        self.closed.cancel();
        let mut writer = self.writer.lock().await;
        let result = match &mut *writer {
            Writer::Stream(w) => w.shutdown().await.map_err(ClientError::from),
            Writer::Message(w) => w.close().await.map_err(ClientError::from),
        };
        if let Err(err) = result {
            tracing::debug!(error = %err, "error while closing transport");
        }
    }
}

fn split_stream(stream: Box<dyn ClientStream>, datagram: bool) -> (Reader, Writer) {
    let (half, w) = tokio::io::split(stream);
    (Reader::Stream { half, datagram }, Writer::Stream(w))
}

async fn read_once(reader: &mut Reader, buffer_size: usize) -> ReadOutcome {
    match reader {
        Reader::Stream { half, datagram } => {
            let mut buf = BytesMut::with_capacity(buffer_size);
            match half.read_buf(&mut buf).await {
                Ok(0) if *datagram => ReadOutcome::Empty,
                Ok(0) => ReadOutcome::Terminal("end of stream".into()),
                Ok(_) => ReadOutcome::Data(buf.freeze()),
                Err(err) if is_terminal_io(err.kind()) => ReadOutcome::Terminal(err.to_string()),
                Err(err) => ReadOutcome::Transient(err.to_string()),
            }
        }
        Reader::Message(r) => match r.next().await {
            None => ReadOutcome::Terminal("websocket stream ended".into()),
            Some(Ok(message)) => from_message(message),
            Some(Err(err)) => classify_ws_error(&err),
        },
    }
}

fn from_message(message: Message) -> ReadOutcome {
    match message {
        Message::Text(text) if !text.is_empty() => {
            ReadOutcome::Data(Bytes::copy_from_slice(text.as_bytes()))
        }
        Message::Binary(data) if !data.is_empty() => ReadOutcome::Data(Bytes::from(data)),
        Message::Close(frame) => ReadOutcome::Terminal(match frame {
            Some(frame) => format!("websocket closed: {} {}", u16::from(frame.code), &*frame.reason),
            None => "websocket closed".into(),
        }),
        Message::Text(_)
        | Message::Binary(_)
        | Message::Ping(_)
        | Message::Pong(_)
        | Message::Frame(_) => ReadOutcome::Empty,
    }
}

fn classify_ws_error(err: &WsError) -> ReadOutcome {
    let terminal = match err {
        WsError::ConnectionClosed
        | WsError::AlreadyClosed
        | WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => true,
        WsError::Io(io) => is_terminal_io(io.kind()),
        _ => false,
    };
    if terminal {
        ReadOutcome::Terminal(err.to_string())
    } else {
        ReadOutcome::Transient(err.to_string())
    }
}

fn to_message(bytes: &Bytes, kind: WsMessageKind) -> Message {
    match (kind, std::str::from_utf8(bytes)) {
        (WsMessageKind::Text, Ok(text)) => Message::Text(text.to_owned().into()),
        _ => Message::Binary(bytes.clone().into()),
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};

    use super::*;

    #[tokio::test]
    async fn stream_reads_and_writes_through_halves() {
        let (local, mut remote) = duplex(64);
        let link = Link::new(Connection::stream(local));

        remote.write_all(b"hello").await.expect("write");
        match link.read(16).await {
            ReadOutcome::Data(bytes) => assert_eq!(&bytes[..], b"hello"),
            other => panic!("unexpected outcome: {other:?}"),
        }

        link.send(&Bytes::from_static(b"back"), WsMessageKind::Text)
            .await
            .expect("send");
        let mut buf = [0_u8; 4];
        remote.read_exact(&mut buf).await.expect("read");
        assert_eq!(&buf, b"back");
    }

    #[tokio::test]
    async fn peer_close_is_terminal() {
        let (local, remote) = duplex(64);
        let link = Link::new(Connection::stream(local));
        drop(remote);
        assert!(matches!(link.read(16).await, ReadOutcome::Terminal(_)));
    }

    #[tokio::test]
    async fn local_close_unblocks_a_pending_read() {
        let (local, _remote) = duplex(64);
        let link = std::sync::Arc::new(Link::new(Connection::stream(local)));
        let reader = std::sync::Arc::clone(&link);
        let pending = tokio::spawn(async move { reader.read(16).await });
        tokio::task::yield_now().await;
        link.close().await;
        let outcome = pending.await.expect("join");
        assert!(matches!(outcome, ReadOutcome::Terminal(_)));
        assert!(matches!(
            link.send(&Bytes::from_static(b"x"), WsMessageKind::Text).await,
            Err(ClientError::NotConnected)
        ));
    }

    #[test]
    fn text_kind_falls_back_to_binary_for_invalid_utf8() {
        assert!(matches!(
            to_message(&Bytes::from_static(b"{}"), WsMessageKind::Text),
            Message::Text(_)
        ));
        assert!(matches!(
            to_message(&Bytes::from_static(&[0xff, 0xfe]), WsMessageKind::Text),
            Message::Binary(_)
        ));
        assert!(matches!(
            to_message(&Bytes::from_static(b"{}"), WsMessageKind::Binary),
            Message::Binary(_)
        ));
    }

    #[test]
    fn control_messages_are_empty_reads() {
        assert!(matches!(from_message(Message::Ping(Vec::new().into())), ReadOutcome::Empty));
        assert!(matches!(from_message(Message::Close(None)), ReadOutcome::Terminal(_)));
    }
}
