//! Dispatcher tests over in-memory duplex connections.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex},
    sync::mpsc,
};
use tracing_test::traced_test;

use super::*;
use crate::{
    client::{ClientConfig, ClientError, Connection, Dialer, MsgType, Network},
    codec::{Codec, DelimiterCodec, FrameCodec, LengthCodec},
    data::JsonDataBuilder,
    package::{EnvelopePackageBuilder, Package, PackageBuilder},
};

struct PipeDialer {
    peers: mpsc::UnboundedSender<DuplexStream>,
}

#[async_trait]
impl Dialer for PipeDialer {
    async fn dial(&self) -> Result<Connection, ClientError> {
        let (local, remote) = duplex(4096);
        let _ = self.peers.send(remote);
        Ok(Connection::stream(local))
    }
}

/// Remote end that frames with the same codec and JSON envelopes.
struct Peer {
    stream: DuplexStream,
    codec: FrameCodec,
    mask: Option<u8>,
    carry: Vec<u8>,
    pending: Vec<Package>,
}

impl Peer {
    async fn write(&mut self, bytes: &[u8]) { self.stream.write_all(bytes).await.expect("write"); }

    async fn next_package(&mut self) -> Package {
        let builder = EnvelopePackageBuilder::json();
        loop {
            if !self.pending.is_empty() {
                return self.pending.remove(0);
            }
            let mut buf = [0_u8; 1024];
            let n = self.stream.read(&mut buf).await.expect("read");
            assert!(n > 0, "connection closed before a reply arrived");
            self.carry.extend_from_slice(&buf[..n]);
            let mut frames = Vec::new();
            let leftover = self
                .codec
                .unmarshal(&self.carry, &mut |f| frames.push(f.to_vec()))
                .expect("well-formed reply");
            self.carry = leftover.to_vec();
            for mut frame in frames {
                if let Some(key) = self.mask {
                    frame.iter_mut().for_each(|b| *b ^= key);
                }
                self.pending.push(builder.unpack(&frame).expect("reply package"));
            }
        }
    }

    async fn next_pong(&mut self) -> Pong {
        let package = self.next_package().await;
        assert_eq!(package.action(), pong().id());
        JsonDataBuilder.unpack(package.payload()).expect("pong payload")
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Ping {
    seq: u32,
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
struct Pong {
    seq: u32,
}

fn ping() -> Action { Action::new(1, "ping") }

fn pong() -> Action { Action::new(2, "pong") }

fn ponging(ping: Ping) -> Reply<Pong> { Reply::to(pong(), Pong { seq: ping.seq }) }

fn delimited() -> FrameCodec { FrameCodec::from(DelimiterCodec::symmetric(b"\n\n")) }

fn service_with(
    codec: FrameCodec,
    configure: impl FnOnce(ServiceBuilder) -> ServiceBuilder,
) -> (Service, mpsc::UnboundedReceiver<DuplexStream>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let client = Client::builder()
        .config(ClientConfig::default().retry_interval(Duration::from_millis(10)))
        .dialer(PipeDialer { peers: tx })
        .build(Network::Tcp, "pipe");
    let service = configure(Service::builder(client).codec(codec)).build();
    (service, rx)
}

async fn accept(
    service: &Service,
    peers: &mut mpsc::UnboundedReceiver<DuplexStream>,
    mask: Option<u8>,
) -> Peer {
    let stream = peers.recv().await.expect("connection");
    let codec = delimited();
    wait_until(|| service.client().is_connected()).await;
    Peer {
        stream,
        codec,
        mask,
        carry: Vec::new(),
        pending: Vec::new(),
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn handler_reply_reaches_the_peer() {
    let (service, mut peers) = service_with(delimited(), |b| b);
    service.listen(ping(), Ping::default, ponging);
    service.start();
    let mut peer = accept(&service, &mut peers, None).await;

    let frame = service.pack(&ping(), &Ping { seq: 41 }).expect("pack");
    peer.write(&frame).await;
    assert_eq!(peer.next_pong().await, Pong { seq: 41 });
    service.stop().await;
}

#[tokio::test]
async fn reply_is_written_exactly_once() {
    let sends = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&sends);
    let (tx, mut peers) = mpsc::unbounded_channel();
    let client = Client::builder()
        .dialer(PipeDialer { peers: tx })
        .on_package(move |kind, _| {
            if kind == MsgType::Send {
                counted.fetch_add(1, Ordering::SeqCst);
            }
        })
        .build(Network::Tcp, "pipe");
    let service = Service::builder(client).codec(delimited()).build();
    service.listen(ping(), Ping::default, ponging);
    service.start();
    let mut peer = accept(&service, &mut peers, None).await;

    peer.write(&service.pack(&ping(), &Ping { seq: 30 }).expect("pack")).await;
    assert_eq!(peer.next_pong().await, Pong { seq: 30 });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(sends.load(Ordering::SeqCst), 1);

    let mut buf = [0_u8; 64];
    let extra = tokio::time::timeout(Duration::from_millis(50), peer.stream.read(&mut buf)).await;
    assert!(extra.is_err(), "no second copy of the reply");
    service.stop().await;
}

#[tokio::test]
async fn reply_to_action_zero_is_not_sent() {
    let (service, mut peers) = service_with(delimited(), |b| b);
    service.listen(Action::new(5, "fire"), Ping::default, |_: Ping| Reply::<Pong>::none());
    service.listen(ping(), Ping::default, ponging);
    service.start();
    let mut peer = accept(&service, &mut peers, None).await;

    let mut wire = service.pack(&Action::new(5, "fire"), &Ping { seq: 1 }).expect("pack").to_vec();
    wire.extend_from_slice(&service.pack(&ping(), &Ping { seq: 2 }).expect("pack"));
    peer.write(&wire).await;
    assert_eq!(peer.next_pong().await, Pong { seq: 2 });
    service.stop().await;
}

#[tokio::test]
async fn empty_payload_keeps_factory_value_and_empty_reply() {
    let (service, mut peers) = service_with(delimited(), |b| b);
    service.listen(ping(), || Ping { seq: 7 }, ponging);
    service.listen(Action::new(4, "blank"), Ping::default, |_: Ping| {
        Reply::<Pong>::empty(pong())
    });
    service.start();
    let mut peer = accept(&service, &mut peers, None).await;

    let frame = service.inner.frame(&ping(), Vec::new()).expect("frame");
    peer.write(&frame).await;
    assert_eq!(peer.next_pong().await, Pong { seq: 7 });

    let frame = service.inner.frame(&Action::new(4, "blank"), Vec::new()).expect("frame");
    peer.write(&frame).await;
    let package = peer.next_package().await;
    assert_eq!(package.action(), pong().id());
    assert!(package.payload().is_empty());
    service.stop().await;
}

#[traced_test]
#[tokio::test]
async fn unknown_action_is_skipped() {
    let (service, mut peers) = service_with(delimited(), |b| b);
    service.listen(ping(), Ping::default, ponging);
    service.start();
    let mut peer = accept(&service, &mut peers, None).await;

    let mut wire = service.pack(&Action::new(9, "mystery"), &()).expect("pack").to_vec();
    wire.extend_from_slice(&service.pack(&ping(), &Ping { seq: 3 }).expect("pack"));
    peer.write(&wire).await;
    assert_eq!(peer.next_pong().await, Pong { seq: 3 });
    assert!(logs_contain("no handler for action 9"));
    service.stop().await;
}

#[traced_test]
#[tokio::test]
async fn panicking_handler_does_not_drop_later_frames() {
    let (service, mut peers) = service_with(delimited(), |b| b);
    service.listen(Action::new(3, "explode"), Ping::default, |_: Ping| -> Reply<Pong> {
        panic!("handler exploded")
    });
    service.listen(ping(), Ping::default, ponging);
    service.start();
    let mut peer = accept(&service, &mut peers, None).await;

    let mut wire = service.pack(&Action::new(3, "explode"), &Ping::default()).expect("pack").to_vec();
    wire.extend_from_slice(&service.pack(&ping(), &Ping { seq: 8 }).expect("pack"));
    peer.write(&wire).await;
    assert_eq!(peer.next_pong().await, Pong { seq: 8 });
    assert!(logs_contain("action handler panicked: handler exploded"));
    service.stop().await;
}

#[tokio::test]
async fn frame_split_across_chunks_is_handled_once() {
    let (service, mut peers) = service_with(delimited(), |b| b);
    service.listen(ping(), Ping::default, ponging);
    service.start();
    let mut peer = accept(&service, &mut peers, None).await;

    let frame = service.pack(&ping(), &Ping { seq: 12 }).expect("pack");
    let (head, tail) = frame.split_at(frame.len() / 2);
    peer.write(head).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    peer.write(tail).await;
    assert_eq!(peer.next_pong().await, Pong { seq: 12 });

    peer.write(&service.pack(&ping(), &Ping { seq: 13 }).expect("pack")).await;
    assert_eq!(peer.next_pong().await, Pong { seq: 13 });
    service.stop().await;
}

#[traced_test]
#[tokio::test]
async fn partial_frame_is_dropped_on_reconnect() {
    let (service, mut peers) = service_with(delimited(), |b| b);
    service.listen(ping(), Ping::default, ponging);
    service.start();
    let mut peer = accept(&service, &mut peers, None).await;

    let frame = service.pack(&ping(), &Ping { seq: 1 }).expect("pack");
    peer.write(&frame[..frame.len() / 2]).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    drop(peer);

    wait_until(|| service.client().connect_count() == 2).await;
    let mut peer = accept(&service, &mut peers, None).await;
    peer.write(&service.pack(&ping(), &Ping { seq: 2 }).expect("pack")).await;
    assert_eq!(peer.next_pong().await, Pong { seq: 2 });
    assert!(logs_contain("dropping partial frame from previous connection"));
    assert!(!logs_contain("dispatch failed"));
    service.stop().await;
}

#[test]
fn carry_follows_the_connection_that_read_the_bytes() {
    let (service, _peers) = service_with(delimited(), |b| b);
    let frame = service.pack(&ping(), &Ping { seq: 4 }).expect("pack");
    let (head, tail) = frame.split_at(frame.len() / 2);

    let first = service.inner.split(1, head);
    assert!(first.frames.is_empty());
    let joined = service.inner.split(1, tail);
    assert_eq!(joined.frames.len(), 1);
    assert_eq!(&joined.frames[0][..], &frame[..frame.len() - 2]);

    assert!(service.inner.split(1, head).frames.is_empty());
    let fresh = service.inner.split(2, &frame);
    assert_eq!(fresh.frames.len(), 1);
    assert!(!fresh.reset);
}

#[tokio::test]
async fn invalid_magic_resets_the_connection() {
    let codec = FrameCodec::from(LengthCodec::new(0xAB, 1024));
    let (service, mut peers) = service_with(codec.clone(), |b| b);
    service.listen(ping(), Ping::default, ponging);
    service.start();
    let mut peer = accept(&service, &mut peers, None).await;

    peer.write(&[0xFF; 8]).await;
    wait_until(|| service.client().disconnect_count() == 1).await;

    let mut peer = Peer {
        codec,
        ..accept(&service, &mut peers, None).await
    };
    peer.write(&service.pack(&ping(), &Ping { seq: 5 }).expect("pack")).await;
    assert_eq!(peer.next_pong().await, Pong { seq: 5 });
    service.stop().await;
}

struct Xor(u8);

impl PackageInterceptor for Xor {
    fn encode(&self, package: Vec<u8>) -> Result<Vec<u8>, InterceptorError> {
        Ok(package.into_iter().map(|b| b ^ self.0).collect())
    }

    fn decode(&self, package: Vec<u8>) -> Result<Vec<u8>, InterceptorError> { self.encode(package) }
}

#[tokio::test]
async fn interceptor_wraps_both_directions() {
    let (service, mut peers) = service_with(delimited(), |b| b.interceptor(Xor(0x5a)));
    service.listen(ping(), Ping::default, ponging);
    service.start();
    let mut peer = accept(&service, &mut peers, Some(0x5a)).await;

    let frame = service.pack(&ping(), &Ping { seq: 21 }).expect("pack");
    assert!(!frame.starts_with(b"{"));
    peer.write(&frame).await;
    assert_eq!(peer.next_pong().await, Pong { seq: 21 });
    service.stop().await;
}

#[tokio::test]
async fn listen_interceptor_sees_raw_chunks() {
    let (service, mut peers) = service_with(delimited(), |b| {
        b.listen_interceptor(|chunk| chunk.iter().map(|b| b ^ 0x11).collect::<Vec<_>>().into())
    });
    service.listen(ping(), Ping::default, ponging);
    service.start();
    let mut peer = accept(&service, &mut peers, None).await;

    let masked: Vec<u8> = service
        .pack(&ping(), &Ping { seq: 6 })
        .expect("pack")
        .iter()
        .map(|b| b ^ 0x11)
        .collect();
    peer.write(&masked).await;
    assert_eq!(peer.next_pong().await, Pong { seq: 6 });
    service.stop().await;
}

#[tokio::test]
async fn send_without_connection_names_the_action() {
    let (service, _peers) = service_with(delimited(), |b| b);
    let err = service
        .send(&ping(), &Ping { seq: 1 })
        .await
        .expect_err("not connected");
    assert!(matches!(
        err,
        ServiceError::Send {
            source: ClientError::NotConnected,
            ..
        }
    ));
    assert_eq!(err.to_string(), "action[1:ping] send failed");
    assert_eq!(err.stage(), "send");
}

#[test]
fn oversized_package_fails_at_marshal() {
    let (service, _peers) = service_with(FrameCodec::from(LengthCodec::new(0, 4)), |b| b);
    let err = service
        .pack(&ping(), &Ping { seq: 1 })
        .expect_err("too long for the codec");
    assert!(matches!(err, ServiceError::Marshal { .. }));
}

#[test]
fn later_listen_replaces_earlier_and_unlisten_removes() {
    let (service, _peers) = service_with(delimited(), |b| b);
    service.listen(ping(), Ping::default, ponging);
    service.listen(Action::new(1, "ping-again"), Ping::default, ponging);
    assert_eq!(service.inner.routes.len(), 1);
    assert!(service.unlisten(1_u32));
    assert!(!service.unlisten(ActionId::new(1)));
}

#[test]
fn binary_selection_switches_the_data_builder() {
    use crate::{
        data::Scheme,
        provider::{Provider, ProviderConfig},
    };

    let client = Client::builder().build(Network::Tcp, "127.0.0.1:1");
    let selection = Provider::stream(ProviderConfig::default()).get_by_name(Scheme::Binary);
    let service = Service::builder(client).selection(selection).build();
    assert_eq!(service.data_builder().scheme(), Scheme::Binary);
    let frame = service.pack(&ping(), &Ping { seq: 1 }).expect("pack");
    assert_eq!(&frame[..2], &[0x00, 0xAB]);
}
