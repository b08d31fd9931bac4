//! Inbound pipeline: carry-over, framing, routing and replies.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use bytes::{Bytes, BytesMut};
use futures::future::BoxFuture;
use tracing::Level;

use super::{
    ListenInterceptor,
    PackageInterceptor,
    ServiceError,
    registry::{Registry, ReplyPayload},
};
use crate::{
    Action,
    client::{Chunk, Client, MessageHandler},
    codec::Codec,
    data::DataBuilder,
    metrics::{self, Direction},
    package::{Package, PackageBuilder},
    panic::catch_panic,
};

/// Unresolved bytes of the connection that produced them.
#[derive(Default)]
struct Carry {
    generation: u64,
    bytes: BytesMut,
}

pub(super) struct ServiceInner<D> {
    pub(super) client: Client,
    codec: Arc<dyn Codec>,
    package_builder: Arc<dyn PackageBuilder>,
    pub(super) data_builder: D,
    interceptor: Option<Arc<dyn PackageInterceptor>>,
    listen_interceptor: Option<ListenInterceptor>,
    pub(super) routes: Registry<D>,
    carry: Mutex<Carry>,
}

/// Frames split from one chunk, and whether the stream is unrecoverable.
pub(super) struct Split {
    pub(super) frames: Vec<Bytes>,
    pub(super) reset: bool,
}

impl<D> ServiceInner<D>
where
    D: DataBuilder + 'static,
{
    pub(super) fn new(
        client: Client,
        codec: Arc<dyn Codec>,
        package_builder: Arc<dyn PackageBuilder>,
        data_builder: D,
        interceptor: Option<Arc<dyn PackageInterceptor>>,
        listen_interceptor: Option<ListenInterceptor>,
    ) -> Self {
        Self {
            client,
            codec,
            package_builder,
            data_builder,
            interceptor,
            listen_interceptor,
            routes: Registry::default(),
            carry: Mutex::new(Carry::default()),
        }
    }

    pub(super) fn handler(this: &Arc<Self>) -> MessageHandler {
        let weak: Weak<Self> = Arc::downgrade(this);
        Arc::new(move |chunk: Chunk| -> BoxFuture<'static, ()> {
            let weak = weak.clone();
            Box::pin(async move {
                if let Some(inner) = weak.upgrade() {
                    inner.dispatch(chunk).await;
                }
            })
        })
    }

    pub(super) fn clear_carry(&self) {
        let mut carry = self.carry.lock().unwrap_or_else(PoisonError::into_inner);
        carry.bytes.clear();
    }

    /// Package, intercept and frame an already serialized payload.
    pub(super) fn frame(&self, action: &Action, payload: Vec<u8>) -> Result<Bytes, ServiceError> {
        let package = Package::new(action.id(), payload);
        let packed = self
            .package_builder
            .pack(Some(&package))
            .map_err(|source| ServiceError::PackPackage {
                action: action.clone(),
                source,
            })?;
        let packed = match &self.interceptor {
            Some(interceptor) => {
                interceptor
                    .encode(packed)
                    .map_err(|source| ServiceError::Encode {
                        action: action.clone(),
                        source,
                    })?
            }
            None => packed,
        };
        self.codec
            .marshal(&packed)
            .map_err(|source| ServiceError::Marshal {
                action: action.clone(),
                source,
            })
    }

    async fn dispatch(&self, chunk: Chunk) {
        let connection = chunk.connection();
        let bytes = match &self.listen_interceptor {
            Some(transform) => transform(chunk.into_bytes()),
            None => chunk.into_bytes(),
        };
        let Split { frames, reset } = self.split(connection, &bytes);

        for frame in frames {
            metrics::inc_frames(Direction::Inbound);
            match catch_panic(self.handle(frame)).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    metrics::inc_dispatch_errors(err.stage());
                    self.client.log(Level::ERROR, &format!("dispatch failed: {err}"));
                }
                Err(report) => {
                    metrics::inc_handler_panics();
                    self.client.log(
                        Level::ERROR,
                        &format!("action handler panicked: {report}\n{}", report.backtrace()),
                    );
                }
            }
        }

        if reset {
            self.client.reset_connection(connection).await;
        }
    }

    /// Prepend the carry, split into frames and store the new tail.
    ///
    /// The carry belongs to the connection that read it: bytes left by a
    /// different connection are dropped before the chunk is appended.
    pub(super) fn split(&self, connection: u64, chunk: &[u8]) -> Split {
        let mut carry = self.carry.lock().unwrap_or_else(PoisonError::into_inner);
        if carry.generation != connection {
            if !carry.bytes.is_empty() {
                tracing::debug!(
                    len = carry.bytes.len(),
                    "dropping partial frame from previous connection"
                );
            }
            carry.bytes.clear();
            carry.generation = connection;
        }

        let mut input = std::mem::take(&mut carry.bytes);
        input.extend_from_slice(chunk);

        let mut frames = Vec::new();
        let mut on_frame = |frame: &[u8]| frames.push(Bytes::copy_from_slice(frame));
        let reset = match self.codec.unmarshal(&input, &mut on_frame) {
            Ok(leftover) => {
                carry.bytes.extend_from_slice(&leftover);
                false
            }
            Err(err) => {
                let (error, leftover) = err.into_parts();
                metrics::inc_dispatch_errors(error.error_type());
                if error.should_disconnect() {
                    self.client.log(
                        Level::ERROR,
                        &format!("unmarshal failed, resetting connection: {error}"),
                    );
                    true
                } else {
                    self.client.log(Level::WARN, &format!("unmarshal failed: {error}"));
                    carry.bytes.extend_from_slice(&leftover);
                    false
                }
            }
        };
        Split { frames, reset }
    }

    async fn handle(&self, frame: Bytes) -> Result<(), ServiceError> {
        let raw = match &self.interceptor {
            Some(interceptor) => interceptor.decode(frame.to_vec()).map_err(ServiceError::Decode)?,
            None => frame.to_vec(),
        };
        let package = self
            .package_builder
            .unpack(&raw)
            .map_err(ServiceError::UnpackPackage)?;

        let Some(route) = self.routes.get(package.action()) else {
            self.client.log(
                Level::WARN,
                &format!("no handler for action {}", package.action()),
            );
            return Ok(());
        };
        let action = route.action().clone();
        tracing::debug!(%action, len = package.payload().len(), "handling");

        match route.call(&self.data_builder, package.payload())? {
            Some(ReplyPayload { action: reply, payload }) => {
                let frame = self.frame(&reply, payload)?;
                self.write(&reply, frame).await?;
                tracing::debug!(%action, %reply, "handled and replied");
            }
            None => tracing::debug!(%action, "handled without reply"),
        }
        Ok(())
    }
}
