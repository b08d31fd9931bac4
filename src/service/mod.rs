//! Action dispatch on top of a [`Client`].
//!
//! A [`Service`] owns the framing codec, package builder and data builder for
//! one connection manager. Incoming chunks are split into frames, unpacked
//! and routed by action id to handlers registered with [`Service::listen`].
//! Outgoing values travel the same pipeline in reverse.

use std::{fmt, sync::Arc};

use serde::{Serialize, de::DeserializeOwned};
use tracing::Level;

mod builder;
mod dispatch;
mod error;
mod interceptor;
mod registry;

pub use builder::ServiceBuilder;
pub use error::ServiceError;
pub use interceptor::{InterceptorError, ListenInterceptor, PackageInterceptor};
pub use registry::Reply;
use dispatch::ServiceInner;
use registry::HandlerRoute;

use crate::{
    Action,
    ActionId,
    client::Client,
    data::{DataBuilder, SchemeDataBuilder},
    metrics::{self, Direction},
};

/// Dispatcher bound to one client.
///
/// Cloning is cheap; clones share the routing table and carry buffer.
///
/// # Examples
///
/// ```no_run
/// use serde::{Deserialize, Serialize};
/// use wirelink::{
///     Action,
///     client::{Client, Network},
///     data::Scheme,
///     provider::{Provider, ProviderConfig},
///     service::{Reply, Service},
/// };
///
/// #[derive(Default, Deserialize)]
/// struct Ping {
///     seq: u32,
/// }
///
/// #[derive(Serialize)]
/// struct Pong {
///     seq: u32,
/// }
///
/// # #[tokio::main]
/// # async fn main() {
/// let client = Client::builder().build(Network::Tcp, "127.0.0.1:9000");
/// let provider = Provider::stream(ProviderConfig::default());
/// let service = Service::builder(client)
///     .selection(provider.get_by_name(Scheme::Json))
///     .build();
///
/// service.listen(Action::new(1, "ping"), Ping::default, |ping: Ping| {
///     Reply::to(Action::new(2, "pong"), Pong { seq: ping.seq })
/// });
/// service.start();
/// # service.stop().await;
/// # }
/// ```
pub struct Service<D = SchemeDataBuilder> {
    inner: Arc<ServiceInner<D>>,
}

impl<D> Clone for Service<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: DataBuilder> fmt::Debug for Service<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("client", &self.inner.client)
            .field("scheme", &self.inner.data_builder.scheme())
            .field("routes", &self.inner.routes.len())
            .finish_non_exhaustive()
    }
}

impl Service {
    /// Start configuring a service over `client`.
    #[must_use]
    pub fn builder(client: Client) -> ServiceBuilder { ServiceBuilder::new(client) }
}

impl<D> Service<D>
where
    D: DataBuilder + 'static,
{
    /// The underlying connection manager.
    #[must_use]
    pub fn client(&self) -> &Client { &self.inner.client }

    /// The data builder used for payloads.
    #[must_use]
    pub fn data_builder(&self) -> &D { &self.inner.data_builder }

    /// Register `handler` for `action`, replacing any earlier registration.
    ///
    /// For each matching frame `factory` builds a fresh value, the payload
    /// is decoded into it and the handler's [`Reply`] is sent unless it is
    /// addressed to an action with id `0`. Empty payloads leave the factory
    /// value as built.
    pub fn listen<T, R, F, H>(&self, action: Action, factory: F, handler: H)
    where
        T: DeserializeOwned + 'static,
        R: Serialize + 'static,
        F: Fn() -> T + Send + Sync + 'static,
        H: Fn(T) -> Reply<R> + Send + Sync + 'static,
    {
        tracing::debug!(%action, "listening");
        self.inner
            .routes
            .insert(Arc::new(HandlerRoute::new(action, factory, handler)));
    }

    /// Remove the handler for `action`. Returns whether one was registered.
    pub fn unlisten(&self, action: impl Into<ActionId>) -> bool {
        self.inner.routes.remove(action.into())
    }

    /// Serialize `data` and frame it for `action` without sending.
    ///
    /// # Errors
    ///
    /// Returns the failing stage of the outgoing pipeline.
    pub fn pack<T>(&self, action: &Action, data: &T) -> Result<bytes::Bytes, ServiceError>
    where
        T: Serialize + ?Sized,
    {
        let payload = self
            .inner
            .data_builder
            .pack(data)
            .map_err(|source| ServiceError::PackData {
                action: action.clone(),
                source,
            })?;
        self.inner.frame(action, payload)
    }

    /// Serialize `data` for `action` and write it to the connection.
    ///
    /// # Errors
    ///
    /// Returns the failing stage of the outgoing pipeline, including
    /// [`ServiceError::Send`] when there is no live connection.
    pub async fn send<T>(&self, action: &Action, data: &T) -> Result<(), ServiceError>
    where
        T: Serialize + ?Sized,
    {
        let frame = self.pack(action, data)?;
        self.inner.write(action, frame).await
    }

    /// Send `action` with an empty payload.
    ///
    /// # Errors
    ///
    /// As for [`Service::send`].
    pub async fn send_empty(&self, action: &Action) -> Result<(), ServiceError> {
        let frame = self.inner.frame(action, Vec::new())?;
        self.inner.write(action, frame).await
    }

    /// Periodically send `data` framed for `action` while connected.
    ///
    /// # Errors
    ///
    /// Returns the pipeline error if the heartbeat package cannot be built.
    pub fn heartbeat<T>(
        &self,
        action: &Action,
        data: &T,
        interval: std::time::Duration,
    ) -> Result<(), ServiceError>
    where
        T: Serialize + ?Sized,
    {
        let frame = self.pack(action, data)?;
        self.inner.client.heartbeat(frame, interval);
        Ok(())
    }

    /// Start the client loops.
    pub fn start(&self) { self.inner.client.start(); }

    /// Stop the client loops and drop any partial frame.
    pub async fn stop(&self) {
        self.inner.client.stop().await;
        self.inner.clear_carry();
    }
}

impl<D> ServiceInner<D>
where
    D: DataBuilder + 'static,
{
    async fn write(&self, action: &Action, frame: bytes::Bytes) -> Result<(), ServiceError> {
        match self.client.send(frame).await {
            Ok(()) => {
                metrics::inc_frames(Direction::Outbound);
                tracing::debug!(%action, "sent");
                Ok(())
            }
            Err(source) => {
                let err = ServiceError::Send {
                    action: action.clone(),
                    source,
                };
                self.client.log(Level::WARN, &err.to_string());
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests;
