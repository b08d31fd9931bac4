//! Builder wiring a [`Service`] onto a client.

use std::sync::Arc;

use bytes::Bytes;

use super::{ListenInterceptor, PackageInterceptor, Service, dispatch::ServiceInner};
use crate::{
    client::Client,
    codec::Codec,
    data::{DataBuilder, Scheme, SchemeDataBuilder},
    package::PackageBuilder,
    provider::{Provider, ProviderConfig, Selection},
};

/// Configures the pipeline of a [`Service`].
///
/// Defaults to the JSON scheme with framing chosen from the client's network:
/// delimiter framing on byte streams, passthrough on WebSocket.
pub struct ServiceBuilder<D = SchemeDataBuilder> {
    client: Client,
    codec: Arc<dyn Codec>,
    package_builder: Arc<dyn PackageBuilder>,
    data_builder: D,
    interceptor: Option<Arc<dyn PackageInterceptor>>,
    listen_interceptor: Option<ListenInterceptor>,
}

impl ServiceBuilder {
    #[must_use]
    pub fn new(client: Client) -> Self {
        let provider = if client.network().is_message() {
            Provider::message(ProviderConfig::default())
        } else {
            Provider::stream(ProviderConfig::default())
        };
        let Selection {
            scheme,
            codec,
            package_builder,
        } = provider.get_by_name(Scheme::Json);
        Self {
            client,
            codec: Arc::new(codec),
            package_builder,
            data_builder: SchemeDataBuilder::from(scheme),
            interceptor: None,
            listen_interceptor: None,
        }
    }
}

impl<D> ServiceBuilder<D> {
    /// Use the codec, package builder and scheme chosen by a provider.
    #[must_use]
    pub fn selection(self, selection: Selection) -> ServiceBuilder<SchemeDataBuilder> {
        ServiceBuilder {
            client: self.client,
            codec: Arc::new(selection.codec),
            package_builder: selection.package_builder,
            data_builder: SchemeDataBuilder::from(selection.scheme),
            interceptor: self.interceptor,
            listen_interceptor: self.listen_interceptor,
        }
    }

    #[must_use]
    pub fn codec(mut self, codec: impl Codec + 'static) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    #[must_use]
    pub fn package_builder(mut self, builder: impl PackageBuilder + 'static) -> Self {
        self.package_builder = Arc::new(builder);
        self
    }

    /// Replace the payload serializer.
    #[must_use]
    pub fn data_builder<E: DataBuilder>(self, data_builder: E) -> ServiceBuilder<E> {
        ServiceBuilder {
            client: self.client,
            codec: self.codec,
            package_builder: self.package_builder,
            data_builder,
            interceptor: self.interceptor,
            listen_interceptor: self.listen_interceptor,
        }
    }

    /// Transform packages after packing and before unpacking.
    #[must_use]
    pub fn interceptor(mut self, interceptor: impl PackageInterceptor + 'static) -> Self {
        self.interceptor = Some(Arc::new(interceptor));
        self
    }

    /// Transform each raw chunk before it is split into frames.
    #[must_use]
    pub fn listen_interceptor<F>(mut self, f: F) -> Self
    where
        F: Fn(Bytes) -> Bytes + Send + Sync + 'static,
    {
        self.listen_interceptor = Some(Arc::new(f));
        self
    }
}

impl<D> ServiceBuilder<D>
where
    D: DataBuilder + 'static,
{
    /// Install the service as the client's message handler.
    ///
    /// The handler holds a weak reference, so dropping every [`Service`]
    /// clone stops dispatch without stopping the client.
    #[must_use]
    pub fn build(self) -> Service<D> {
        let inner = Arc::new(ServiceInner::new(
            self.client,
            self.codec,
            self.package_builder,
            self.data_builder,
            self.interceptor,
            self.listen_interceptor,
        ));
        inner.client.set_message_handler(ServiceInner::handler(&inner));
        Service { inner }
    }
}
