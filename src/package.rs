//! Packages: an action id plus a serialized payload.
//!
//! A [`PackageBuilder`] turns a [`Package`] into the wire representation of
//! one scheme and back. [`EnvelopePackageBuilder`] does so through two
//! injected converters, so the envelope shape stays independent of the
//! action id framing.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::{
    ActionId,
    data::{BincodeDataBuilder, DataBuilder, DataError, JsonDataBuilder},
};

/// An action id together with its serialized payload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Package {
    action: ActionId,
    payload: Vec<u8>,
}

impl Package {
    #[must_use]
    pub fn new(action: impl Into<ActionId>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            action: action.into(),
            payload: payload.into(),
        }
    }

    #[must_use]
    pub const fn action(&self) -> ActionId { self.action }

    #[must_use]
    pub fn payload(&self) -> &[u8] { &self.payload }

    /// Consume the package, returning its payload.
    #[must_use]
    pub fn into_payload(self) -> Vec<u8> { self.payload }
}

/// Faults raised by a [`PackageBuilder`].
#[derive(Debug, Error)]
pub enum PackageError {
    /// `unpack` was given no bytes.
    #[error("no package data")]
    NoData,
    /// `pack` was given no package, or the converter produced nothing.
    #[error("package data is nil")]
    DataNil,
    /// The envelope could not be serialized.
    #[error("failed to pack package")]
    Encode(#[source] DataError),
    /// The bytes could not be deserialized into an envelope.
    #[error("failed to unpack package")]
    Decode(#[source] DataError),
}

/// Converts packages to and from wire bytes.
pub trait PackageBuilder: Send + Sync {
    /// Serialize `package`.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::DataNil`] when `package` is `None` or cannot be
    /// converted, and [`PackageError::Encode`] when serialization fails.
    fn pack(&self, package: Option<&Package>) -> Result<Vec<u8>, PackageError>;

    /// Deserialize a package from `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::NoData`] for empty input and
    /// [`PackageError::Decode`] when the bytes are not a valid envelope.
    fn unpack(&self, bytes: &[u8]) -> Result<Package, PackageError>;
}

/// Converter from a package into a scheme-native envelope.
pub type ToData<E> = Arc<dyn Fn(&Package) -> Option<E> + Send + Sync>;

/// Converter from a decoded envelope back into a package.
pub type ToPackage<E> = Arc<dyn Fn(E) -> Package + Send + Sync>;

/// Default envelope carried on the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub action: u32,
    pub data: Vec<u8>,
}

impl From<&Package> for Envelope {
    fn from(package: &Package) -> Self {
        Self {
            action: package.action.get(),
            data: package.payload.clone(),
        }
    }
}

impl From<Envelope> for Package {
    fn from(envelope: Envelope) -> Self { Package::new(envelope.action, envelope.data) }
}

/// Package builder that serializes an envelope `E` with a data builder `D`.
///
/// ```
/// use wirelink::package::{EnvelopePackageBuilder, Package, PackageBuilder};
///
/// let builder = EnvelopePackageBuilder::json();
/// let bytes = builder
///     .pack(Some(&Package::new(7_u32, b"{}".to_vec())))
///     .expect("pack");
/// let package = builder.unpack(&bytes).expect("unpack");
/// assert_eq!(package.action().get(), 7);
/// assert_eq!(package.payload(), b"{}");
/// ```
pub struct EnvelopePackageBuilder<E, D> {
    data_builder: D,
    to_data: ToData<E>,
    to_package: ToPackage<E>,
}

impl<E, D> EnvelopePackageBuilder<E, D> {
    /// Create a builder with custom converters.
    pub fn new<F, G>(data_builder: D, to_data: F, to_package: G) -> Self
    where
        F: Fn(&Package) -> Option<E> + Send + Sync + 'static,
        G: Fn(E) -> Package + Send + Sync + 'static,
    {
        Self {
            data_builder,
            to_data: Arc::new(to_data),
            to_package: Arc::new(to_package),
        }
    }
}

impl<D> EnvelopePackageBuilder<Envelope, D> {
    /// Create a builder for the default [`Envelope`].
    pub fn envelope(data_builder: D) -> Self {
        Self::new(data_builder, |p| Some(Envelope::from(p)), Package::from)
    }
}

impl EnvelopePackageBuilder<Envelope, JsonDataBuilder> {
    /// Default JSON package builder.
    #[must_use]
    pub fn json() -> Self { Self::envelope(JsonDataBuilder) }
}

impl EnvelopePackageBuilder<Envelope, BincodeDataBuilder> {
    /// Default binary package builder.
    #[must_use]
    pub fn binary() -> Self { Self::envelope(BincodeDataBuilder) }
}

impl<E, D> Clone for EnvelopePackageBuilder<E, D>
where
    D: Clone,
{
    fn clone(&self) -> Self {
        Self {
            data_builder: self.data_builder.clone(),
            to_data: Arc::clone(&self.to_data),
            to_package: Arc::clone(&self.to_package),
        }
    }
}

impl<E, D> fmt::Debug for EnvelopePackageBuilder<E, D>
where
    D: DataBuilder,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvelopePackageBuilder")
            .field("scheme", &self.data_builder.scheme())
            .finish_non_exhaustive()
    }
}

impl<E, D> PackageBuilder for EnvelopePackageBuilder<E, D>
where
    E: Serialize + DeserializeOwned + Default,
    D: DataBuilder,
{
    fn pack(&self, package: Option<&Package>) -> Result<Vec<u8>, PackageError> {
        let envelope = package
            .and_then(|p| (self.to_data)(p))
            .ok_or(PackageError::DataNil)?;
        self.data_builder
            .pack(&envelope)
            .map_err(PackageError::Encode)
    }

    fn unpack(&self, bytes: &[u8]) -> Result<Package, PackageError> {
        if bytes.is_empty() {
            return Err(PackageError::NoData);
        }
        let mut envelope = E::default();
        self.data_builder
            .unpack_into(bytes, &mut envelope)
            .map_err(PackageError::Decode)?;
        Ok((self.to_package)(envelope))
    }
}
