//! Payload serialization schemes.
//!
//! A [`DataBuilder`] turns typed application values into bytes and back. Two
//! schemes ship with the crate: [`JsonDataBuilder`] for the text scheme and
//! [`BincodeDataBuilder`] for the binary scheme. [`SchemeDataBuilder`] picks
//! one of them at runtime from a [`Scheme`].

use std::{fmt, str::FromStr};

use bincode::config;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

/// Boxed error returned by the underlying serialization library.
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Serialization scheme negotiated for a connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Text scheme encoded as JSON.
    #[default]
    Json,
    /// Binary scheme encoded with bincode.
    Binary,
}

impl Scheme {
    /// Stable lower-case name used in logs and negotiation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Binary => "binary",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Returned when a scheme name is not recognised.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown scheme: {0}")]
pub struct UnknownScheme(pub String);

impl FromStr for Scheme {
    type Err = UnknownScheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "binary" | "proto" => Ok(Self::Binary),
            other => Err(UnknownScheme(other.to_owned())),
        }
    }
}

/// Faults raised while packing or unpacking a payload.
#[derive(Debug, Error)]
pub enum DataError {
    /// The value cannot be represented in the scheme.
    #[error("value is not serializable as {scheme}")]
    NotSerializable {
        scheme: Scheme,
        #[source]
        source: SourceError,
    },
    /// The bytes do not decode into the target type.
    #[error("malformed {scheme} payload")]
    Malformed {
        scheme: Scheme,
        #[source]
        source: SourceError,
    },
}

/// Serializes application values for one scheme.
///
/// # Object Safety
///
/// This trait is not object-safe: its methods are generic over the value
/// type. Use [`SchemeDataBuilder`] when the scheme is chosen at runtime.
pub trait DataBuilder: Send + Sync {
    /// Scheme implemented by this builder.
    fn scheme(&self) -> Scheme;

    /// Serialize `value`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::NotSerializable`] if the value cannot be
    /// represented.
    fn pack<T>(&self, value: &T) -> Result<Vec<u8>, DataError>
    where
        T: Serialize + ?Sized;

    /// Deserialize `bytes` into `target`.
    ///
    /// Empty input leaves `target` untouched.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Malformed`] if `bytes` do not decode into `T`.
    fn unpack_into<T>(&self, bytes: &[u8], target: &mut T) -> Result<(), DataError>
    where
        T: DeserializeOwned;

    /// Deserialize `bytes` into a fresh `T::default()`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Malformed`] if `bytes` do not decode into `T`.
    fn unpack<T>(&self, bytes: &[u8]) -> Result<T, DataError>
    where
        T: DeserializeOwned + Default,
        Self: Sized,
    {
        let mut value = T::default();
        self.unpack_into(bytes, &mut value)?;
        Ok(value)
    }
}

/// JSON data builder backed by `serde_json`.
///
/// ```
/// use wirelink::data::{DataBuilder, JsonDataBuilder};
///
/// let bytes = JsonDataBuilder.pack(&vec![1, 2]).expect("pack");
/// assert_eq!(bytes, b"[1,2]");
/// let back: Vec<u8> = JsonDataBuilder.unpack(&bytes).expect("unpack");
/// assert_eq!(back, vec![1, 2]);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonDataBuilder;

impl DataBuilder for JsonDataBuilder {
    fn scheme(&self) -> Scheme { Scheme::Json }

    fn pack<T>(&self, value: &T) -> Result<Vec<u8>, DataError>
    where
        T: Serialize + ?Sized,
    {
        serde_json::to_vec(value).map_err(|e| DataError::NotSerializable {
            scheme: Scheme::Json,
            source: Box::new(e),
        })
    }

    fn unpack_into<T>(&self, bytes: &[u8], target: &mut T) -> Result<(), DataError>
    where
        T: DeserializeOwned,
    {
        if bytes.is_empty() {
            return Ok(());
        }
        *target = serde_json::from_slice(bytes).map_err(|e| DataError::Malformed {
            scheme: Scheme::Json,
            source: Box::new(e),
        })?;
        Ok(())
    }
}

/// Binary data builder using `bincode` with its standard configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct BincodeDataBuilder;

impl DataBuilder for BincodeDataBuilder {
    fn scheme(&self) -> Scheme { Scheme::Binary }

    fn pack<T>(&self, value: &T) -> Result<Vec<u8>, DataError>
    where
        T: Serialize + ?Sized,
    {
        bincode::serde::encode_to_vec(value, config::standard()).map_err(|e| {
            DataError::NotSerializable {
                scheme: Scheme::Binary,
                source: Box::new(e),
            }
        })
    }

    fn unpack_into<T>(&self, bytes: &[u8], target: &mut T) -> Result<(), DataError>
    where
        T: DeserializeOwned,
    {
        if bytes.is_empty() {
            return Ok(());
        }
        let (value, _) = bincode::serde::decode_from_slice(bytes, config::standard())
            .map_err(|e| DataError::Malformed {
                scheme: Scheme::Binary,
                source: Box::new(e),
            })?;
        *target = value;
        Ok(())
    }
}

/// Data builder chosen from a [`Scheme`] at runtime.
///
/// ```
/// use wirelink::data::{DataBuilder, Scheme, SchemeDataBuilder};
///
/// let builder = SchemeDataBuilder::from(Scheme::Json);
/// assert_eq!(builder.scheme(), Scheme::Json);
/// assert_eq!(builder.pack("hi").expect("pack"), b"\"hi\"");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemeDataBuilder {
    Json,
    Binary,
}

impl From<Scheme> for SchemeDataBuilder {
    fn from(scheme: Scheme) -> Self {
        match scheme {
            Scheme::Json => Self::Json,
            Scheme::Binary => Self::Binary,
        }
    }
}

impl DataBuilder for SchemeDataBuilder {
    fn scheme(&self) -> Scheme {
        match self {
            Self::Json => Scheme::Json,
            Self::Binary => Scheme::Binary,
        }
    }

    fn pack<T>(&self, value: &T) -> Result<Vec<u8>, DataError>
    where
        T: Serialize + ?Sized,
    {
        match self {
            Self::Json => JsonDataBuilder.pack(value),
            Self::Binary => BincodeDataBuilder.pack(value),
        }
    }

    fn unpack_into<T>(&self, bytes: &[u8], target: &mut T) -> Result<(), DataError>
    where
        T: DeserializeOwned,
    {
        match self {
            Self::Json => JsonDataBuilder.unpack_into(bytes, target),
            Self::Binary => BincodeDataBuilder.unpack_into(bytes, target),
        }
    }
}
