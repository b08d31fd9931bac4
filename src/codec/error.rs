//! Error types for the framing layer.
//!
//! Encoding faults ([`CodecError::PackageEmpty`], [`CodecError::PackageTooLong`])
//! are reported to the caller of `marshal`. Decoding faults are wrapped in an
//! [`UnmarshalError`] that also hands back every byte the codec could not
//! resolve, so nothing read from the transport is silently discarded.

use bytes::Bytes;
use thiserror::Error;

/// Framing-level faults raised while encoding or decoding.
///
/// # Examples
///
/// ```
/// use wirelink::codec::CodecError;
///
/// let err = CodecError::InvalidMagicNumber {
///     expected: 0xABAB,
///     actual: 0xFFFF,
/// };
/// assert!(err.should_disconnect());
/// assert!(!CodecError::PackageEmpty.should_disconnect());
/// ```
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Zero-length payload where the codec requires content.
    #[error("package is empty")]
    PackageEmpty,

    /// Payload or declared body length exceeds the configured maximum.
    #[error("package too long: {size} > {max}")]
    PackageTooLong {
        /// Actual or declared body size.
        size: usize,
        /// Maximum body size accepted by the codec.
        max: usize,
    },

    /// The frame header does not start with the configured magic number.
    #[error("invalid magic number: expected {expected:#06x}, got {actual:#06x}")]
    InvalidMagicNumber {
        /// Magic number configured on the codec.
        expected: u16,
        /// Magic number found on the wire.
        actual: u16,
    },
}

impl CodecError {
    /// Returns true if a decode fault leaves the stream unrecoverable.
    ///
    /// Both a magic mismatch and an oversized length header stay at the front
    /// of the unresolved bytes, so every later read would fail the same way.
    /// Callers should discard the leftover and reset the connection.
    #[must_use]
    pub fn should_disconnect(&self) -> bool {
        matches!(
            self,
            Self::InvalidMagicNumber { .. } | Self::PackageTooLong { .. }
        )
    }

    /// Returns the error category as a string for logging and metrics.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::PackageEmpty => "package_empty",
            Self::PackageTooLong { .. } => "package_too_long",
            Self::InvalidMagicNumber { .. } => "invalid_magic_number",
        }
    }
}

/// A decode fault together with the bytes left unresolved.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{error}")]
pub struct UnmarshalError {
    #[source]
    error: CodecError,
    leftover: Bytes,
}

impl UnmarshalError {
    pub(crate) fn new(error: CodecError, leftover: impl Into<Bytes>) -> Self {
        Self {
            error,
            leftover: leftover.into(),
        }
    }

    /// The framing fault.
    #[must_use]
    pub fn error(&self) -> &CodecError { &self.error }

    /// Bytes the codec could not resolve, starting at the faulty header.
    #[must_use]
    pub fn leftover(&self) -> &Bytes { &self.leftover }

    /// Split into the fault and the leftover bytes.
    #[must_use]
    pub fn into_parts(self) -> (CodecError, Bytes) { (self.error, self.leftover) }
}
