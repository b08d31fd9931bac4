//! Protocol selection per connection.
//!
//! A [`Provider`] maps a [`Scheme`] to a consistent codec and package builder
//! pair. The scheme is either sniffed from the leading tag byte of the first
//! package on a connection or requested by name.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

use crate::{
    codec::{
        DEFAULT_DELIMITER,
        DEFAULT_MAGIC_NUMBER,
        DEFAULT_MAX_BODY_SIZE,
        DelimiterCodec,
        FrameCodec,
        LengthCodec,
        PassthroughCodec,
    },
    data::Scheme,
    package::{EnvelopePackageBuilder, PackageBuilder},
};

/// Tag byte that opens a JSON value; retained in the remainder.
pub const JSON_OPEN_TAG: u8 = b'{';

/// Tag byte announcing the JSON scheme; stripped from the remainder.
pub const JSON_TAG: u8 = b'j';

/// Framing parameters for one transport kind.
///
/// ```
/// use wirelink::provider::ProviderConfig;
///
/// let config = ProviderConfig::default().magic_number(0xABAB).max_body_size(4096);
/// assert_eq!(config.magic_number_value(), 0xABAB);
/// assert_eq!(config.delimiter_value(), b"\n\n");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderConfig {
    delimiter: Bytes,
    magic_number: u16,
    max_body_size: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            delimiter: Bytes::from_static(DEFAULT_DELIMITER),
            magic_number: DEFAULT_MAGIC_NUMBER,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl ProviderConfig {
    /// Delimiter used by the JSON scheme in both directions.
    #[must_use]
    pub fn delimiter(mut self, delimiter: impl AsRef<[u8]>) -> Self {
        self.delimiter = Bytes::copy_from_slice(delimiter.as_ref());
        self
    }

    /// Magic number used by the binary scheme; `0` disables it.
    #[must_use]
    pub fn magic_number(mut self, magic_number: u16) -> Self {
        self.magic_number = magic_number;
        self
    }

    /// Maximum body size accepted by the binary scheme.
    #[must_use]
    pub fn max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    #[must_use]
    pub fn delimiter_value(&self) -> &[u8] { &self.delimiter }

    #[must_use]
    pub fn magic_number_value(&self) -> u16 { self.magic_number }

    #[must_use]
    pub fn max_body_size_value(&self) -> usize { self.max_body_size }
}

/// Transport family a provider selects codecs for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportKind {
    /// Byte streams (TCP, UDP) that need framing.
    Stream,
    /// Transports that deliver whole messages (WebSocket).
    Message,
}

/// A consistent codec, package builder and scheme for one connection.
#[derive(Clone)]
pub struct Selection {
    pub scheme: Scheme,
    pub codec: FrameCodec,
    pub package_builder: Arc<dyn PackageBuilder>,
}

impl std::fmt::Debug for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selection")
            .field("scheme", &self.scheme)
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

/// Faults raised while sniffing a package.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// There is no tag byte to inspect.
    #[error("first package is empty")]
    EmptyPackage,
}

/// Selects codecs and package builders for a transport kind.
///
/// ```
/// use wirelink::{
///     data::Scheme,
///     provider::{Provider, ProviderConfig},
/// };
///
/// let provider = Provider::stream(ProviderConfig::default());
/// let (selection, rest) = provider.parse_by_package(b"{\"action\":1}").expect("tagged");
/// assert_eq!(selection.scheme, Scheme::Json);
/// assert_eq!(&rest[..], b"{\"action\":1}");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Provider {
    kind: TransportKind,
    config: ProviderConfig,
}

impl Provider {
    /// Provider for stream transports: delimiter framing for JSON, length
    /// framing for binary.
    #[must_use]
    pub fn stream(config: ProviderConfig) -> Self {
        Self {
            kind: TransportKind::Stream,
            config,
        }
    }

    /// Provider for message transports: passthrough framing for both schemes.
    #[must_use]
    pub fn message(config: ProviderConfig) -> Self {
        Self {
            kind: TransportKind::Message,
            config,
        }
    }

    #[must_use]
    pub fn kind(&self) -> TransportKind { self.kind }

    #[must_use]
    pub fn config(&self) -> &ProviderConfig { &self.config }

    /// Select by inspecting the leading tag byte of `first`.
    ///
    /// `{` selects JSON and stays in the remainder; `j` selects JSON and is
    /// stripped; any other byte selects binary and is stripped.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::EmptyPackage`] when `first` is empty.
    pub fn parse_by_package(&self, first: &[u8]) -> Result<(Selection, Bytes), ProviderError> {
        let (&tag, rest) = first.split_first().ok_or(ProviderError::EmptyPackage)?;
        let (scheme, remainder) = match tag {
            JSON_OPEN_TAG => (Scheme::Json, first),
            JSON_TAG => (Scheme::Json, rest),
            _ => (Scheme::Binary, rest),
        };
        tracing::debug!(%scheme, tag, "selected scheme from first package");
        Ok((self.get_by_name(scheme), Bytes::copy_from_slice(remainder)))
    }

    /// Select for a known scheme.
    #[must_use]
    pub fn get_by_name(&self, scheme: Scheme) -> Selection {
        let codec = match (self.kind, scheme) {
            (TransportKind::Message, _) => FrameCodec::from(PassthroughCodec),
            (TransportKind::Stream, Scheme::Json) => {
                FrameCodec::from(DelimiterCodec::symmetric(&self.config.delimiter))
            }
            (TransportKind::Stream, Scheme::Binary) => FrameCodec::from(LengthCodec::new(
                self.config.magic_number,
                self.config.max_body_size,
            )),
        };
        let package_builder: Arc<dyn PackageBuilder> = match scheme {
            Scheme::Json => Arc::new(EnvelopePackageBuilder::json()),
            Scheme::Binary => Arc::new(EnvelopePackageBuilder::binary()),
        };
        Selection {
            scheme,
            codec,
            package_builder,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::open_brace(b"{\"a\":1}".as_slice(), Scheme::Json, b"{\"a\":1}".as_slice())]
    #[case::json_tag(b"j{\"a\":1}".as_slice(), Scheme::Json, b"{\"a\":1}".as_slice())]
    #[case::binary(b"\x01\x02\x03".as_slice(), Scheme::Binary, b"\x02\x03".as_slice())]
    #[case::tag_only(b"j".as_slice(), Scheme::Json, b"".as_slice())]
    fn tag_byte_selects_scheme(
        #[case] first: &[u8],
        #[case] scheme: Scheme,
        #[case] remainder: &[u8],
    ) {
        let provider = Provider::stream(ProviderConfig::default());
        let (selection, rest) = provider.parse_by_package(first).expect("non-empty");
        assert_eq!(selection.scheme, scheme);
        assert_eq!(&rest[..], remainder);
    }

    #[test]
    fn empty_first_package_is_rejected() {
        let provider = Provider::message(ProviderConfig::default());
        assert_eq!(
            provider.parse_by_package(b"").map(|(s, _)| s.scheme),
            Err(ProviderError::EmptyPackage)
        );
    }

    #[test]
    fn stream_provider_uses_configured_framing() {
        let config = ProviderConfig::default()
            .delimiter(b"\r\n")
            .magic_number(0xABAB)
            .max_body_size(64);
        let provider = Provider::stream(config);

        assert_eq!(
            provider.get_by_name(Scheme::Json).codec,
            FrameCodec::from(DelimiterCodec::symmetric(b"\r\n"))
        );
        assert_eq!(
            provider.get_by_name(Scheme::Binary).codec,
            FrameCodec::from(LengthCodec::new(0xABAB, 64))
        );
    }

    #[rstest]
    #[case(Scheme::Json)]
    #[case(Scheme::Binary)]
    fn message_provider_always_passes_through(#[case] scheme: Scheme) {
        let provider = Provider::message(ProviderConfig::default());
        let selection = provider.get_by_name(scheme);
        assert_eq!(selection.codec, FrameCodec::from(PassthroughCodec));
        assert_eq!(selection.scheme, scheme);
    }

    #[test]
    fn sniffed_and_named_selections_agree() {
        let provider = Provider::stream(ProviderConfig::default());
        let (sniffed, _) = provider.parse_by_package(b"\xAB").expect("non-empty");
        let named = provider.get_by_name(Scheme::Binary);
        assert_eq!(sniffed.codec, named.codec);
        assert_eq!(sniffed.scheme, named.scheme);
    }
}
