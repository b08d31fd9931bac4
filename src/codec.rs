//! Pluggable framing codecs for byte streams.
//!
//! A codec turns an outgoing package into framed bytes and splits inbound
//! chunks back into frames. Chunks rarely line up with frame boundaries, so
//! [`Codec::unmarshal`] returns the bytes that did not yet form a complete
//! frame; callers prepend them to the next chunk.
//!
//! Three strategies are provided:
//!
//! - [`DelimiterCodec`]: frames terminated by a byte sequence.
//! - [`LengthCodec`]: `[magic][u32 length][body]` frames.
//! - [`PassthroughCodec`]: one frame per transport message.
//!
//! [`FrameCodec`] is the closed set of all three, used by
//! [`crate::provider::Provider`] when selecting a codec per connection.

use bytes::Bytes;

mod delimiter;
pub mod error;
mod length;
mod passthrough;

pub use delimiter::DelimiterCodec;
pub use error::{CodecError, UnmarshalError};
pub use length::{LENGTH_HEADER_SIZE, LengthCodec, MAGIC_NUMBER_SIZE};
pub use passthrough::PassthroughCodec;

/// Default delimiter used by the text scheme on stream transports.
pub const DEFAULT_DELIMITER: &[u8] = b"\n\n";

/// Default magic number used by the binary scheme on stream transports.
pub const DEFAULT_MAGIC_NUMBER: u16 = 0xAB;

/// Default maximum body size in bytes.
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024;

/// Framing strategy shared by all codecs.
///
/// Implementations hold configuration only and are safe to call from many
/// tasks at once; per-connection carry-over is the caller's responsibility.
pub trait Codec: Send + Sync {
    /// Frame `payload` for transmission.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the payload violates the codec's limits.
    fn marshal(&self, payload: &[u8]) -> Result<Bytes, CodecError>;

    /// Split `chunk` into frames, invoking `on_frame` once per complete frame
    /// in stream order, and return the unresolved tail.
    ///
    /// # Errors
    ///
    /// Returns [`UnmarshalError`] carrying the unresolved bytes when a frame
    /// header is malformed. Frames emitted before the fault stay emitted.
    fn unmarshal(
        &self,
        chunk: &[u8],
        on_frame: &mut dyn FnMut(&[u8]),
    ) -> Result<Bytes, UnmarshalError>;
}

/// Closed set of the built-in codecs.
///
/// ```
/// use wirelink::codec::{Codec, FrameCodec, PassthroughCodec};
///
/// let codec = FrameCodec::from(PassthroughCodec);
/// assert_eq!(&codec.marshal(b"hi").expect("marshal")[..], b"hi");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameCodec {
    /// Delimiter-terminated frames.
    Delimiter(DelimiterCodec),
    /// Length-prefixed frames.
    Length(LengthCodec),
    /// One frame per transport message.
    Passthrough(PassthroughCodec),
}

impl FrameCodec {
    fn inner(&self) -> &dyn Codec {
        match self {
            Self::Delimiter(codec) => codec,
            Self::Length(codec) => codec,
            Self::Passthrough(codec) => codec,
        }
    }
}

impl Codec for FrameCodec {
    fn marshal(&self, payload: &[u8]) -> Result<Bytes, CodecError> { self.inner().marshal(payload) }

    fn unmarshal(
        &self,
        chunk: &[u8],
        on_frame: &mut dyn FnMut(&[u8]),
    ) -> Result<Bytes, UnmarshalError> {
        self.inner().unmarshal(chunk, on_frame)
    }
}

impl From<DelimiterCodec> for FrameCodec {
    fn from(codec: DelimiterCodec) -> Self { Self::Delimiter(codec) }
}

impl From<LengthCodec> for FrameCodec {
    fn from(codec: LengthCodec) -> Self { Self::Length(codec) }
}

impl From<PassthroughCodec> for FrameCodec {
    fn from(codec: PassthroughCodec) -> Self { Self::Passthrough(codec) }
}
