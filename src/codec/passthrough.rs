//! Identity framing for transports that already deliver whole messages.

use bytes::Bytes;

use super::{Codec, CodecError, UnmarshalError};

/// Codec for message-oriented transports such as WebSocket.
///
/// Each inbound chunk is exactly one frame, so nothing is ever carried over.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassthroughCodec;

impl Codec for PassthroughCodec {
    fn marshal(&self, payload: &[u8]) -> Result<Bytes, CodecError> {
        if payload.is_empty() {
            return Err(CodecError::PackageEmpty);
        }
        Ok(Bytes::copy_from_slice(payload))
    }

    fn unmarshal(
        &self,
        chunk: &[u8],
        on_frame: &mut dyn FnMut(&[u8]),
    ) -> Result<Bytes, UnmarshalError> {
        if !chunk.is_empty() {
            on_frame(chunk);
        }
        Ok(Bytes::new())
    }
}
