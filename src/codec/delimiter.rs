//! Delimiter-separated framing.

use bytes::{BufMut, Bytes, BytesMut};

use super::{Codec, CodecError, UnmarshalError};

/// Codec that terminates every frame with a caller-chosen byte sequence.
///
/// Decoding scans for the *last* receive delimiter in the chunk, so only
/// fully terminated frames are emitted; anything after it is leftover.
///
/// ```
/// use wirelink::codec::{Codec, DelimiterCodec};
///
/// let codec = DelimiterCodec::new(b"\n\n", b"\n\n");
/// let mut frames = Vec::new();
/// let leftover = codec
///     .unmarshal(b"\n\nhello\n\nwor", &mut |f| frames.push(f.to_vec()))
///     .expect("delimited input never fails");
/// assert_eq!(frames, vec![b"hello".to_vec()]);
/// assert_eq!(&leftover[..], b"wor");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DelimiterCodec {
    send: Bytes,
    receive: Bytes,
}

impl DelimiterCodec {
    /// Create a codec with separate send and receive delimiters.
    ///
    /// An empty receive delimiter never matches, so every chunk is carried
    /// over unresolved.
    #[must_use]
    pub fn new(send: impl AsRef<[u8]>, receive: impl AsRef<[u8]>) -> Self {
        let receive = Bytes::copy_from_slice(receive.as_ref());
        if receive.is_empty() {
            tracing::warn!("delimiter codec configured with an empty receive delimiter");
        }
        Self {
            send: Bytes::copy_from_slice(send.as_ref()),
            receive,
        }
    }

    /// Create a codec using the same delimiter in both directions.
    #[must_use]
    pub fn symmetric(delimiter: impl AsRef<[u8]>) -> Self {
        let delimiter = delimiter.as_ref();
        Self::new(delimiter, delimiter)
    }

    #[must_use]
    pub fn send_delimiter(&self) -> &[u8] { &self.send }

    #[must_use]
    pub fn receive_delimiter(&self) -> &[u8] { &self.receive }
}

impl Codec for DelimiterCodec {
    fn marshal(&self, payload: &[u8]) -> Result<Bytes, CodecError> {
        if payload.ends_with(&self.send) {
            return Ok(Bytes::copy_from_slice(payload));
        }
        let mut framed = BytesMut::with_capacity(payload.len() + self.send.len());
        framed.put_slice(payload);
        framed.put_slice(&self.send);
        Ok(framed.freeze())
    }

    fn unmarshal(
        &self,
        chunk: &[u8],
        on_frame: &mut dyn FnMut(&[u8]),
    ) -> Result<Bytes, UnmarshalError> {
        let delimiter = &self.receive[..];
        let Some(last) = rfind(chunk, delimiter).filter(|&idx| idx > 0) else {
            return Ok(Bytes::copy_from_slice(chunk));
        };

        let leftover = Bytes::copy_from_slice(&chunk[last + delimiter.len()..]);
        let mut body = &chunk[..last];
        body = body.strip_prefix(delimiter).unwrap_or(body);
        body = body.strip_suffix(delimiter).unwrap_or(body);

        while !body.is_empty() {
            match find(body, delimiter) {
                Some(idx) => {
                    emit_non_empty(&body[..idx], on_frame);
                    body = &body[idx + delimiter.len()..];
                }
                None => {
                    on_frame(body);
                    break;
                }
            }
        }
        Ok(leftover)
    }
}

fn emit_non_empty(frame: &[u8], on_frame: &mut dyn FnMut(&[u8])) {
    if !frame.is_empty() {
        on_frame(frame);
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).rposition(|w| w == needle)
}
