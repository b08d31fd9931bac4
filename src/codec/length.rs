//! Length-prefixed framing with an optional magic number.
//!
//! Wire layout: `[2-byte big-endian magic][4-byte big-endian length][body]`.
//! The magic number is omitted entirely when configured as zero.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{Codec, CodecError, UnmarshalError};

/// Length prefix header size (4 bytes for big-endian u32).
pub const LENGTH_HEADER_SIZE: usize = 4;

/// Size of the magic number field when one is configured.
pub const MAGIC_NUMBER_SIZE: usize = 2;

/// Codec that prefixes each body with its length.
///
/// ```
/// use wirelink::codec::{Codec, LengthCodec};
///
/// let codec = LengthCodec::new(0xABAB, 1024);
/// let wire = codec.marshal(b"hello").expect("marshal");
/// assert_eq!(&wire[..6], &[0xAB, 0xAB, 0, 0, 0, 5]);
///
/// let mut frames = Vec::new();
/// let leftover = codec
///     .unmarshal(&wire, &mut |f| frames.push(f.to_vec()))
///     .expect("unmarshal");
/// assert_eq!(frames, vec![b"hello".to_vec()]);
/// assert!(leftover.is_empty());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LengthCodec {
    magic_number: u16,
    max_body_size: usize,
}

impl LengthCodec {
    /// Create a codec with a magic number (`0` to disable) and a maximum
    /// body size in bytes.
    #[must_use]
    pub const fn new(magic_number: u16, max_body_size: usize) -> Self {
        Self {
            magic_number,
            max_body_size,
        }
    }

    #[must_use]
    pub const fn magic_number(&self) -> u16 { self.magic_number }

    #[must_use]
    pub const fn max_body_size(&self) -> usize { self.max_body_size }

    /// Bytes preceding the body: the magic number (if any) plus the length.
    #[must_use]
    pub const fn header_size(&self) -> usize {
        self.magic_size() + LENGTH_HEADER_SIZE
    }

    const fn magic_size(&self) -> usize {
        if self.magic_number == 0 {
            0
        } else {
            MAGIC_NUMBER_SIZE
        }
    }
}

impl Codec for LengthCodec {
    fn marshal(&self, payload: &[u8]) -> Result<Bytes, CodecError> {
        if payload.is_empty() {
            return Err(CodecError::PackageEmpty);
        }
        if payload.len() > self.max_body_size {
            return Err(CodecError::PackageTooLong {
                size: payload.len(),
                max: self.max_body_size,
            });
        }
        let length = u32::try_from(payload.len()).map_err(|_| CodecError::PackageTooLong {
            size: payload.len(),
            max: self.max_body_size,
        })?;

        let mut framed = BytesMut::with_capacity(self.header_size() + payload.len());
        if self.magic_number != 0 {
            framed.put_u16(self.magic_number);
        }
        framed.put_u32(length);
        framed.put_slice(payload);
        Ok(framed.freeze())
    }

    fn unmarshal(
        &self,
        chunk: &[u8],
        on_frame: &mut dyn FnMut(&[u8]),
    ) -> Result<Bytes, UnmarshalError> {
        let header_size = self.header_size();
        let mut rest = chunk;

        while rest.len() >= header_size {
            let mut header = &rest[..header_size];
            if self.magic_number != 0 {
                let actual = header.get_u16();
                if actual != self.magic_number {
                    return Err(UnmarshalError::new(
                        CodecError::InvalidMagicNumber {
                            expected: self.magic_number,
                            actual,
                        },
                        Bytes::copy_from_slice(rest),
                    ));
                }
            }

            let body_len = header.get_u32() as usize;
            if body_len > self.max_body_size {
                return Err(UnmarshalError::new(
                    CodecError::PackageTooLong {
                        size: body_len,
                        max: self.max_body_size,
                    },
                    Bytes::copy_from_slice(rest),
                ));
            }

            let frame_len = header_size + body_len;
            if rest.len() < frame_len {
                break;
            }

            let body = &rest[header_size..frame_len];
            if !body.is_empty() {
                on_frame(body);
            }
            rest = &rest[frame_len..];
        }

        Ok(Bytes::copy_from_slice(rest))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn collect(codec: &LengthCodec, input: &[u8]) -> Result<(Vec<Vec<u8>>, Bytes), UnmarshalError> {
        let mut frames = Vec::new();
        let leftover = codec.unmarshal(input, &mut |f| frames.push(f.to_vec()))?;
        Ok((frames, leftover))
    }

    #[test]
    fn magic_number_frame_decodes() {
        let codec = LengthCodec::new(0xABAB, 1024);
        let wire = [0xAB, 0xAB, 0, 0, 0, 5, b'h', b'e', b'l', b'l', b'o'];
        let (frames, leftover) = collect(&codec, &wire).expect("valid frame");
        assert_eq!(frames, vec![b"hello".to_vec()]);
        assert!(leftover.is_empty());
    }

    #[test]
    fn wrong_magic_number_is_rejected_with_leftover() {
        let codec = LengthCodec::new(0xABAB, 1024);
        let wire = [0xFF, 0xFF, 0, 0, 0, 5, b'h', b'e', b'l', b'l', b'o'];
        let err = collect(&codec, &wire).expect_err("magic mismatch");
        assert_eq!(
            err.error(),
            &CodecError::InvalidMagicNumber {
                expected: 0xABAB,
                actual: 0xFFFF,
            }
        );
        assert_eq!(&err.leftover()[..], &wire[..]);
    }

    #[test]
    fn marshal_rejects_empty_and_oversized_payloads() {
        let codec = LengthCodec::new(0, 4);
        assert_eq!(codec.marshal(b""), Err(CodecError::PackageEmpty));
        assert_eq!(
            codec.marshal(b"12345"),
            Err(CodecError::PackageTooLong { size: 5, max: 4 })
        );
        assert!(codec.marshal(b"1234").is_ok());
    }

    #[test]
    fn oversized_declared_length_preserves_bytes() {
        let codec = LengthCodec::new(0, 8);
        let wire = [0, 0, 0, 9, 1, 2, 3];
        let err = collect(&codec, &wire).expect_err("declared length over max");
        assert_eq!(err.error(), &CodecError::PackageTooLong { size: 9, max: 8 });
        assert_eq!(&err.leftover()[..], &wire[..]);
    }

    #[test]
    fn zero_magic_omits_magic_field() {
        let codec = LengthCodec::new(0, 1024);
        let wire = codec.marshal(b"abc").expect("marshal");
        assert_eq!(&wire[..], &[0, 0, 0, 3, b'a', b'b', b'c']);
        assert_eq!(codec.header_size(), LENGTH_HEADER_SIZE);
    }

    #[rstest]
    #[case::short_header(&[0xAB, 0xAB, 0, 0][..])]
    #[case::short_body(&[0xAB, 0xAB, 0, 0, 0, 5, b'h', b'e'][..])]
    fn incomplete_input_is_carried(#[case] input: &[u8]) {
        let codec = LengthCodec::new(0xABAB, 1024);
        let (frames, leftover) = collect(&codec, input).expect("incomplete is not an error");
        assert!(frames.is_empty());
        assert_eq!(&leftover[..], input);
    }

    #[test]
    fn emits_complete_frames_and_carries_the_tail() {
        let codec = LengthCodec::new(0xAB, 1024);
        let mut wire = codec.marshal(b"one").expect("marshal").to_vec();
        wire.extend_from_slice(&codec.marshal(b"two").expect("marshal"));
        let third = codec.marshal(b"three").expect("marshal");
        wire.extend_from_slice(&third[..4]);

        let (frames, leftover) = collect(&codec, &wire).expect("unmarshal");
        assert_eq!(frames, vec![b"one".to_vec(), b"two".to_vec()]);
        assert_eq!(&leftover[..], &third[..4]);
    }

    #[test]
    fn zero_length_body_is_consumed_silently() {
        let codec = LengthCodec::new(0, 16);
        let wire = [0, 0, 0, 0, 0, 0, 0, 1, b'x'];
        let (frames, leftover) = collect(&codec, &wire).expect("unmarshal");
        assert_eq!(frames, vec![b"x".to_vec()]);
        assert!(leftover.is_empty());
    }
}
