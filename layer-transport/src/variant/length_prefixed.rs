//! Intermediate and PaddedIntermediate framing: a 4-byte LE length prefix,
//! lengths in bytes. The two variants share this decode state machine and
//! differ only in whether `encode` appends random padding.

use layer_crypto::CryptoContext;

use super::FrameLimits;
use crate::error::CodecError;
use crate::ring_buffer::RingBuffer;

const ACK_BIT: u32 = 0x8000_0000;

enum Phase {
    WaitLen,
    WaitPayload { ack: bool, len: usize },
}

/// Shared Intermediate / PaddedIntermediate decode/encode state.
pub struct LengthPrefixedCodec {
    phase: Phase,
    limits: FrameLimits,
    padded: bool,
}

impl LengthPrefixedCodec {
    pub fn new(limits: FrameLimits, padded: bool) -> Self {
        Self { phase: Phase::WaitLen, limits, padded }
    }

    pub fn decode(
        &mut self,
        rb: &mut RingBuffer,
        crypto: &mut CryptoContext,
    ) -> Result<Option<(bool, Vec<u8>)>, CodecError> {
        loop {
            match self.phase {
                Phase::WaitLen => {
                    let peeked = rb.peek(4);
                    if peeked.len() < 4 {
                        return Ok(None);
                    }
                    let mut buf = [peeked[0], peeked[1], peeked[2], peeked[3]];
                    crypto.decrypt(&mut buf);
                    rb.discard(4);

                    let raw = u32::from_le_bytes(buf);
                    let ack = raw & ACK_BIT != 0;
                    let len = (raw & !ACK_BIT) as usize;
                    self.limits.validate(len)?;
                    self.phase = Phase::WaitPayload { ack, len };
                }
                Phase::WaitPayload { ack, len } => {
                    let peeked = rb.peek(len as isize);
                    if peeked.len() < len {
                        return Ok(None);
                    }
                    let mut payload = peeked.to_vec();
                    crypto.decrypt(&mut payload);
                    rb.discard(len);

                    self.phase = Phase::WaitLen;
                    return Ok(Some((ack, payload)));
                }
            }
        }
    }

    /// Encode `payload`. For PaddedIntermediate, 0..15 random bytes are
    /// appended after the payload and before encryption; the length field
    /// still names only the un-padded payload length.
    pub fn encode(&self, payload: &[u8], ack: bool, crypto: &mut CryptoContext) -> Vec<u8> {
        let len = payload.len() as u32;
        let header = if ack { len | ACK_BIT } else { len };

        let mut out = Vec::with_capacity(4 + payload.len() + 15);
        out.extend_from_slice(&header.to_le_bytes());
        out.extend_from_slice(payload);
        if self.padded {
            out.extend_from_slice(&random_padding());
        }
        crypto.encrypt(&mut out);
        out
    }
}

/// 0..15 random bytes, count and contents both from a cryptographic RNG so
/// the padding never leaks keystream structure to an observer.
fn random_padding() -> Vec<u8> {
    let mut count_byte = [0u8; 1];
    getrandom::getrandom(&mut count_byte).expect("getrandom");
    let count = (count_byte[0] % 16) as usize;

    let mut pad = vec![0u8; count];
    getrandom::getrandom(&mut pad).expect("getrandom");
    pad
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    fn limits() -> FrameLimits {
        FrameLimits { max_frame_size: 1 << 20, min_payload_size: 9 }
    }

    #[test]
    fn intermediate_round_trips() {
        let mut enc_ctx = CryptoContext::new([1u8; 16], [1u8; 16]);
        let mut dec_ctx = CryptoContext::new([1u8; 16], [1u8; 16]);
        let mut codec = LengthPrefixedCodec::new(limits(), false);

        let payload = [0xABu8; 32];
        let wire = codec.encode(&payload, false, &mut enc_ctx);
        assert_eq!(wire.len(), 4 + payload.len());

        let mut raw = BytesMut::from(&wire[..]);
        let mut rb = RingBuffer::new(&mut raw);
        let (ack, out) = codec.decode(&mut rb, &mut dec_ctx).unwrap().unwrap();
        assert!(!ack);
        assert_eq!(out, payload);
    }

    #[test]
    fn ack_bit_round_trips() {
        let mut enc_ctx = CryptoContext::new([2u8; 16], [2u8; 16]);
        let mut dec_ctx = CryptoContext::new([2u8; 16], [2u8; 16]);
        let mut codec = LengthPrefixedCodec::new(limits(), false);

        let payload = [0x01u8; 16];
        let wire = codec.encode(&payload, true, &mut enc_ctx);
        let mut raw = BytesMut::from(&wire[..]);
        let mut rb = RingBuffer::new(&mut raw);
        let (ack, out) = codec.decode(&mut rb, &mut dec_ctx).unwrap().unwrap();
        assert!(ack);
        assert_eq!(out, payload);
    }

    #[test]
    fn padded_intermediate_tail_is_discarded_on_decode() {
        let mut enc_ctx = CryptoContext::new([3u8; 16], [3u8; 16]);
        let mut dec_ctx = CryptoContext::new([3u8; 16], [3u8; 16]);
        let mut codec = LengthPrefixedCodec::new(limits(), true);

        let payload = [0x44u8; 12];
        let wire = codec.encode(&payload, false, &mut enc_ctx);
        assert!(wire.len() >= 4 + payload.len());
        assert!(wire.len() <= 4 + payload.len() + 15);

        let mut raw = BytesMut::from(&wire[..]);
        let mut rb = RingBuffer::new(&mut raw);
        let (ack, out) = codec.decode(&mut rb, &mut dec_ctx).unwrap().unwrap();
        assert!(!ack);
        assert_eq!(out, payload);
    }

    #[test]
    fn oversize_length_field_yields_frame_too_large() {
        let mut dec_ctx = CryptoContext::identity();
        let mut codec = LengthPrefixedCodec::new(
            FrameLimits { max_frame_size: 16, min_payload_size: 9 },
            false,
        );

        let mut raw = BytesMut::from(&20u32.to_le_bytes()[..]);
        let mut rb = RingBuffer::new(&mut raw);
        let err = codec.decode(&mut rb, &mut dec_ctx).unwrap_err();
        assert!(matches!(err, CodecError::FrameTooLarge { .. }));
    }

    #[test]
    fn eight_byte_payload_yields_frame_too_small() {
        let mut dec_ctx = CryptoContext::identity();
        let mut codec = LengthPrefixedCodec::new(limits(), false);

        let mut raw = BytesMut::from(&8u32.to_le_bytes()[..]);
        let mut rb = RingBuffer::new(&mut raw);
        let err = codec.decode(&mut rb, &mut dec_ctx).unwrap_err();
        assert!(matches!(err, CodecError::FrameTooSmall { .. }));
    }

    #[test]
    fn incomplete_length_field_preserves_state() {
        let mut dec_ctx = CryptoContext::identity();
        let mut codec = LengthPrefixedCodec::new(limits(), false);

        let mut raw = BytesMut::from(&[0x10u8, 0x00][..]);
        let mut rb = RingBuffer::new(&mut raw);
        assert!(codec.decode(&mut rb, &mut dec_ctx).unwrap().is_none());
        assert_eq!(rb.readable_bytes(), 2, "partial length field must not be consumed");
    }
}
