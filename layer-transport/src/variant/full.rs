//! Full framing (legacy, included for completeness): a 4-byte LE total
//! length, a 4-byte LE sequence number, the payload, and a trailing 4-byte
//! LE CRC32. The only variant with per-direction sequence counters and an
//! integrity check of its own.

use layer_crypto::CryptoContext;

use super::FrameLimits;
use crate::error::CodecError;
use crate::ring_buffer::RingBuffer;

/// Bytes of header (4-byte length + 4-byte seq_no) plus trailing CRC32.
const OVERHEAD: usize = 12;

enum Phase {
    WaitLen,
    WaitRest { total_len: usize, len_field: [u8; 4] },
}

/// Full variant decode/encode state, including independent inbound/outbound
/// sequence counters. Never process-global — each connection gets its own.
pub struct FullCodec {
    phase: Phase,
    limits: FrameLimits,
    inbound_seq: u32,
    outbound_seq: u32,
}

impl FullCodec {
    pub fn new(limits: FrameLimits) -> Self {
        Self { phase: Phase::WaitLen, limits, inbound_seq: 0, outbound_seq: 0 }
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
                    let mut len_field = [peeked[0], peeked[1], peeked[2], peeked[3]];
                    crypto.decrypt(&mut len_field);
                    rb.discard(4);

                    let total_len = u32::from_le_bytes(len_field) as usize;
                    let payload_len = total_len.checked_sub(OVERHEAD).ok_or(
                        CodecError::FrameTooSmall { len: total_len, min: OVERHEAD },
                    )?;
                    self.limits.validate(payload_len)?;
                    self.phase = Phase::WaitRest { total_len, len_field };
                }
                Phase::WaitRest { total_len, len_field } => {
                    let rest_len = total_len - 4; // seq_no + payload + crc32
                    let peeked = rb.peek(rest_len as isize);
                    if peeked.len() < rest_len {
                        return Ok(None);
                    }
                    let mut rest = peeked.to_vec();
                    crypto.decrypt(&mut rest);
                    rb.discard(rest_len);

                    let payload_len = total_len - OVERHEAD;
                    let seq_bytes = &rest[..4];
                    let payload = rest[4..4 + payload_len].to_vec();
                    let crc_bytes = &rest[4 + payload_len..8 + payload_len];

                    let expected = u32::from_le_bytes(crc_bytes.try_into().expect("4 bytes"));
                    let mut check_input = Vec::with_capacity(total_len - 4);
                    check_input.extend_from_slice(&len_field);
                    check_input.extend_from_slice(seq_bytes);
                    check_input.extend_from_slice(&payload);
                    let actual = crc32_ieee(&check_input);

                    if actual != expected {
                        return Err(CodecError::CrcMismatch { expected, actual });
                    }

                    self.inbound_seq = self.inbound_seq.wrapping_add(1);
                    self.phase = Phase::WaitLen;
                    return Ok(Some((false, payload)));
                }
            }
        }
    }

    /// Encode `payload` with the next outbound sequence number. Full never
    /// requests a quick-ack; there is no ack bit in this framing.
    pub fn encode(&mut self, payload: &[u8], crypto: &mut CryptoContext) -> Vec<u8> {
        let total_len = (OVERHEAD + payload.len()) as u32;
        let seq = self.outbound_seq;
        self.outbound_seq = self.outbound_seq.wrapping_add(1);

        let mut buf = Vec::with_capacity(total_len as usize);
        buf.extend_from_slice(&total_len.to_le_bytes());
        buf.extend_from_slice(&seq.to_le_bytes());
        buf.extend_from_slice(payload);

        let crc = crc32_ieee(&buf);
        buf.extend_from_slice(&crc.to_le_bytes());

        crypto.encrypt(&mut buf);
        buf
    }
}

/// CRC-32 using the standard IEEE 802.3 polynomial.
fn crc32_ieee(data: &[u8]) -> u32 {
    const POLY: u32 = 0xedb88320;
    let mut crc: u32 = 0xffff_ffff;
    for &byte in data {
        let mut b = byte as u32;
        for _ in 0..8 {
            let mix = (crc ^ b) & 1;
            crc >>= 1;
            if mix != 0 {
                crc ^= POLY;
            }
            b >>= 1;
        }
    }
    crc ^ 0xffff_ffff
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    fn limits() -> FrameLimits {
        FrameLimits { max_frame_size: 1 << 20, min_payload_size: 9 }
    }

    #[test]
    fn round_trips_and_advances_seq_no() {
        let mut enc_ctx = CryptoContext::new([4u8; 16], [4u8; 16]);
        let mut dec_ctx = CryptoContext::new([4u8; 16], [4u8; 16]);
        let mut codec = FullCodec::new(limits());

        let payload = [0x55u8; 20];
        let wire = codec.encode(&payload, &mut enc_ctx);

        let mut raw = BytesMut::from(&wire[..]);
        let mut rb = RingBuffer::new(&mut raw);
        let (ack, out) = codec.decode(&mut rb, &mut dec_ctx).unwrap().unwrap();
        assert!(!ack);
        assert_eq!(out, payload);
        assert_eq!(codec.inbound_seq, 1);
        assert_eq!(codec.outbound_seq, 1);
    }

    #[test]
    fn corrupted_payload_byte_yields_crc_mismatch() {
        let mut enc_ctx = CryptoContext::new([8u8; 16], [8u8; 16]);
        let mut dec_ctx = CryptoContext::new([8u8; 16], [8u8; 16]);
        let mut codec = FullCodec::new(limits());

        let payload = [0x66u8; 20];
        let mut wire = codec.encode(&payload, &mut enc_ctx);
        // Flip a bit inside the ciphertext covering the payload region.
        let last = wire.len() - 1;
        wire[last - 4] ^= 0x01;

        let mut raw = BytesMut::from(&wire[..]);
        let mut rb = RingBuffer::new(&mut raw);
        let err = codec.decode(&mut rb, &mut dec_ctx).unwrap_err();
        assert!(matches!(err, CodecError::CrcMismatch { .. }));
    }

    #[test]
    fn crc32_ieee_matches_known_vector() {
        assert_eq!(crc32_ieee(b"123456789"), 0xCBF4_3926);
    }
}
