//! Abridged framing: a 1-or-4-byte length prefix, lengths in 4-byte units.

use layer_crypto::CryptoContext;

use super::FrameLimits;
use crate::error::CodecError;
use crate::ring_buffer::RingBuffer;

/// Marker byte signaling the 3-byte extended length form follows.
const LONG_FORM_MARKER: u8 = 0x7f;

enum Phase {
    WaitLen1,
    WaitLen3 { ack: bool },
    WaitPayload { ack: bool, len: usize },
}

/// Abridged variant decode/encode state.
pub struct AbridgedCodec {
    phase: Phase,
    limits: FrameLimits,
}

impl AbridgedCodec {
    pub fn new(limits: FrameLimits) -> Self {
        Self { phase: Phase::WaitLen1, limits }
    }

    /// Attempt to produce one frame from whatever is currently buffered.
    pub fn decode(
        &mut self,
        rb: &mut RingBuffer,
        crypto: &mut CryptoContext,
    ) -> Result<Option<(bool, Vec<u8>)>, CodecError> {
        loop {
            match self.phase {
                Phase::WaitLen1 => {
                    let peeked = rb.peek(1);
                    if peeked.is_empty() {
                        return Ok(None);
                    }
                    let mut byte = [peeked[0]];
                    crypto.decrypt(&mut byte);
                    rb.discard(1);

                    let ack = byte[0] & 0x80 != 0;
                    let low7 = byte[0] & 0x7f;
                    if low7 == LONG_FORM_MARKER {
                        self.phase = Phase::WaitLen3 { ack };
                    } else {
                        let len = low7 as usize * 4;
                        self.limits.validate(len)?;
                        self.phase = Phase::WaitPayload { ack, len };
                    }
                }
                Phase::WaitLen3 { ack } => {
                    let peeked = rb.peek(3);
                    if peeked.len() < 3 {
                        return Ok(None);
                    }
                    let mut buf = [peeked[0], peeked[1], peeked[2]];
                    crypto.decrypt(&mut buf);
                    rb.discard(3);

                    let words = buf[0] as usize | (buf[1] as usize) << 8 | (buf[2] as usize) << 16;
                    let len = words * 4;
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

                    self.phase = Phase::WaitLen1;
                    return Ok(Some((ack, payload)));
                }
            }
        }
    }

    /// Encode `payload` (whose length must be a multiple of 4) into a wire
    /// frame. The ack flag is never set on encode; this server never
    /// requests quick-acks from its peer.
    pub fn encode(&self, payload: &[u8], crypto: &mut CryptoContext) -> Vec<u8> {
        debug_assert_eq!(payload.len() % 4, 0, "Abridged payload must be a multiple of 4 bytes");
        let words = payload.len() / 4;

        let mut out = Vec::with_capacity(4 + payload.len());
        if words < LONG_FORM_MARKER as usize {
            out.push(words as u8);
        } else {
            out.push(LONG_FORM_MARKER);
            out.push((words & 0xff) as u8);
            out.push(((words >> 8) & 0xff) as u8);
            out.push(((words >> 16) & 0xff) as u8);
        }
        out.extend_from_slice(payload);
        crypto.encrypt(&mut out);
        out
    }
}
