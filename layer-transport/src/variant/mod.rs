//! Variant codecs: the four MTProto TCP transport framings.
//!
//! Each variant owns a small phase state machine and shares the same
//! `decode`/`encode` contract, dispatched through the [`Codec`] enum so the
//! session never needs a virtual call on the hot path.

mod abridged;
mod full;
mod length_prefixed;

pub use abridged::AbridgedCodec;
pub use full::FullCodec;
pub use length_prefixed::LengthPrefixedCodec;

use crate::error::CodecError;
use crate::ring_buffer::RingBuffer;
use layer_crypto::CryptoContext;

/// Frame size limits shared by every variant codec.
///
/// Lives per-session rather than as process globals so tests can exercise
/// boundary conditions (`MAX_FRAME_SIZE + 1`, exactly `MIN_PAYLOAD_SIZE`)
/// without touching global state.
#[derive(Clone, Copy, Debug)]
pub struct FrameLimits {
    /// Largest payload length, in bytes, the codec will deliver or accept.
    pub max_frame_size: usize,
    /// Smallest payload length, in bytes, the codec will deliver or accept.
    pub min_payload_size: usize,
}

impl FrameLimits {
    fn validate(&self, len: usize) -> Result<(), CodecError> {
        if len > self.max_frame_size {
            return Err(CodecError::FrameTooLarge { len, max: self.max_frame_size });
        }
        if len < self.min_payload_size {
            return Err(CodecError::FrameTooSmall { len, min: self.min_payload_size });
        }
        Ok(())
    }
}

impl Default for FrameLimits {
    fn default() -> Self {
        Self {
            max_frame_size: crate::MAX_FRAME_SIZE,
            min_payload_size: crate::MIN_PAYLOAD_SIZE,
        }
    }
}

/// Which of the four TCP transport framings a connection negotiated.
///
/// Immutable once the handshake has classified a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodecVariant {
    /// 1-or-4-byte length prefix, lengths in 4-byte units.
    Abridged,
    /// 4-byte LE length prefix, lengths in bytes.
    Intermediate,
    /// Intermediate framing plus 0..15 random trailing padding bytes on encode.
    PaddedIntermediate,
    /// Legacy framing with a running sequence number and a trailing CRC32.
    Full,
}

/// A variant codec instance, holding whichever per-variant phase state is
/// relevant. Dispatch is two-level: match on the variant, then on the phase
/// inside it.
pub enum Codec {
    Abridged(AbridgedCodec),
    Intermediate(LengthPrefixedCodec),
    PaddedIntermediate(LengthPrefixedCodec),
    Full(FullCodec),
}

impl Codec {
    /// Which variant this instance was negotiated for.
    pub fn variant(&self) -> CodecVariant {
        match self {
            Codec::Abridged(_) => CodecVariant::Abridged,
            Codec::Intermediate(_) => CodecVariant::Intermediate,
            Codec::PaddedIntermediate(_) => CodecVariant::PaddedIntermediate,
            Codec::Full(_) => CodecVariant::Full,
        }
    }

    /// Instantiate the codec for a classified variant with the given limits.
    pub fn new(variant: CodecVariant, limits: FrameLimits) -> Self {
        match variant {
            CodecVariant::Abridged => Codec::Abridged(AbridgedCodec::new(limits)),
            CodecVariant::Intermediate => {
                Codec::Intermediate(LengthPrefixedCodec::new(limits, false))
            }
            CodecVariant::PaddedIntermediate => {
                Codec::PaddedIntermediate(LengthPrefixedCodec::new(limits, true))
            }
            CodecVariant::Full => Codec::Full(FullCodec::new(limits)),
        }
    }

    /// Decode as many frames' worth of state transitions as the buffered
    /// bytes allow, returning at most one complete frame per call.
    pub fn decode(
        &mut self,
        rb: &mut RingBuffer,
        crypto: &mut CryptoContext,
    ) -> Result<Option<(bool, Vec<u8>)>, CodecError> {
        match self {
            Codec::Abridged(c) => c.decode(rb, crypto),
            Codec::Intermediate(c) => c.decode(rb, crypto),
            Codec::PaddedIntermediate(c) => c.decode(rb, crypto),
            Codec::Full(c) => c.decode(rb, crypto),
        }
    }

    /// Encode a payload into wire bytes for this variant.
    pub fn encode(&mut self, payload: &[u8], ack: bool, crypto: &mut CryptoContext) -> Vec<u8> {
        match self {
            Codec::Abridged(c) => c.encode(payload, crypto),
            Codec::Intermediate(c) => c.encode(payload, ack, crypto),
            Codec::PaddedIntermediate(c) => c.encode(payload, ack, crypto),
            Codec::Full(c) => c.encode(payload, crypto),
        }
    }
}
