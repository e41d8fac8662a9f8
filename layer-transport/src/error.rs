//! Error taxonomy for the MTProto TCP transport codec.

use layer_crypto::CryptoError;

/// Terminal errors raised while decoding or encoding a frame.
///
/// "Need more data" is deliberately *not* a variant here: every `decode`
/// returns `Ok(None)` for that case so that an incomplete frame is never
/// confused with a desynchronized stream. Every variant below instead marks
/// the connection unrecoverable — see [`crate::session::CodecSession`].
#[derive(Debug)]
pub enum CodecError {
    /// A length field decoded to a value above `MAX_FRAME_SIZE`.
    FrameTooLarge {
        /// The offending length, in bytes.
        len: usize,
        /// The configured ceiling it exceeded.
        max: usize,
    },
    /// A length field decoded to a value below `MIN_PAYLOAD_SIZE`.
    FrameTooSmall {
        /// The offending length, in bytes.
        len: usize,
        /// The configured floor it fell short of.
        min: usize,
    },
    /// The handshake's 64-byte obfuscation nonce failed to classify.
    ///
    /// In this codec every non-`0xef` discriminator falls through to `Full`,
    /// so this only fires if the nonce itself could not be consumed.
    HandshakeUnknown,
    /// The Full variant's trailing CRC32 did not match the computed value.
    CrcMismatch {
        /// CRC32 carried on the wire.
        expected: u32,
        /// CRC32 recomputed over the received bytes.
        actual: u32,
    },
    /// Crypto construction failed (wrong key/IV length out of the handshake).
    CryptoMisuse(CryptoError),
    /// The underlying socket failed. Only ever produced by the
    /// `tokio_util::codec::Framed` integration, which folds I/O errors and
    /// codec errors into one `Error` type.
    Io(std::io::Error),
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FrameTooLarge { len, max } => {
                write!(f, "frame length {len} exceeds MAX_FRAME_SIZE ({max})")
            }
            Self::FrameTooSmall { len, min } => {
                write!(f, "frame length {len} is below MIN_PAYLOAD_SIZE ({min})")
            }
            Self::HandshakeUnknown => write!(f, "handshake did not classify to a known variant"),
            Self::CrcMismatch { expected, actual } => {
                write!(f, "CRC32 mismatch: wire={expected:#010x} computed={actual:#010x}")
            }
            Self::CryptoMisuse(e) => write!(f, "crypto misuse: {e}"),
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<CryptoError> for CodecError {
    fn from(e: CryptoError) -> Self {
        Self::CryptoMisuse(e)
    }
}

impl From<std::io::Error> for CodecError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
