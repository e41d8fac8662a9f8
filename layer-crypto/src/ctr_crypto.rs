//! AES-CTR-128 stream crypto for the MTProto TCP transport codec.
//!
//! Wraps [`ctr::Ctr128BE<aes::Aes128>`] so the rest of the codec only ever
//! sees `encrypt`/`decrypt` (they are the same XOR operation) plus a
//! keystream position it can snapshot and seek. CTR mode is byte-granular by
//! construction, which is what lets callers decrypt a 1-, 3- or 4-byte
//! length field and then a much larger payload without ever touching a
//! block boundary by hand.

use aes::Aes128;
use ctr::cipher::{KeyIvInit, StreamCipher, StreamCipherSeek};

type Aes128Ctr = ctr::Ctr128BE<Aes128>;

/// Errors raised when constructing crypto state from untrusted-length slices.
///
/// The fixed-size constructor ([`CryptoContext::new`]) cannot fail — the
/// type system already guarantees 16-byte key/IV material. This error only
/// shows up at the one boundary where key/IV bytes are sliced out of a
/// variable-length handshake buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CryptoError {
    /// The supplied key was not exactly 16 bytes.
    InvalidKeyLength(usize),
    /// The supplied IV was not exactly 16 bytes.
    InvalidIvLength(usize),
}

impl std::fmt::Display for CryptoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidKeyLength(n) => write!(f, "AES-128 key must be 16 bytes, got {n}"),
            Self::InvalidIvLength(n) => write!(f, "AES-128 CTR IV must be 16 bytes, got {n}"),
        }
    }
}
impl std::error::Error for CryptoError {}

/// One direction's AES-CTR-128 keystream, or a passthrough.
///
/// The bare `0xef` Abridged handshake path is the one connection kind that
/// never derives real key material (see the Handshake Detector); modeling
/// that as `Identity` here means the variant codecs never need to special
/// case it.
enum Inner {
    Identity,
    Aes128Ctr(Aes128Ctr),
}

/// Per-direction stream crypto state: an AES-128 key, a 128-bit counter
/// block, and (implicitly, inside the `ctr` crate) a keystream offset into
/// the current counter block.
pub struct CryptoContext {
    inner: Inner,
}

impl CryptoContext {
    /// Construct a real AES-CTR-128 context from a 16-byte key and IV.
    pub fn new(key: [u8; 16], iv: [u8; 16]) -> Self {
        Self {
            inner: Inner::Aes128Ctr(Aes128Ctr::new(&key.into(), &iv.into())),
        }
    }

    /// Construct a context whose key/IV come from variable-length slices
    /// (e.g. sliced out of the 64-byte handshake nonce). Fails if either
    /// slice is not exactly 16 bytes.
    pub fn from_slices(key: &[u8], iv: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; 16] = key
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength(key.len()))?;
        let iv: [u8; 16] = iv
            .try_into()
            .map_err(|_| CryptoError::InvalidIvLength(iv.len()))?;
        Ok(Self::new(key, iv))
    }

    /// A no-op context used for the single unobfuscated Abridged handshake.
    pub fn identity() -> Self {
        Self { inner: Inner::Identity }
    }

    /// Encrypt `data` in place, advancing the keystream by `data.len()`.
    pub fn encrypt(&mut self, data: &mut [u8]) {
        self.apply_keystream(data);
    }

    /// Decrypt `data` in place. CTR mode makes this identical to [`encrypt`](Self::encrypt).
    pub fn decrypt(&mut self, data: &mut [u8]) {
        self.apply_keystream(data);
    }

    fn apply_keystream(&mut self, data: &mut [u8]) {
        match &mut self.inner {
            Inner::Identity => {}
            Inner::Aes128Ctr(cipher) => cipher.apply_keystream(data),
        }
    }

    /// Current keystream position in bytes, used to seek into an encrypted
    /// region without sequentially decrypting the bytes in front of it (the
    /// obfuscated handshake discriminator is the only caller of this).
    ///
    /// Always 0 for an identity context.
    pub fn position(&self) -> u64 {
        match &self.inner {
            Inner::Identity => 0,
            Inner::Aes128Ctr(cipher) => cipher.current_pos(),
        }
    }

    /// Seek the keystream to an absolute byte offset. No-op on an identity
    /// context.
    pub fn seek(&mut self, pos: u64) {
        if let Inner::Aes128Ctr(cipher) = &mut self.inner {
            cipher.seek(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_then_decrypt_round_trips() {
        let mut enc = CryptoContext::new([0u8; 16], [0u8; 16]);
        let mut dec = CryptoContext::new([0u8; 16], [0u8; 16]);
        let mut data = [0x11u8; 16];
        enc.encrypt(&mut data);
        assert_ne!(data, [0x11u8; 16]);
        dec.decrypt(&mut data);
        assert_eq!(data, [0x11u8; 16]);
    }

    #[test]
    fn byte_granular_then_bulk_matches_one_shot() {
        let key = [7u8; 16];
        let iv = [9u8; 16];
        let plaintext = [0xABu8; 37];

        let mut piecewise = CryptoContext::new(key, iv);
        let mut out = plaintext;
        piecewise.encrypt(&mut out[..1]);
        piecewise.encrypt(&mut out[1..4]);
        piecewise.encrypt(&mut out[4..]);

        let mut one_shot = CryptoContext::new(key, iv);
        let mut expected = plaintext;
        one_shot.encrypt(&mut expected);

        assert_eq!(out, expected);
    }

    #[test]
    fn seek_recovers_discriminator_without_consuming_prefix() {
        let key = [3u8; 16];
        let iv = [4u8; 16];
        let mut nonce = [0u8; 64];
        nonce[56..60].copy_from_slice(&0xeeeeeeeeu32.to_le_bytes());

        let mut enc = CryptoContext::new(key, iv);
        let mut wire = nonce;
        enc.encrypt(&mut wire);

        let mut dec = CryptoContext::new(key, iv);
        dec.seek(56);
        let mut tag = wire[56..60].to_vec();
        dec.decrypt(&mut tag);
        assert_eq!(u32::from_le_bytes(tag.try_into().unwrap()), 0xeeeeeeee);
    }

    #[test]
    fn identity_context_is_a_passthrough() {
        let mut ctx = CryptoContext::identity();
        let mut data = [1, 2, 3, 4];
        ctx.encrypt(&mut data);
        assert_eq!(data, [1, 2, 3, 4]);
        assert_eq!(ctx.position(), 0);
    }

    #[test]
    fn from_slices_rejects_wrong_length() {
        assert_eq!(
            CryptoContext::from_slices(&[0u8; 15], &[0u8; 16]).unwrap_err(),
            CryptoError::InvalidKeyLength(15)
        );
        assert_eq!(
            CryptoContext::from_slices(&[0u8; 16], &[0u8; 8]).unwrap_err(),
            CryptoError::InvalidIvLength(8)
        );
    }
}
