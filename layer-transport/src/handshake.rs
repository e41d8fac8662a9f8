//! Handshake detection: classify a new connection's transport variant and
//! derive its two `CryptoContext`s from the first bytes of the stream.

use layer_crypto::CryptoContext;
use log::debug;

use crate::error::CodecError;
use crate::ring_buffer::RingBuffer;
use crate::variant::CodecVariant;

/// Length of the obfuscation nonce used by every non-Abridged connection.
const NONCE_LEN: usize = 64;

/// Byte offset within the nonce where the (decrypted) discriminator lives.
const DISCRIMINATOR_OFFSET: u64 = 56;

const TAG_ABRIDGED: u32 = 0xefef_efef;
const TAG_INTERMEDIATE: u32 = 0xeeee_eeee;
const TAG_PADDED_INTERMEDIATE: u32 = 0xdddd_dddd;

/// Outcome of attempting to classify a connection from its buffered bytes.
pub enum Handshake {
    /// Not enough bytes buffered yet to decide; call again after more reads.
    NeedMoreData,
    /// Variant classified and both directions' crypto initialized.
    Detected {
        variant: CodecVariant,
        inbound: CryptoContext,
        outbound: CryptoContext,
    },
}

/// Attempt to classify the connection and discard the handshake bytes.
///
/// A bare `0xef` first byte wins immediately, with identity crypto on both
/// directions. Anything else waits for the full 64-byte obfuscation nonce and
/// always derives real AES-CTR-128 keys, including for the `Full` fallback.
pub fn detect(rb: &mut RingBuffer) -> Result<Handshake, CodecError> {
    let first = rb.peek(1);
    if first.is_empty() {
        return Ok(Handshake::NeedMoreData);
    }

    if first[0] == 0xef {
        rb.discard(1);
        debug!("handshake: bare 0xef -> Abridged, identity crypto");
        return Ok(Handshake::Detected {
            variant: CodecVariant::Abridged,
            inbound: CryptoContext::identity(),
            outbound: CryptoContext::identity(),
        });
    }

    let nonce = rb.peek(NONCE_LEN as isize);
    if nonce.len() < NONCE_LEN {
        return Ok(Handshake::NeedMoreData);
    }
    let nonce: [u8; NONCE_LEN] = nonce.try_into().expect("length checked above");

    let inbound_src = &nonce[8..40];
    let mut outbound_src = [0u8; 32];
    outbound_src.copy_from_slice(inbound_src);
    outbound_src.reverse();

    let mut inbound = CryptoContext::from_slices(&inbound_src[..16], &inbound_src[16..])?;
    let outbound = CryptoContext::from_slices(&outbound_src[..16], &outbound_src[16..])?;

    inbound.seek(DISCRIMINATOR_OFFSET);
    let mut tag = nonce[56..60].to_vec();
    inbound.decrypt(&mut tag);
    let discriminator = u32::from_le_bytes(tag.try_into().expect("4 bytes"));

    let variant = match discriminator {
        TAG_ABRIDGED => CodecVariant::Abridged,
        TAG_INTERMEDIATE => CodecVariant::Intermediate,
        TAG_PADDED_INTERMEDIATE => CodecVariant::PaddedIntermediate,
        _ => CodecVariant::Full,
    };
    debug!("handshake: obfuscated nonce -> {variant:?} (discriminator {discriminator:#010x})");

    inbound.seek(NONCE_LEN as u64);
    rb.discard(NONCE_LEN);

    Ok(Handshake::Detected { variant, inbound, outbound })
}
