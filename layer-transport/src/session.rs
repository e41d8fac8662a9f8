//! The per-connection codec facade.
//!
//! [`CodecSession`] owns one [`crate::handshake::Handshake`] attempt or one
//! negotiated [`Codec`] at a time, plus both directions' crypto. It is
//! exposed two ways: a plain `feed`/`drain_frames`/`encode` surface for unit
//! tests and embedding, and `tokio_util::codec::Decoder`/`Encoder` impls for
//! driving a real [`tokio::net::TcpStream`] through `Framed`. Both surfaces
//! run the exact same state machine — neither duplicates the other's parsing.

use bytes::BytesMut;
use layer_crypto::CryptoContext;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::CodecError;
use crate::handshake::{self, Handshake};
use crate::variant::{Codec, CodecVariant, FrameLimits};

enum SessionState {
    Handshaking,
    Active { codec: Codec, inbound: CryptoContext, outbound: CryptoContext },
}

/// Drives the handshake then the negotiated variant codec for one TCP
/// connection's lifetime.
pub struct CodecSession {
    state: SessionState,
    limits: FrameLimits,
    closed: bool,
    inbound_buf: BytesMut,
}

impl CodecSession {
    /// A session using the default frame size limits (1 MiB / 9 bytes).
    pub fn new() -> Self {
        Self::with_limits(FrameLimits::default())
    }

    /// A session with caller-supplied frame size limits, e.g. for a gateway
    /// that overrides `MAX_FRAME_SIZE` from configuration.
    pub fn with_limits(limits: FrameLimits) -> Self {
        Self {
            state: SessionState::Handshaking,
            limits,
            closed: false,
            inbound_buf: BytesMut::new(),
        }
    }

    /// The negotiated variant, once the handshake has classified the
    /// connection. `None` while still handshaking.
    pub fn variant(&self) -> Option<CodecVariant> {
        match &self.state {
            SessionState::Handshaking => None,
            SessionState::Active { codec, .. } => Some(codec.variant()),
        }
    }

    /// A session that has been poisoned by a prior terminal decode error.
    /// The connection owner must tear down the socket once this is `true`.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Append freshly-read socket bytes to the session's internal buffer.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.inbound_buf.extend_from_slice(bytes);
    }

    /// Decode every complete frame currently available.
    ///
    /// Returns the frames decoded so far on `Ok`. On `Err`, the session is
    /// poisoned (see [`CodecSession::is_closed`]) and every later call
    /// returns `Ok(vec![])` — the error is surfaced exactly once.
    pub fn drain_frames(&mut self) -> Result<Vec<(bool, Vec<u8>)>, CodecError> {
        if self.closed {
            return Ok(Vec::new());
        }
        let mut frames = Vec::new();
        loop {
            match advance(&mut self.state, self.limits, &mut self.inbound_buf) {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => break,
                Err(e) => {
                    log::warn!("codec session poisoned: {e}");
                    self.closed = true;
                    return Err(e);
                }
            }
        }
        Ok(frames)
    }

    /// Encode a payload for this connection's negotiated variant.
    ///
    /// # Panics
    ///
    /// Panics if called before the handshake has classified the connection
    /// — the wire framing (and thus the encoder) is not known until then,
    /// and a server never has outbound data to send before it has read the
    /// peer's handshake bytes.
    pub fn encode(&mut self, payload: &[u8], ack: bool) -> Vec<u8> {
        let mut dst = BytesMut::new();
        Encoder::<(Vec<u8>, bool)>::encode(self, (payload.to_vec(), ack), &mut dst)
            .expect("encode is infallible once the handshake has completed");
        dst.to_vec()
    }
}

impl Default for CodecSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared core: advance the handshake if still in progress, then decode as
/// many phase transitions as `buf` allows, returning at most one frame.
fn advance(
    state: &mut SessionState,
    limits: FrameLimits,
    buf: &mut BytesMut,
) -> Result<Option<(bool, Vec<u8>)>, CodecError> {
    loop {
        match state {
            SessionState::Handshaking => {
                let mut rb = crate::ring_buffer::RingBuffer::new(buf);
                match handshake::detect(&mut rb)? {
                    Handshake::NeedMoreData => return Ok(None),
                    Handshake::Detected { variant, inbound, outbound } => {
                        log::info!("codec session classified as {variant:?}");
                        *state = SessionState::Active {
                            codec: Codec::new(variant, limits),
                            inbound,
                            outbound,
                        };
                    }
                }
            }
            SessionState::Active { codec, inbound, .. } => {
                let mut rb = crate::ring_buffer::RingBuffer::new(buf);
                return codec.decode(&mut rb, inbound);
            }
        }
    }
}

impl Decoder for CodecSession {
    type Item = (bool, Vec<u8>);
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.closed {
            return Ok(None);
        }
        match advance(&mut self.state, self.limits, src) {
            Ok(frame) => Ok(frame),
            Err(e) => {
                log::warn!("codec session poisoned: {e}");
                self.closed = true;
                Err(e)
            }
        }
    }
}

impl Encoder<(Vec<u8>, bool)> for CodecSession {
    type Error = CodecError;

    fn encode(&mut self, item: (Vec<u8>, bool), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (payload, ack) = item;
        match &mut self.state {
            SessionState::Active { codec, outbound, .. } => {
                let wire = codec.encode(&payload, ack, outbound);
                dst.extend_from_slice(&wire);
                Ok(())
            }
            SessionState::Handshaking => {
                panic!("encode called before handshake completed")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abridged_round_trip_through_two_sessions() {
        // Bare 0xef uses identity crypto, so an "inbound" session on one side
        // and an "outbound" session on the other both see the same keystream
        // (none) without needing to share key material explicitly.
        let mut inbound = CodecSession::new();
        let mut outbound = CodecSession::new();

        inbound.feed(&[0xef]);
        assert!(inbound.drain_frames().unwrap().is_empty());
        assert_eq!(inbound.variant(), Some(CodecVariant::Abridged));

        outbound.feed(&[0xef]);
        outbound.drain_frames().unwrap();
        let payload = vec![0xAAu8; 16];
        let wire = outbound.encode(&payload, false);

        inbound.feed(&wire);
        let frames = inbound.drain_frames().unwrap();
        assert_eq!(frames, vec![(false, payload)]);
    }

    #[test]
    fn incremental_feed_yields_same_frames_as_one_shot() {
        let mut writer = CodecSession::new();
        writer.feed(&[0xef]);
        writer.drain_frames().unwrap();
        let a = writer.encode(&[0x01u8; 16], false);
        let b = writer.encode(&[0x02u8; 20], false);

        let mut whole = Vec::new();
        whole.extend_from_slice(&[0xef]);
        whole.extend_from_slice(&a);
        whole.extend_from_slice(&b);

        let mut one_shot = CodecSession::new();
        one_shot.feed(&whole);
        let all_at_once = one_shot.drain_frames().unwrap();

        let mut piecewise = CodecSession::new();
        let mut collected = Vec::new();
        for byte in whole.iter() {
            piecewise.feed(&[*byte]);
            collected.extend(piecewise.drain_frames().unwrap());
        }

        assert_eq!(all_at_once, collected);
        assert_eq!(all_at_once, vec![(false, vec![0x01u8; 16]), (false, vec![0x02u8; 20])]);
    }

    #[test]
    fn decode_error_poisons_session() {
        let mut session = CodecSession::with_limits(FrameLimits {
            max_frame_size: 32,
            min_payload_size: 9,
        });
        session.feed(&[0xef]);
        session.drain_frames().unwrap();

        // low7 = 0x10 -> len = 64, exceeds max_frame_size = 32.
        session.feed(&[0x10]);
        let err = session.drain_frames().unwrap_err();
        assert!(matches!(err, CodecError::FrameTooLarge { .. }));
        assert!(session.is_closed());

        session.feed(&[0u8; 64]);
        assert_eq!(session.drain_frames().unwrap(), Vec::new());
    }
}
