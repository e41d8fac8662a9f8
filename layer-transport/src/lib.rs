//! MTProto TCP transport frame codec.
//!
//! Sits between a raw duplex TCP stream and the session/RPC layer: detects
//! which of the four wire-format variants a peer chose on first contact,
//! decrypts the stream with AES-CTR-128 under a per-connection key, slices
//! the decrypted stream into framed payloads, and serializes outbound
//! payloads back into the same framing.
//!
//! The codec itself never performs I/O. [`CodecSession`] is driven either
//! by feeding it raw bytes directly (`feed`/`drain_frames`/`encode`) or, in
//! production, through its `tokio_util::codec::Decoder`/`Encoder`
//! implementation inside a `Framed<TcpStream, CodecSession>`.

#![deny(unsafe_code)]

pub mod error;
pub mod handshake;
pub mod ring_buffer;
pub mod session;
pub mod variant;

pub use error::CodecError;
pub use session::CodecSession;
pub use variant::{CodecVariant, FrameLimits};

/// Largest payload length, in bytes, the codec will deliver or accept.
///
/// Overridable per-session via [`FrameLimits`] — the gateway binary reads an
/// override from configuration (see `layer-gateway`), but every `CodecSession`
/// created without one gets this default.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Smallest payload length, in bytes, the codec will deliver or accept.
///
/// The first 8 bytes of every delivered payload are the `auth_key_id`; a
/// payload must contain at least one byte beyond that to be meaningful.
pub const MIN_PAYLOAD_SIZE: usize = 9;
