//! The collaborator decoded frames are handed to once a connection's codec
//! has classified its variant.
//!
//! The gateway's job ends at "decode the wire framing and hand me bytes";
//! what happens to those bytes (routing to a session service over gRPC, a
//! local RPC dispatcher, whatever sits behind this gateway) is out of scope
//! here. [`FrameForwarder`] is the seam: a real deployment supplies its own
//! implementation, and [`LoggingForwarder`] is the stub wired in by default.

/// Receives one decoded transport frame at a time.
///
/// Synchronous by design: nothing in this workspace depends on `async-trait`
/// or boxed futures for dyn trait objects, and a forwarder that itself needs
/// to await I/O can spawn its own task rather than making this trait async.
pub trait FrameForwarder: Send + Sync {
    /// `payload` is the frame body with transport framing already stripped;
    /// `ack` is the Intermediate/PaddedIntermediate quick-ack bit, always
    /// `false` for Abridged and Full. Returns an immediate reply to write
    /// back to the same connection, if any.
    fn forward(&self, payload: &[u8], ack: bool) -> Option<Vec<u8>>;
}

/// Default forwarder: logs and drops. Useful for exercising the transport
/// codec end to end before a real routing layer exists.
pub struct LoggingForwarder;

impl FrameForwarder for LoggingForwarder {
    fn forward(&self, payload: &[u8], ack: bool) -> Option<Vec<u8>> {
        log::info!("received frame: {} bytes, ack={ack}", payload.len());
        None
    }
}
