//! Read-side view over a socket's receive buffer.
//!
//! Exposes exactly the three operations the codec needs to speculatively
//! parse a frame: peek without consuming, discard once a frame is confirmed,
//! and check how many bytes are available. Backed by [`bytes::BytesMut`] so
//! it composes directly with [`tokio_util::codec::Decoder`].

use bytes::{Buf, BytesMut};

/// A borrowed, non-owning view over a connection's inbound byte buffer.
pub struct RingBuffer<'a> {
    buf: &'a mut BytesMut,
}

impl<'a> RingBuffer<'a> {
    /// Wrap a buffer for the duration of one decode attempt.
    pub fn new(buf: &'a mut BytesMut) -> Self {
        Self { buf }
    }

    /// Number of bytes currently buffered and available to `peek`.
    pub fn readable_bytes(&self) -> usize {
        self.buf.len()
    }

    /// Non-consuming read of up to `n` bytes. `n < 0` means "all available".
    ///
    /// Never panics: if fewer than `n` bytes are buffered, the returned slice
    /// is simply shorter. Callers must check the returned length against
    /// what they need before acting on it.
    pub fn peek(&self, n: isize) -> &[u8] {
        let avail = self.buf.len();
        let want = if n < 0 { avail } else { (n as usize).min(avail) };
        &self.buf[..want]
    }

    /// Advance the read pointer by `n` bytes, dropping them from the buffer.
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds `readable_bytes()` — discarding more than has
    /// been peeked is always a caller bug, never a protocol condition.
    pub fn discard(&mut self, n: usize) {
        assert!(
            n <= self.buf.len(),
            "discard({n}) exceeds readable_bytes() ({})",
            self.buf.len()
        );
        self.buf.advance(n);
    }
}
