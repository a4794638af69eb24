//! The transport contract consumed by the rapace engine.
//!
//! A transport is an opaque, ordered, reliable, bidirectional channel of
//! byte frames. It knows nothing about envelopes, streams, or RPC semantics;
//! it only has to preserve frame boundaries (one `send` produces exactly one
//! frame on the peer's `recv_frame`).

use thiserror::Error;

/// Failure modes a transport implementation may report.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport has been closed locally or by the peer.
    #[error("transport closed")]
    Closed,
    /// An I/O-level failure occurred.
    #[error("transport io error: {0}")]
    Io(#[from] std::io::Error),
    /// The peer violated the framing contract (e.g. sent a frame that could
    /// not be parsed as a whole envelope).
    #[error("transport framing error: {0}")]
    Framing(String),
}

/// Opaque bidirectional byte-frame channel consumed by the engine.
///
/// Implementations MUST preserve frame boundaries: each accepted `send_frame`
/// call corresponds to exactly one `recv_frame` on the peer. `recv_frame`
/// returns `Err(TransportError::Closed)` once the peer has gone away; it
/// never blocks forever past that point.
pub trait Transport: Send + Sync + 'static {
    /// Enqueue a frame for transmission. Resolves once the transport has
    /// accepted it (not necessarily once the peer has received it).
    fn send_frame(
        &self,
        frame: Vec<u8>,
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;

    /// Receive the next frame. Ends (returns `Err(Closed)`) when the peer
    /// closes or the transport fails.
    fn recv_frame(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<u8>, TransportError>> + Send;

    /// Idempotent; flushes pending sends best-effort and releases resources.
    fn close(&self);

    /// Whether this transport has already been closed.
    fn is_closed(&self) -> bool;
}
