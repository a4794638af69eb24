/// Which side of a symmetric pair an [`crate::Engine`] plays, for stream-id
/// parity (§5: client-originated ids even, server-originated odd).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Client,
    Server,
}

/// Engine-wide defaults that are not per-method metadata.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Applied to a method invocation when its `MethodMetadata::timeout_ms`
    /// is unset.
    pub default_timeout_ms: Option<u64>,
    /// Bound on a `LogicalStream`'s inbound queue. The reference `mem`
    /// transport and this engine are unbounded internally; this exists so a
    /// future bounded-channel implementation has a place to read the limit
    /// from.
    pub inbound_queue_depth: usize,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: None,
            inbound_queue_depth: 64,
        }
    }
}
