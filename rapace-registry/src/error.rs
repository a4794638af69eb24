use rapace_wire::StatusCode;

/// Error code surfaced to callers; identical to the wire status code so the
/// mapping in both directions is exact.
pub type ErrorCode = StatusCode;

/// Errors encoding or decoding an application message with a [`crate::Codec`].
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct CodecError(pub String);

/// Unified error type for everything that can go wrong making or serving a
/// call: local preconditions, codec failures, and peer-reported statuses.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RpcError {
    /// The peer (or the local state machine, for synthesized terminal
    /// statuses like `UNIMPLEMENTED`) reported a terminal status.
    #[error("{code:?}: {message}")]
    Status {
        code: ErrorCode,
        message: String,
        details: Option<Vec<u8>>,
    },
    /// Failed to serialize or deserialize an application message.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    /// The transport reported a failure or was already closed.
    #[error("transport unavailable: {0}")]
    Transport(String),
    /// A call builder was used with a method registered under a different
    /// [`crate::MethodKind`].
    #[error("method type mismatch for {service}/{method}: expected {expected:?}, found {found:?}")]
    MethodTypeMismatch {
        service: String,
        method: String,
        expected: crate::MethodKind,
        found: crate::MethodKind,
    },
    /// `endpoint.close()` was called; no further calls may be made.
    #[error("endpoint is closed")]
    EndpointClosed,
}

impl RpcError {
    pub fn status(code: ErrorCode, message: impl Into<String>) -> Self {
        RpcError::Status {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// The wire status code this error maps onto, for building a `STATUS`
    /// envelope.
    pub fn code(&self) -> ErrorCode {
        match self {
            RpcError::Status { code, .. } => *code,
            RpcError::Codec(_) => ErrorCode::InvalidArgument,
            RpcError::Transport(_) => ErrorCode::Unavailable,
            RpcError::MethodTypeMismatch { .. } => ErrorCode::InvalidArgument,
            RpcError::EndpointClosed => ErrorCode::Unavailable,
        }
    }
}
