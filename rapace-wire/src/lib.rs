//! Envelope types and the length-prefixed wire codec for rapace.
//!
//! An [`Envelope`] is the fundamental unit exchanged between two peers: it
//! carries exactly one logical RPC event (begin a call, a message, a
//! half-close, a terminal status, or a cancellation) tagged with the
//! `stream_id` it belongs to. The codec in this crate is the normative
//! encoding described in the core protocol spec: self-delimiting,
//! forward-compatible, one frame per envelope.

use std::fmt;

mod codec;
mod status;

pub use codec::{decode, encode, DecodeError};
pub use status::StatusCode;

/// Logical stream identifier.
///
/// Unique per direction per transport lifetime. Client-initiated ids are
/// even, server-initiated ids are odd, so a symmetric transport where either
/// side may originate streams never collides.
pub type StreamId = u64;

/// Ordered key/value metadata, e.g. auth tokens or tracing baggage.
pub type Metadata = Vec<(String, String)>;

/// Identifies the method an outbound call targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodKey {
    pub service_name: String,
    pub method_name: String,
}

impl MethodKey {
    pub fn new(service_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            method_name: method_name.into(),
        }
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.service_name, self.method_name)
    }
}

/// Terminal status carried by a `STATUS` envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub code: StatusCode,
    pub message: String,
    pub details: Option<Vec<u8>>,
}

impl Status {
    pub fn ok() -> Self {
        Self {
            code: StatusCode::Ok,
            message: String::new(),
            details: None,
        }
    }

    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == StatusCode::Ok
    }
}

/// The kind tag of an [`Envelope`], as transmitted on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Kind {
    Begin = 1,
    Message = 2,
    HalfClose = 3,
    Status = 4,
    Cancel = 5,
}

impl Kind {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            1 => Kind::Begin,
            2 => Kind::Message,
            3 => Kind::HalfClose,
            4 => Kind::Status,
            5 => Kind::Cancel,
            _ => return None,
        })
    }
}

/// One logical RPC event on the wire.
///
/// Each variant carries only the fields the spec allows for that kind
/// (e.g. `method` only appears on `Begin`), rather than a single struct with
/// a pile of `Option`s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    Begin {
        stream_id: StreamId,
        method: MethodKey,
        metadata: Metadata,
    },
    Message {
        stream_id: StreamId,
        payload: Vec<u8>,
    },
    HalfClose {
        stream_id: StreamId,
    },
    Status {
        stream_id: StreamId,
        metadata: Metadata,
        status: Status,
    },
    Cancel {
        stream_id: StreamId,
    },
}

impl Envelope {
    pub fn stream_id(&self) -> StreamId {
        match self {
            Envelope::Begin { stream_id, .. }
            | Envelope::Message { stream_id, .. }
            | Envelope::HalfClose { stream_id }
            | Envelope::Status { stream_id, .. }
            | Envelope::Cancel { stream_id } => *stream_id,
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Envelope::Begin { .. } => Kind::Begin,
            Envelope::Message { .. } => Kind::Message,
            Envelope::HalfClose { .. } => Kind::HalfClose,
            Envelope::Status { .. } => Kind::Status,
            Envelope::Cancel { .. } => Kind::Cancel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_kind() {
        let envelopes = vec![
            Envelope::Begin {
                stream_id: 2,
                method: MethodKey::new("Calc", "Add"),
                metadata: vec![("auth".into(), "token".into())],
            },
            Envelope::Message {
                stream_id: 2,
                payload: b"hello".to_vec(),
            },
            Envelope::HalfClose { stream_id: 2 },
            Envelope::Status {
                stream_id: 2,
                metadata: vec![],
                status: Status::new(StatusCode::Internal, "boom"),
            },
            Envelope::Cancel { stream_id: 2 },
        ];

        for envelope in envelopes {
            let bytes = encode(&envelope);
            let decoded = decode(&bytes).expect("decode");
            assert_eq!(decoded, envelope);
        }
    }

    #[test]
    fn decode_rejects_truncated_frame() {
        let envelope = Envelope::Cancel { stream_id: 7 };
        let mut bytes = encode(&envelope);
        bytes.truncate(bytes.len() - 2);
        assert!(matches!(decode(&bytes), Err(DecodeError::Truncated)));
    }

    #[test]
    fn decode_rejects_unknown_kind() {
        let envelope = Envelope::Cancel { stream_id: 7 };
        let mut bytes = encode(&envelope);
        // kind byte sits right after the 4-byte length prefix.
        bytes[4] = 0xFF;
        assert!(matches!(decode(&bytes), Err(DecodeError::UnknownKind(0xFF))));
    }
}
