//! Pluggable message codecs.
//!
//! A [`Codec`] is a serialize/deserialize pair for one application message
//! type. The core makes no assumption about the wire format of payloads;
//! [`JsonCodec`] and [`BytesCodec`] are the two shipped implementations,
//! useful for demos and for opaque byte payloads respectively.

use crate::CodecError;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A serialize/deserialize pair for messages of type `T`.
///
/// Implemented on zero-sized marker types (not on `T` itself) so one
/// application type can be paired with different wire formats at different
/// call sites.
pub trait Codec<T>: Send + Sync + 'static {
    fn encode(value: &T) -> Result<Vec<u8>, CodecError>;
    fn decode(bytes: &[u8]) -> Result<T, CodecError>;
}

/// JSON encoding via `serde_json`. Readable, useful for demos and tooling.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<T: Serialize + DeserializeOwned + Send + Sync + 'static> Codec<T> for JsonCodec {
    fn encode(value: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|e| CodecError(e.to_string()))
    }

    fn decode(bytes: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError(e.to_string()))
    }
}

/// Opaque passthrough for callers that already have bytes and don't want a
/// serialization step.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesCodec;

impl Codec<Vec<u8>> for BytesCodec {
    fn encode(value: &Vec<u8>) -> Result<Vec<u8>, CodecError> {
        Ok(value.clone())
    }

    fn decode(bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn json_codec_round_trips() {
        let value = Point { x: 1, y: -2 };
        let bytes = <JsonCodec as Codec<Point>>::encode(&value).unwrap();
        assert_eq!(<JsonCodec as Codec<Point>>::decode(&bytes).unwrap(), value);
    }

    #[test]
    fn bytes_codec_is_a_passthrough() {
        let value = vec![1, 2, 3];
        let bytes = BytesCodec::encode(&value).unwrap();
        assert_eq!(bytes, value);
        assert_eq!(BytesCodec::decode(&bytes).unwrap(), value);
    }
}
