//! Length-prefixed tag-length-value encoding for [`Envelope`](crate::Envelope).
//!
//! Wire shape: a 4-byte big-endian length of everything that follows, then a
//! 1-byte kind, an 8-byte big-endian stream id, then kind-specific fields.
//! Strings and byte payloads are each preceded by a 4-byte big-endian length.
//! Unknown trailing bytes within a known field are never produced by this
//! codec, but readers MUST NOT fail on extra bytes after decoding a field
//! they understand, to keep the format forward-compatible.

use crate::{Envelope, Kind, Metadata, MethodKey, Status, StatusCode};

/// Errors produced while decoding a frame into an [`Envelope`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("frame shorter than its length prefix declares")]
    Truncated,
    #[error("frame length prefix does not match buffer length")]
    LengthMismatch,
    #[error("unknown envelope kind byte: {0}")]
    UnknownKind(u8),
    #[error("unknown status code: {0}")]
    UnknownStatusCode(u16),
    #[error("field contained invalid utf-8")]
    InvalidUtf8,
}

/// Encode an envelope into one complete frame, including its length prefix.
pub fn encode(envelope: &Envelope) -> Vec<u8> {
    let mut body = Vec::new();
    body.push(envelope.kind() as u8);
    body.extend_from_slice(&envelope.stream_id().to_be_bytes());

    match envelope {
        Envelope::Begin {
            method, metadata, ..
        } => {
            write_str(&mut body, &method.service_name);
            write_str(&mut body, &method.method_name);
            write_metadata(&mut body, metadata);
        }
        Envelope::Message { payload, .. } => {
            write_bytes(&mut body, payload);
        }
        Envelope::HalfClose { .. } => {}
        Envelope::Status {
            metadata, status, ..
        } => {
            write_metadata(&mut body, metadata);
            body.extend_from_slice(&status.code.as_u16().to_be_bytes());
            write_str(&mut body, &status.message);
            match &status.details {
                Some(details) => {
                    body.push(1);
                    write_bytes(&mut body, details);
                }
                None => body.push(0),
            }
        }
        Envelope::Cancel { .. } => {}
    }

    let mut frame = Vec::with_capacity(4 + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&body);
    frame
}

/// Decode one complete frame (as produced by [`encode`]) into an envelope.
pub fn decode(buf: &[u8]) -> Result<Envelope, DecodeError> {
    let mut cursor = Cursor::new(buf);
    let declared_len = cursor.read_u32()? as usize;
    if cursor.remaining() != declared_len {
        return Err(DecodeError::LengthMismatch);
    }

    let kind_byte = cursor.read_u8()?;
    let kind = Kind::from_u8(kind_byte).ok_or(DecodeError::UnknownKind(kind_byte))?;
    let stream_id = cursor.read_u64()?;

    Ok(match kind {
        Kind::Begin => {
            let service_name = cursor.read_string()?;
            let method_name = cursor.read_string()?;
            let metadata = cursor.read_metadata()?;
            Envelope::Begin {
                stream_id,
                method: MethodKey::new(service_name, method_name),
                metadata,
            }
        }
        Kind::Message => {
            let payload = cursor.read_bytes()?;
            Envelope::Message { stream_id, payload }
        }
        Kind::HalfClose => Envelope::HalfClose { stream_id },
        Kind::Status => {
            let metadata = cursor.read_metadata()?;
            let code_raw = cursor.read_u16()?;
            let code =
                StatusCode::from_u16(code_raw).ok_or(DecodeError::UnknownStatusCode(code_raw))?;
            let message = cursor.read_string()?;
            let has_details = cursor.read_u8()? != 0;
            let details = if has_details {
                Some(cursor.read_bytes()?)
            } else {
                None
            };
            Envelope::Status {
                stream_id,
                metadata,
                status: Status {
                    code,
                    message,
                    details,
                },
            }
        }
        Kind::Cancel => Envelope::Cancel { stream_id },
    })
}

fn write_str(buf: &mut Vec<u8>, s: &str) {
    write_bytes(buf, s.as_bytes());
}

fn write_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    buf.extend_from_slice(bytes);
}

fn write_metadata(buf: &mut Vec<u8>, metadata: &Metadata) {
    buf.extend_from_slice(&(metadata.len() as u32).to_be_bytes());
    for (key, value) in metadata {
        write_str(buf, key);
        write_str(buf, value);
    }
}

/// Minimal cursor over a decode buffer; every read is bounds-checked.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::Truncated);
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes(bytes.try_into().unwrap()))
    }

    fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes(bytes.try_into().unwrap()))
    }

    fn read_u64(&mut self) -> Result<u64, DecodeError> {
        let bytes = self.take(8)?;
        Ok(u64::from_be_bytes(bytes.try_into().unwrap()))
    }

    fn read_bytes(&mut self) -> Result<Vec<u8>, DecodeError> {
        let len = self.read_u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    fn read_string(&mut self) -> Result<String, DecodeError> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)
    }

    fn read_metadata(&mut self) -> Result<Metadata, DecodeError> {
        let count = self.read_u32()? as usize;
        let mut metadata = Vec::with_capacity(count);
        for _ in 0..count {
            let key = self.read_string()?;
            let value = self.read_string()?;
            metadata.push((key, value));
        }
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_mismatch_detected() {
        let envelope = Envelope::HalfClose { stream_id: 1 };
        let mut bytes = encode(&envelope);
        bytes.extend_from_slice(&[0, 0, 0]);
        assert_eq!(decode(&bytes), Err(DecodeError::LengthMismatch));
    }

    #[test]
    fn empty_metadata_round_trips() {
        let envelope = Envelope::Begin {
            stream_id: 4,
            method: MethodKey::new("Svc", "Method"),
            metadata: vec![],
        };
        let bytes = encode(&envelope);
        assert_eq!(decode(&bytes).unwrap(), envelope);
    }
}
