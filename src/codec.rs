//! Wire primitives: opcode bytes and `str8` (single-byte-length-prefixed
//! UTF-8 strings). No version byte, no checksum trailer — just opcode plus
//! fields, as the wire table spells out.
//!
//! Mirrors the decode-with-bytes-consumed style of a length-prefixed frame
//! decoder: every `read_*` returns `(value, bytes_consumed)` so callers can
//! walk a buffer field by field without re-slicing by hand.

use thiserror::Error;

/// A frame larger than this is rejected outright rather than allocated.
pub const MAX_FRAME_SIZE: usize = 1_048_576;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("frame truncated: expected at least {expected} more byte(s), got {available}")]
    Truncated { expected: usize, available: usize },

    #[error("frame exceeds maximum size of {MAX_FRAME_SIZE} bytes")]
    Overlong,

    #[error("str8 payload is not valid utf-8")]
    InvalidUtf8,
}

/// Reads a single opcode byte. Returns the opcode and bytes consumed (1).
pub fn read_u8(buf: &[u8]) -> Result<(u8, usize), CodecError> {
    if buf.is_empty() {
        return Err(CodecError::Truncated {
            expected: 1,
            available: 0,
        });
    }
    Ok((buf[0], 1))
}

/// Reads a `str8`: one length byte followed by that many UTF-8 bytes.
/// Returns the decoded string and total bytes consumed (1 + length).
pub fn read_str8(buf: &[u8]) -> Result<(String, usize), CodecError> {
    if buf.is_empty() {
        return Err(CodecError::Truncated {
            expected: 1,
            available: 0,
        });
    }
    let len = buf[0] as usize;
    let total = 1 + len;
    if buf.len() < total {
        return Err(CodecError::Truncated {
            expected: total - buf.len(),
            available: buf.len(),
        });
    }
    let s = std::str::from_utf8(&buf[1..total]).map_err(|_| CodecError::InvalidUtf8)?;
    Ok((s.to_string(), total))
}

/// Writes a `str8`: truncation of the caller-supplied string is never
/// performed here — the caller is responsible for ensuring `s.len() <= 255`
/// (usernames and message bodies are validated at admission/dispatch time).
pub fn write_str8(out: &mut Vec<u8>, s: &str) {
    debug_assert!(s.len() <= u8::MAX as usize);
    out.push(s.len() as u8);
    out.extend_from_slice(s.as_bytes());
}

pub fn write_u8(out: &mut Vec<u8>, v: u8) {
    out.push(v);
}

/// Validates a whole inbound frame's size before any field-level decoding.
pub fn check_frame_size(buf: &[u8]) -> Result<(), CodecError> {
    if buf.len() > MAX_FRAME_SIZE {
        return Err(CodecError::Overlong);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_str8() {
        let mut buf = Vec::new();
        write_str8(&mut buf, "alice");
        let (s, consumed) = read_str8(&buf).unwrap();
        assert_eq!(s, "alice");
        assert_eq!(consumed, buf.len());
    }

    #[test]
    fn empty_str8_round_trips() {
        let mut buf = Vec::new();
        write_str8(&mut buf, "");
        let (s, consumed) = read_str8(&buf).unwrap();
        assert_eq!(s, "");
        assert_eq!(consumed, 1);
    }

    #[test]
    fn truncated_length_byte() {
        let buf: [u8; 0] = [];
        assert_eq!(
            read_str8(&buf),
            Err(CodecError::Truncated {
                expected: 1,
                available: 0
            })
        );
    }

    #[test]
    fn truncated_payload() {
        // Declares 5 bytes of payload but only supplies 2.
        let buf = [5u8, b'h', b'i'];
        assert_eq!(
            read_str8(&buf),
            Err(CodecError::Truncated {
                expected: 3,
                available: 3
            })
        );
    }

    #[test]
    fn invalid_utf8_payload() {
        let buf = [2u8, 0xff, 0xfe];
        assert_eq!(read_str8(&buf), Err(CodecError::InvalidUtf8));
    }

    #[test]
    fn opcode_byte_roundtrip() {
        let mut buf = Vec::new();
        write_u8(&mut buf, 4);
        let (op, consumed) = read_u8(&buf).unwrap();
        assert_eq!(op, 4);
        assert_eq!(consumed, 1);
    }

    #[test]
    fn rejects_overlong_frame() {
        let buf = vec![0u8; MAX_FRAME_SIZE + 1];
        assert_eq!(check_frame_size(&buf), Err(CodecError::Overlong));
    }

    #[test]
    fn accepts_frame_at_exact_limit() {
        let buf = vec![0u8; MAX_FRAME_SIZE];
        assert!(check_frame_size(&buf).is_ok());
    }
}
