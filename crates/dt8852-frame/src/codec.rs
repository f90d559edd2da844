use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Frame header: start (1) + kind (1) + length (1) = 3 bytes.
pub const HEADER_SIZE: usize = 3;

/// Frame trailer: checksum (1).
pub const TRAILER_SIZE: usize = 1;

/// Start-of-frame marker.
pub const START: u8 = 0xA5;

/// Default maximum payload size: the longest device payload, a timestamped
/// recording record.
///
/// Every kind the device sends is at least `0x10`, so a stray start marker in
/// front of a real frame reads as an oversized length and is dropped at once
/// instead of stalling the reader on bytes that never arrive.
pub const DEFAULT_MAX_PAYLOAD: usize = 12;

/// Default number of bytes the reader may discard between two good frames.
pub const DEFAULT_MAX_RESYNC_BYTES: usize = 1024;

/// Default number of rejected headers/checksums between two good frames.
pub const DEFAULT_MAX_RESYNC_ATTEMPTS: usize = 32;

/// Largest payload the one-byte length field can describe.
const WIRE_MAX_PAYLOAD: usize = u8::MAX as usize;

/// One protocol frame: a kind marker and its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame kind (see [`crate::kind`]).
    pub kind: u8,
    /// The frame payload, checksum already verified.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(kind: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    /// Create a frame with no payload.
    pub fn empty(kind: u8) -> Self {
        Self::new(kind, Bytes::new())
    }

    /// The total wire size of this frame (header + payload + checksum).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len() + TRAILER_SIZE
    }

    /// Serialize this frame into a fresh buffer.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.wire_size());
        encode_frame(self.kind, self.payload.as_ref(), &mut buf)?;
        Ok(buf.freeze())
    }
}

/// Additive checksum over kind, length and payload.
pub fn checksum(covered: &[u8]) -> u8 {
    covered.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────┬────────┬────────┬──────────────────┬──────────┐
/// │ Start  │ Kind   │ Length │ Payload          │ Checksum │
/// │ 0xA5   │ (1B)   │ (1B)   │ (Length bytes)   │ (1B)     │
/// └────────┴────────┴────────┴──────────────────┴──────────┘
/// ```
///
/// The checksum is the wrapping sum of kind, length and payload bytes.
pub fn encode_frame(kind: u8, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > WIRE_MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: WIRE_MAX_PAYLOAD,
        });
    }
    let len = payload.len() as u8;
    let sum = checksum(payload).wrapping_add(kind).wrapping_add(len);

    dst.reserve(HEADER_SIZE + payload.len() + TRAILER_SIZE);
    dst.put_u8(START);
    dst.put_u8(kind);
    dst.put_u8(len);
    dst.put_slice(payload);
    dst.put_u8(sum);
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer. Errors never consume
/// anything; deciding how much to discard is the reader's job.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>> {
    let Some(&head) = src.first() else {
        return Ok(None);
    };
    if head != START {
        return Err(FrameError::InvalidStart(head));
    }
    if src.len() < HEADER_SIZE {
        return Ok(None); // Need more data
    }

    let kind = src[1];
    let payload_len = src[2] as usize;
    if payload_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    let body_end = HEADER_SIZE + payload_len;
    let total = body_end + TRAILER_SIZE;
    if src.len() < total {
        return Ok(None); // Need more data
    }

    let expected = checksum(&src[1..body_end]);
    let actual = src[body_end];
    if expected != actual {
        return Err(FrameError::ChecksumMismatch { expected, actual });
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();
    src.advance(TRAILER_SIZE);

    Ok(Some(Frame { kind, payload }))
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 12, hard limit 255.
    pub max_payload_size: usize,
    /// Bytes the reader may discard between good frames before giving up.
    pub max_resync_bytes: usize,
    /// Rejected frame candidates tolerated between good frames.
    pub max_resync_attempts: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            max_resync_bytes: DEFAULT_MAX_RESYNC_BYTES,
            max_resync_attempts: DEFAULT_MAX_RESYNC_ATTEMPTS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::{END_OF_RECORDINGS, MEASUREMENT, MODE_ACK};

    #[test]
    fn test_encode_decode_roundtrip() {
        let mut buf = BytesMut::new();
        let payload = [0x01, 0x02, 0x8E];

        encode_frame(MEASUREMENT, &payload, &mut buf).unwrap();

        assert_eq!(buf.len(), HEADER_SIZE + payload.len() + TRAILER_SIZE);

        let frame = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .unwrap();

        assert_eq!(frame.kind, MEASUREMENT);
        assert_eq!(frame.payload.as_ref(), &payload[..]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_wire_layout() {
        let mut buf = BytesMut::new();
        encode_frame(MODE_ACK, &[0x41, 0x01], &mut buf).unwrap();
        assert_eq!(buf.as_ref(), &[0xA5, 0x10, 0x02, 0x41, 0x01, 0x54]);
    }

    #[test]
    fn test_checksum_wraps() {
        assert_eq!(checksum(&[0xFF, 0x02]), 0x01);
        assert_eq!(checksum(&[]), 0x00);
    }

    #[test]
    fn test_decode_empty_buffer() {
        let mut buf = BytesMut::new();
        assert!(decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().is_none());
    }

    #[test]
    fn test_decode_incomplete_header() {
        let mut buf = BytesMut::from(&[START, MEASUREMENT][..]);
        let result = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap();
        assert!(result.is_none());
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn test_decode_incomplete_payload() {
        let mut buf = BytesMut::new();
        encode_frame(MEASUREMENT, &[1, 2, 3], &mut buf).unwrap();
        buf.truncate(HEADER_SIZE + 2);

        let result = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_decode_missing_checksum_byte() {
        let mut buf = BytesMut::new();
        encode_frame(MEASUREMENT, &[1, 2, 3], &mut buf).unwrap();
        buf.truncate(buf.len() - 1);

        assert!(decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().is_none());
    }

    #[test]
    fn test_decode_invalid_start() {
        let mut buf = BytesMut::from(&[0x00, START, 0x3F, 0x00, 0x3F][..]);
        let result = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD);
        assert!(matches!(result, Err(FrameError::InvalidStart(0x00))));
        assert_eq!(buf.len(), 5, "errors must not consume input");
    }

    #[test]
    fn test_decode_checksum_mismatch() {
        let mut buf = BytesMut::new();
        encode_frame(MEASUREMENT, &[1, 2, 3], &mut buf).unwrap();
        let last = buf.len() - 1;
        buf[last] ^= 0xFF;

        let result = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD);
        assert!(matches!(result, Err(FrameError::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_decode_payload_too_large() {
        let mut buf = BytesMut::new();
        buf.put_u8(START);
        buf.put_u8(MEASUREMENT);
        buf.put_u8(200);

        let result = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD);
        assert!(matches!(
            result,
            Err(FrameError::PayloadTooLarge { size: 200, max: 12 })
        ));
    }

    #[test]
    fn test_stray_start_reads_as_oversized_length() {
        let mut buf = BytesMut::from(&[START, START, END_OF_RECORDINGS, 0x00, 0x3F][..]);
        let result = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD);
        assert!(matches!(
            result,
            Err(FrameError::PayloadTooLarge { size: 0x3F, .. })
        ));
    }

    #[test]
    fn test_encode_rejects_oversized_payload() {
        let mut buf = BytesMut::new();
        let err = encode_frame(MEASUREMENT, &[0u8; 256], &mut buf).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { max: 255, .. }));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_multiple_frames() {
        let mut buf = BytesMut::new();
        encode_frame(MEASUREMENT, &[1, 0, 10], &mut buf).unwrap();
        encode_frame(END_OF_RECORDINGS, &[], &mut buf).unwrap();

        let f1 = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .unwrap();
        assert_eq!(f1.kind, MEASUREMENT);
        assert_eq!(f1.payload.as_ref(), &[1, 0, 10]);

        let f2 = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .unwrap();
        assert_eq!(f2.kind, END_OF_RECORDINGS);
        assert!(f2.payload.is_empty());

        assert!(buf.is_empty());
    }

    #[test]
    fn test_frame_wire_size() {
        let frame = Frame::new(MEASUREMENT, Bytes::from_static(&[1, 2, 3]));
        assert_eq!(frame.wire_size(), HEADER_SIZE + 3 + TRAILER_SIZE);
        assert_eq!(frame.to_bytes().unwrap().len(), frame.wire_size());
    }
}
