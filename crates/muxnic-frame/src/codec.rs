//! The data-channel wire record format.
//!
//! Frames travel back to back as `[length][payload]` records. The length
//! field is 2 bytes, big-endian, and counts payload bytes only. There are
//! no sync markers, checksums or padding; the stream stays parseable only
//! while every byte is accounted for.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Bytes in the length prefix preceding every frame.
pub const LEN_PREFIX_SIZE: usize = 2;

/// Largest payload the 2-byte length prefix can describe.
pub const MAX_WIRE_FRAME: usize = u16::MAX as usize;

/// Largest Ethernet frame the receive path is sized for: 14-byte header,
/// 1500-byte payload and 4-byte frame check sequence.
pub const ETHERNET_FRAME_MAX_SIZE: usize = 1518;

/// Append one wire record for `payload` to `dst`.
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_WIRE_FRAME {
        return Err(FrameError::FrameTooLarge {
            size: payload.len(),
            max: MAX_WIRE_FRAME,
        });
    }
    dst.reserve(LEN_PREFIX_SIZE + payload.len());
    dst.put_u16(payload.len() as u16);
    dst.put_slice(payload);
    Ok(())
}

/// Split one complete wire record off the front of `src`.
///
/// Returns `None` when `src` does not yet hold a full record; no bytes are
/// consumed in that case.
pub fn decode_frame(src: &mut BytesMut) -> Option<Bytes> {
    if src.len() < LEN_PREFIX_SIZE {
        return None;
    }
    let len = u16::from_be_bytes([src[0], src[1]]) as usize;
    if src.len() < LEN_PREFIX_SIZE + len {
        return None;
    }
    src.advance(LEN_PREFIX_SIZE);
    Some(src.split_to(len).freeze())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_prefixes_big_endian_length() {
        let mut dst = BytesMut::new();
        encode_frame(b"ABCD", &mut dst).expect("encode should succeed");
        assert_eq!(&dst[..], &[0x00, 0x04, b'A', b'B', b'C', b'D']);
    }

    #[test]
    fn encode_empty_payload() {
        let mut dst = BytesMut::new();
        encode_frame(b"", &mut dst).expect("encode should succeed");
        assert_eq!(&dst[..], &[0x00, 0x00]);
    }

    #[test]
    fn encode_rejects_oversized_payload() {
        let payload = vec![0u8; MAX_WIRE_FRAME + 1];
        let mut dst = BytesMut::new();
        let err = encode_frame(&payload, &mut dst).expect_err("encode should fail");
        assert!(matches!(
            err,
            FrameError::FrameTooLarge {
                size,
                max: MAX_WIRE_FRAME,
            } if size == MAX_WIRE_FRAME + 1
        ));
        assert!(dst.is_empty());
    }

    #[test]
    fn encode_accepts_max_payload() {
        let payload = vec![0xAA; MAX_WIRE_FRAME];
        let mut dst = BytesMut::new();
        encode_frame(&payload, &mut dst).expect("encode should succeed");
        assert_eq!(dst.len(), LEN_PREFIX_SIZE + MAX_WIRE_FRAME);
        assert_eq!(&dst[..2], &[0xFF, 0xFF]);
    }

    #[test]
    fn decode_waits_for_complete_record() {
        let mut src = BytesMut::new();
        assert!(decode_frame(&mut src).is_none());

        src.put_slice(&[0x00]);
        assert!(decode_frame(&mut src).is_none());

        src.put_slice(&[0x04, b'A', b'B', b'C']);
        assert!(decode_frame(&mut src).is_none());
        assert_eq!(src.len(), 5);

        src.put_slice(&[b'D']);
        let frame = decode_frame(&mut src).expect("record should be complete");
        assert_eq!(&frame[..], b"ABCD");
        assert!(src.is_empty());
    }

    #[test]
    fn decode_splits_back_to_back_records() {
        let mut src = BytesMut::new();
        encode_frame(b"one", &mut src).expect("encode should succeed");
        encode_frame(b"two", &mut src).expect("encode should succeed");

        let first = decode_frame(&mut src).expect("first record should decode");
        let second = decode_frame(&mut src).expect("second record should decode");
        assert_eq!(&first[..], b"one");
        assert_eq!(&second[..], b"two");
        assert!(decode_frame(&mut src).is_none());
    }
}
