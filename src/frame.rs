//! On-wire frame header codec.
//!
//! ```text
//! byte 0        byte 1   byte 2                 byte 3
//! ┌───────────┐ ┌──────┐ ┌──────────┬──────────┐ ┌──────────┐
//! │ cmd       │ │ seq  │ │ total-1:4│ remain:4 │ │ reserved │
//! └───────────┘ └──────┘ └──────────┴──────────┘ └──────────┘
//! ```
//!
//! `remain` is `frames_remaining_including_self` — a countdown, not an
//! ascending index (§9 REDESIGN FLAG: preserve this wire semantics
//! exactly). Frame 0 of an N-frame message carries `remain = N − 1`; the
//! last frame carries `remain = 0`. The wire nibble holding the frame
//! count stores `total_frames − 1` so that a 16-frame message (the
//! maximum representable in 4 bits) still fits; [`encode`]/[`decode`]
//! work in terms of the logical `total_frames` (1..=16), not the wire
//! value.

use crate::error::{Error, Result};

/// Size of the frame header, in bytes.
pub const HEADER_LEN: usize = 4;

/// Maximum whole-message payload size (`BZ_MAX_PAYLOAD_SIZE`).
pub const MAX_PAYLOAD_SIZE: usize = 1024;

/// Maximum number of frames representable in a 4-bit nibble.
pub const MAX_FRAMES: u8 = 16;

/// Decoded frame header plus a borrowed view of its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub cmd: u8,
    pub seq: u8,
    /// Logical count of frames in the message, 1..=16.
    pub total_frames: u8,
    /// Frames remaining including this one (countdown to 0).
    pub frames_remaining_including_self: u8,
    pub payload: &'a [u8],
}

impl<'a> Frame<'a> {
    /// `true` for the first frame of a message.
    #[must_use]
    pub fn is_first(&self) -> bool {
        self.frames_remaining_including_self == self.total_frames - 1
    }

    /// `true` for the last frame of a message.
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.frames_remaining_including_self == 0
    }
}

/// Encode one frame into `out`, returning the number of bytes written.
///
/// `out` must be at least `HEADER_LEN + payload.len()` bytes.
/// `total_frames` is the logical frame count, 1..=16.
pub fn encode(
    cmd: u8,
    seq: u8,
    frames_remaining_including_self: u8,
    total_frames: u8,
    payload: &[u8],
    out: &mut [u8],
) -> Result<usize> {
    if out.len() < HEADER_LEN + payload.len() {
        return Err(Error::DataSize);
    }
    if total_frames == 0 || total_frames > MAX_FRAMES || frames_remaining_including_self >= total_frames {
        return Err(Error::DataSize);
    }
    out[0] = cmd;
    out[1] = seq;
    out[2] = ((total_frames - 1) << 4) | (frames_remaining_including_self & 0x0F);
    out[3] = 0;
    out[HEADER_LEN..HEADER_LEN + payload.len()].copy_from_slice(payload);
    Ok(HEADER_LEN + payload.len())
}

/// Decode errors specific to the frame codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer than `HEADER_LEN` bytes were supplied.
    TooShort,
    /// `frame_idx >= total` — a structurally invalid frame.
    BadFrameIndex,
}

/// Decode one frame from `bytes`.
pub fn decode(bytes: &[u8]) -> core::result::Result<Frame<'_>, DecodeError> {
    if bytes.len() < HEADER_LEN {
        return Err(DecodeError::TooShort);
    }
    let cmd = bytes[0];
    let seq = bytes[1];
    let total_frames = ((bytes[2] >> 4) & 0x0F) + 1;
    let frames_remaining_including_self = bytes[2] & 0x0F;
    if frames_remaining_including_self >= total_frames {
        return Err(DecodeError::BadFrameIndex);
    }
    Ok(Frame {
        cmd,
        seq,
        total_frames,
        frames_remaining_including_self,
        payload: &bytes[HEADER_LEN..],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_single_frame() {
        let mut buf = [0u8; 32];
        let payload = b"hello";
        let n = encode(0x10, 7, 0, 1, payload, &mut buf).unwrap();
        let frame = decode(&buf[..n]).unwrap();
        assert_eq!(frame.cmd, 0x10);
        assert_eq!(frame.seq, 7);
        assert_eq!(frame.total_frames, 1);
        assert_eq!(frame.frames_remaining_including_self, 0);
        assert_eq!(frame.payload, payload);
        assert!(frame.is_first());
        assert!(frame.is_last());
    }

    #[test]
    fn round_trip_all_indices() {
        for total in 1..=MAX_FRAMES {
            for remain in 0..total {
                let mut buf = [0u8; HEADER_LEN + 4];
                let payload = [0xAB; 4];
                let n = encode(0x20, 1, remain, total, &payload, &mut buf).unwrap();
                let frame = decode(&buf[..n]).unwrap();
                assert_eq!(frame.cmd, 0x20);
                assert_eq!(frame.total_frames, total);
                assert_eq!(frame.frames_remaining_including_self, remain);
                assert_eq!(frame.payload, &payload);
            }
        }
    }

    #[test]
    fn decode_too_short() {
        assert_eq!(decode(&[1, 2, 3]), Err(DecodeError::TooShort));
    }

    #[test]
    fn decode_bad_frame_index() {
        // total_frames = 2, remain = 2 (>= total) is invalid.
        let header = [0x00, 0x00, (1 << 4) | 2, 0x00];
        assert_eq!(decode(&header), Err(DecodeError::BadFrameIndex));
    }

    #[test]
    fn encode_rejects_undersized_buffer() {
        let mut buf = [0u8; 4];
        assert_eq!(encode(0, 0, 0, 1, &[1, 2], &mut buf), Err(Error::DataSize));
    }

    #[test]
    fn encode_rejects_total_frames_out_of_range() {
        let mut buf = [0u8; 8];
        assert_eq!(encode(0, 0, 0, 0, &[], &mut buf), Err(Error::DataSize));
        assert_eq!(encode(0, 0, 0, 17, &[], &mut buf), Err(Error::DataSize));
    }

    #[test]
    fn first_and_last_single_frame_are_both_true() {
        let frame = Frame {
            cmd: 0,
            seq: 0,
            total_frames: 1,
            frames_remaining_including_self: 0,
            payload: &[],
        };
        assert!(frame.is_first());
        assert!(frame.is_last());
    }

    #[test]
    fn sixteen_frame_message_boundary() {
        let mut buf = [0u8; HEADER_LEN];
        let n = encode(0, 0, MAX_FRAMES - 1, MAX_FRAMES, &[], &mut buf).unwrap();
        let first = decode(&buf[..n]).unwrap();
        assert_eq!(first.total_frames, MAX_FRAMES);
        assert!(first.is_first());

        let n = encode(0, 0, 0, MAX_FRAMES, &[], &mut buf).unwrap();
        let last = decode(&buf[..n]).unwrap();
        assert!(last.is_last());
    }
}
