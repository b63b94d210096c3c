//! Fuzz target: `frame::decode`
//!
//! Drives arbitrary byte sequences into the wire frame header decoder
//! and asserts it never panics and that any frame it accepts satisfies
//! its own structural invariants.
//!
//! cargo fuzz run fuzz_frame_decoder

#![no_main]

use breeze_core::frame;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(decoded) = frame::decode(data) {
        assert_eq!(decoded.payload.len(), data.len() - frame::HEADER_LEN);
        assert!(decoded.total_frames >= 1 && decoded.total_frames <= frame::MAX_FRAMES);
        assert!(decoded.frames_remaining_including_self < decoded.total_frames);
        assert_eq!(decoded.is_last(), decoded.frames_remaining_including_self == 0);
        assert_eq!(
            decoded.is_first(),
            decoded.frames_remaining_including_self == decoded.total_frames - 1
        );

        // Re-encoding what was decoded must round-trip byte-for-byte.
        let mut out = vec![0u8; frame::HEADER_LEN + decoded.payload.len()];
        let n = frame::encode(
            decoded.cmd,
            decoded.seq,
            decoded.frames_remaining_including_self,
            decoded.total_frames,
            decoded.payload,
            &mut out,
        )
        .expect("re-encoding a just-decoded frame must not fail");
        assert_eq!(&out[..n], data);
    }
});
