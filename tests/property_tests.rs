//! Property-based tests for the wire codec, auth handshake, and signed
//! advertisement builder.
//!
//! Runs on host only — proptest is not available for ESP32 targets.

#![cfg(not(target_os = "espidf"))]

use breeze_core::adv::{self, AdvParams};
use breeze_core::auth::{Auth, State};
use breeze_core::crypto::DefaultCrypto;
use breeze_core::frame;
use breeze_core::hal::{Crypto, OsHal};
use proptest::prelude::*;

struct FixedOs(u64);
impl OsHal for FixedOs {
    fn now_ms(&self) -> u64 {
        self.0
    }
    fn random_bytes(&mut self, buf: &mut [u8]) {
        buf.fill(0x5A);
    }
}

proptest! {
    /// Any structurally valid frame round-trips through decode -> encode
    /// byte-for-byte, regardless of command, sequence, or payload content.
    #[test]
    fn frame_round_trips_for_any_valid_header(
        cmd in any::<u8>(),
        seq in any::<u8>(),
        total_frames in 1u8..=frame::MAX_FRAMES,
        payload in proptest::collection::vec(any::<u8>(), 0..=64),
    ) {
        let remain = total_frames - 1;
        let mut buf = vec![0u8; frame::HEADER_LEN + payload.len()];
        let n = frame::encode(cmd, seq, remain, total_frames, &payload, &mut buf).unwrap();
        prop_assert_eq!(n, buf.len());

        let decoded = frame::decode(&buf).unwrap();
        prop_assert_eq!(decoded.cmd, cmd);
        prop_assert_eq!(decoded.seq, seq);
        prop_assert_eq!(decoded.total_frames, total_frames);
        prop_assert_eq!(decoded.frames_remaining_including_self, remain);
        prop_assert_eq!(decoded.payload, &payload[..]);
        prop_assert!(decoded.is_first() == (remain == total_frames - 1));
        prop_assert!(decoded.is_last() == (remain == 0));
    }

    /// `encode` rejects any `frames_remaining_including_self` that isn't
    /// strictly less than `total_frames`, for every total_frames in range.
    #[test]
    fn encode_rejects_out_of_range_remain(
        total_frames in 1u8..=frame::MAX_FRAMES,
        remain in 0u8..=255u8,
    ) {
        let mut buf = [0u8; frame::HEADER_LEN];
        let result = frame::encode(0x10, 0, remain, total_frames, &[], &mut buf);
        if remain >= total_frames {
            prop_assert!(result.is_err());
        } else {
            prop_assert!(result.is_ok());
        }
    }

    /// The nonce challenge/response only ever succeeds when the peer's
    /// response byte actually matches `sha256(device_nonce || secret)`;
    /// any other 32-byte confirmation payload is rejected.
    #[test]
    fn auth_accepts_only_the_matching_response(
        secret in proptest::collection::vec(1u8..=255u8, 1..=32),
        peer_nonce in proptest::array::uniform16(any::<u8>()),
        tamper in any::<bool>(),
        tamper_byte in any::<u8>(),
    ) {
        let crypto = DefaultCrypto;
        let mut os = FixedOs(0);
        let mut auth = Auth::new(5_000);
        let device_nonce = auth.start(&mut os);

        let mut resp = crypto.sha256(&[&device_nonce, &secret])[..16].to_vec();
        if tamper {
            resp[0] ^= tamper_byte | 1;
        }

        let mut payload = [0u8; 32];
        payload[..16].copy_from_slice(&peer_nonce);
        payload[16..].copy_from_slice(&resp);

        let result = auth.on_peer_cfm(&crypto, &os, &secret, &payload);
        if tamper {
            prop_assert!(result.is_none());
            prop_assert_eq!(auth.state(), State::Failed);
        } else {
            prop_assert!(result.is_some());
            prop_assert_eq!(auth.state(), State::AwaitCfm);
        }
    }

    /// An `AUTH_CFM` payload shorter than 32 bytes is always rejected,
    /// whatever its content.
    #[test]
    fn auth_rejects_any_undersized_confirmation(
        payload in proptest::collection::vec(any::<u8>(), 0..32),
    ) {
        let crypto = DefaultCrypto;
        let mut os = FixedOs(0);
        let mut auth = Auth::new(5_000);
        let _ = auth.start(&mut os);
        let result = auth.on_peer_cfm(&crypto, &os, b"secret", &payload);
        prop_assert!(result.is_none());
        prop_assert_eq!(auth.state(), State::Failed);
    }

    /// The advertisement builder always produces a payload whose feature
    /// mask bits exactly mirror the params that went in, for any
    /// combination of flags and any model id/MAC.
    #[test]
    fn adv_feature_mask_reflects_params(
        ota_enabled in any::<bool>(),
        auth_enabled in any::<bool>(),
        use_product_secret in any::<bool>(),
        signed_adv in any::<bool>(),
        model_id in any::<u32>(),
        mac in proptest::array::uniform6(any::<u8>()),
    ) {
        let crypto = DefaultCrypto;
        let params = AdvParams {
            company_id: adv::COMPANY_ID,
            protocol_id: adv::PROTOCOL_ID,
            bluetooth_version: 0b01,
            ota_enabled,
            auth_enabled,
            use_product_secret,
            signed_adv,
            model_id,
            mac,
        };
        let payload = adv::build(&crypto, &params, b"secret", 7, &[]).unwrap();

        let mask = payload[3];
        prop_assert_eq!((mask >> 2) & 1 == 1, ota_enabled);
        prop_assert_eq!((mask >> 3) & 1 == 1, auth_enabled);
        prop_assert_eq!((mask >> 4) & 1 == 1, use_product_secret);
        prop_assert_eq!((mask >> 5) & 1 == 1, signed_adv);
        prop_assert_eq!(&payload[4..8], &model_id.to_le_bytes());
        prop_assert_eq!(&payload[8..14], &mac[..]);
    }
}
