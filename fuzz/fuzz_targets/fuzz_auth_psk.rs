//! Fuzz target: `Auth::on_peer_cfm` (nonce challenge/response path)
//!
//! Drives arbitrary `AUTH_CFM` payloads into a fresh handshake and checks
//! that the verification surface never panics and only reports success
//! when the response byte actually matches the expected SHA-256 digest.
//!
//! cargo fuzz run fuzz_auth_psk

#![no_main]

use breeze_core::auth::{Auth, State};
use breeze_core::crypto::DefaultCrypto;
use breeze_core::hal::OsHal;
use libfuzzer_sys::fuzz_target;

struct FixedOs;
impl OsHal for FixedOs {
    fn now_ms(&self) -> u64 {
        0
    }
    fn random_bytes(&mut self, buf: &mut [u8]) {
        buf.fill(0x5A);
    }
}

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }
    let (secret, cfm_payload) = data.split_at(data.len() / 2);
    if secret.is_empty() {
        return;
    }

    let crypto = DefaultCrypto;
    let mut os = FixedOs;
    let mut auth = Auth::new(5_000);
    let device_nonce = auth.start(&mut os);

    let result = auth.on_peer_cfm(&crypto, &os, secret, cfm_payload);

    if cfm_payload.len() < 32 {
        assert!(result.is_none(), "undersized AUTH_CFM payload must always be rejected");
        assert_eq!(auth.state(), State::Failed);
        return;
    }

    let peer_resp = &cfm_payload[16..32];
    let expected = crypto.sha256(&[&device_nonce, secret]);
    let should_accept = expected[..16] == *peer_resp;

    match result {
        Some(_) => {
            assert!(should_accept, "accepted a response that does not match the expected digest");
            assert_eq!(auth.state(), State::AwaitCfm);
        }
        None => {
            assert!(!should_accept, "rejected a response that matches the expected digest");
            assert_eq!(auth.state(), State::Failed);
        }
    }

    // A subsequent call must not panic regardless of prior outcome.
    let _ = auth.tick(1);
});
