//! Default [`Crypto`] implementation backed by `sha2` and `aes`.
//!
//! The engine treats cryptography as an injected pure-function boundary
//! (see [`crate::hal::Crypto`]), but ships this implementation so hosts
//! without their own hardware-accelerated AES/SHA engine can use the
//! engine out of the box.

use aes::Aes128;
use cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use sha2::{Digest, Sha256};

use crate::hal::Crypto;

/// Software SHA-256 + AES-128 implementation of [`Crypto`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultCrypto;

impl Crypto for DefaultCrypto {
    fn sha256(&self, parts: &[&[u8]]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part);
        }
        hasher.finalize().into()
    }

    fn aes128_encrypt_block(&self, key: &[u8; 16], block: &mut [u8; 16]) {
        let cipher = Aes128::new(key.into());
        cipher.encrypt_block(block.into());
    }

    fn aes128_decrypt_block(&self, key: &[u8; 16], block: &mut [u8; 16]) {
        let cipher = Aes128::new(key.into());
        cipher.decrypt_block(block.into());
    }
}

/// AES-128-CBC encrypt `data` in place, zero IV, PKCS-style padding
/// already applied by the caller (`data.len()` MUST be a multiple of 16).
///
/// The wire format carries no explicit IV field, so a fixed zero IV is
/// used — each message derives a fresh `session_key` from the auth
/// handshake, so IV reuse across messages does not reuse a key.
pub fn cbc_encrypt(crypto: &impl Crypto, key: &[u8; 16], data: &mut [u8]) {
    debug_assert_eq!(data.len() % 16, 0);
    let mut prev = [0u8; 16];
    for block in data.chunks_exact_mut(16) {
        for (b, p) in block.iter_mut().zip(prev.iter()) {
            *b ^= p;
        }
        let mut buf = [0u8; 16];
        buf.copy_from_slice(block);
        crypto.aes128_encrypt_block(key, &mut buf);
        block.copy_from_slice(&buf);
        prev.copy_from_slice(block);
    }
}

/// AES-128-CBC decrypt `data` in place, zero IV.
pub fn cbc_decrypt(crypto: &impl Crypto, key: &[u8; 16], data: &mut [u8]) {
    debug_assert_eq!(data.len() % 16, 0);
    let mut prev = [0u8; 16];
    for block in data.chunks_exact_mut(16) {
        let cipher_block: [u8; 16] = block.try_into().unwrap();
        let mut buf = cipher_block;
        crypto.aes128_decrypt_block(key, &mut buf);
        for (b, p) in buf.iter_mut().zip(prev.iter()) {
            *b ^= p;
        }
        block.copy_from_slice(&buf);
        prev = cipher_block;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_matches_known_vector() {
        let crypto = DefaultCrypto;
        let digest = crypto.sha256(&[b""]);
        assert_eq!(
            digest,
            [
                0xe3, 0xb0, 0xc4, 0x42, 0x98, 0xfc, 0x1c, 0x14, 0x9a, 0xfb, 0xf4, 0xc8, 0x99, 0x6f,
                0xb9, 0x24, 0x27, 0xae, 0x41, 0xe4, 0x64, 0x9b, 0x93, 0x4c, 0xa4, 0x95, 0x99, 0x1b,
                0x78, 0x52, 0xb8, 0x55,
            ]
        );
    }

    #[test]
    fn sha256_concatenates_parts() {
        let crypto = DefaultCrypto;
        let a = crypto.sha256(&[b"hello", b" ", b"world"]);
        let b = crypto.sha256(&[b"hello world"]);
        assert_eq!(a, b);
    }

    #[test]
    fn aes_block_round_trips() {
        let crypto = DefaultCrypto;
        let key = [0x42u8; 16];
        let original = [7u8; 16];
        let mut block = original;
        crypto.aes128_encrypt_block(&key, &mut block);
        assert_ne!(block, original);
        crypto.aes128_decrypt_block(&key, &mut block);
        assert_eq!(block, original);
    }

    #[test]
    fn cbc_round_trips_multi_block() {
        let crypto = DefaultCrypto;
        let key = [0xAAu8; 16];
        let plaintext = [0x11u8; 48];
        let mut buf = plaintext;
        cbc_encrypt(&crypto, &key, &mut buf);
        assert_ne!(buf, plaintext);
        cbc_decrypt(&crypto, &key, &mut buf);
        assert_eq!(buf, plaintext);
    }
}
