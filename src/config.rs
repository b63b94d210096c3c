//! Engine initialisation configuration.
//!
//! Carries every downward init field named by the external-interfaces
//! section: secrets, advertised identity, and the transport/auth tunables.
//! Persisted copies (if the host chooses to persist any of it) round-trip
//! through `postcard`, matching the host firmware's NVS config convention.

use heapless::Vec;
use serde::{Deserialize, Serialize};

/// Maximum length of any of the secret/key byte strings.
pub const MAX_SECRET_LEN: usize = 32;
/// Maximum length of the ASCII build-version string.
pub const MAX_VERSION_LEN: usize = 16;
/// Maximum length of caller-supplied vendor advertisement bytes.
pub const MAX_VENDOR_DATA_LEN: usize = 20;

/// Device/product identity and protocol tunables supplied at engine
/// construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Model identifier placed in the advertisement (MID field).
    pub product_id: u32,
    /// Vendor product key.
    pub product_key: Vec<u8, MAX_SECRET_LEN>,
    /// Per-device key.
    pub device_key: Vec<u8, MAX_SECRET_LEN>,
    /// Per-device secret used for device-secret-mode auth.
    pub secret: Vec<u8, MAX_SECRET_LEN>,
    /// Per-product secret used for product-secret-mode auth.
    pub product_secret: Vec<u8, MAX_SECRET_LEN>,
    /// `true` selects product-secret mode (feature mask bit 4); `false`
    /// selects device-secret mode.
    pub use_product_secret: bool,
    /// ASCII firmware build version string, included verbatim by callers
    /// that choose to surface it (not part of the adv payload itself).
    pub version: Vec<u8, MAX_VERSION_LEN>,
    /// Toggles the OTA bit in the advertised feature mask.
    pub enable_ota: bool,
    /// Toggles the auth/security bit in the advertised feature mask.
    pub enable_auth: bool,
    /// Toggles the signed-advertisement feature (appends signature + seq).
    pub enable_signed_adv: bool,
    /// Upper bound on per-PDU payload size negotiated with the HAL.
    pub max_mtu: u16,
    /// RX/TX inactivity timeout, in milliseconds (nominal 10_000).
    pub transport_timeout_ms: u32,
    /// Auth challenge/response timeout, in milliseconds (nominal 10_000).
    pub auth_timeout_ms: u32,
    /// Optional vendor-appended advertisement bytes.
    pub user_adv_data: Vec<u8, MAX_VENDOR_DATA_LEN>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            product_id: 0,
            product_key: Vec::new(),
            device_key: Vec::new(),
            secret: Vec::new(),
            product_secret: Vec::new(),
            use_product_secret: true,
            version: Vec::new(),
            enable_ota: false,
            enable_auth: true,
            enable_signed_adv: false,
            max_mtu: 23,
            transport_timeout_ms: 10_000,
            auth_timeout_ms: 10_000,
            user_adv_data: Vec::new(),
        }
    }
}

impl DeviceConfig {
    /// The secret used for the nonce challenge/response and key
    /// derivation, selected per `use_product_secret`.
    #[must_use]
    pub fn auth_secret(&self) -> &[u8] {
        if self.use_product_secret {
            &self.product_secret
        } else {
            &self.secret
        }
    }
}
