//! Advertising-data builder.
//!
//! Produces the manufacturer-specific payload broadcast in the BLE
//! advertisement: a fixed 14-byte prefix (company ID, protocol ID,
//! feature mask, model ID, MAC), an optional 8-byte signature+sequence
//! suffix when signed-adv is enabled, and optional caller-supplied
//! vendor bytes appended after that.
//!
//! ```text
//! 0    2  3        4         8          14        18
//! ├CID─┼PI┼FMSK────┼Model ID─┼MAC───────┼Sign(opt)┼Seq(opt)┼vendor...
//! ```

use heapless::Vec;

use crate::auth::calc_adv_sign;
use crate::error::{Error, Result};
use crate::hal::Crypto;

/// Fixed prefix length (company ID through MAC).
const PREFIX_LEN: usize = 14;
/// Signature + sequence suffix length, present only when signed-adv is on.
const SIGNED_SUFFIX_LEN: usize = 8;
/// Maximum vendor-data bytes the builder will append.
pub const MAX_VENDOR_DATA_LEN: usize = 20;
/// Upper bound on the whole payload: prefix + signed suffix + vendor data.
pub const MAX_ADV_LEN: usize = PREFIX_LEN + SIGNED_SUFFIX_LEN + MAX_VENDOR_DATA_LEN;

/// Fixed vendor company ID placed at offset 0 of every payload this
/// builder produces.
pub const COMPANY_ID: u16 = 0x01A8;
/// Fixed protocol ID placed at offset 2.
pub const PROTOCOL_ID: u8 = 0x01;
/// Fixed BT-version bits (feature mask bits 0-1).
pub const BLUETOOTH_VERSION: u8 = 0b01;

const FMSK_BLUETOOTH_VER_POS: u8 = 0;
const FMSK_OTA_POS: u8 = 2;
const FMSK_SECURITY_POS: u8 = 3;
const FMSK_SECRET_TYPE_POS: u8 = 4;
const FMSK_SIGNED_ADV_POS: u8 = 5;

/// Fields that vary per build call; everything else (company/protocol
/// ID) is a fixed constant of the builder.
#[derive(Debug, Clone, Copy)]
pub struct AdvParams {
    pub company_id: u16,
    pub protocol_id: u8,
    pub bluetooth_version: u8,
    pub ota_enabled: bool,
    pub auth_enabled: bool,
    pub use_product_secret: bool,
    pub signed_adv: bool,
    pub model_id: u32,
    pub mac: [u8; 6],
}

fn feature_mask(p: &AdvParams) -> u8 {
    let mut mask = (p.bluetooth_version & 0x03) << FMSK_BLUETOOTH_VER_POS;
    if p.ota_enabled {
        mask |= 1 << FMSK_OTA_POS;
    }
    if p.auth_enabled {
        mask |= 1 << FMSK_SECURITY_POS;
    }
    if p.use_product_secret {
        mask |= 1 << FMSK_SECRET_TYPE_POS;
    }
    if p.signed_adv {
        mask |= 1 << FMSK_SIGNED_ADV_POS;
    }
    mask
}

/// Build one advertisement payload.
///
/// `seq` is the persisted `adv_seq` counter value to embed (and to sign
/// over) when `params.signed_adv` is set; the caller is responsible for
/// incrementing and persisting it afterward (§4.6/§6 — the engine owns
/// that bookkeeping, this function is a pure byte builder). `vendor`
/// bytes are appended whole if they fit in the remaining capacity;
/// otherwise they are dropped and a warning is logged (§4.5) rather than
/// truncated or treated as a hard error — the fixed prefix and optional
/// signed-adv suffix always make it into the payload.
pub fn build(
    crypto: &impl Crypto,
    params: &AdvParams,
    secret: &[u8],
    seq: u32,
    vendor: &[u8],
) -> Result<Vec<u8, MAX_ADV_LEN>> {
    let mut out: Vec<u8, MAX_ADV_LEN> = Vec::new();
    out.extend_from_slice(&params.company_id.to_le_bytes())
        .map_err(|()| Error::AdvDataTooLarge)?;
    out.push(params.protocol_id).map_err(|_| Error::AdvDataTooLarge)?;
    out.push(feature_mask(params))
        .map_err(|_| Error::AdvDataTooLarge)?;
    out.extend_from_slice(&params.model_id.to_le_bytes())
        .map_err(|()| Error::AdvDataTooLarge)?;
    out.extend_from_slice(&params.mac)
        .map_err(|()| Error::AdvDataTooLarge)?;
    debug_assert_eq!(out.len(), PREFIX_LEN);

    if params.signed_adv {
        let sign = calc_adv_sign(crypto, &out, secret, seq);
        out.extend_from_slice(&sign).map_err(|()| Error::AdvDataTooLarge)?;
        out.extend_from_slice(&seq.to_le_bytes())
            .map_err(|()| Error::AdvDataTooLarge)?;
    }

    if !vendor.is_empty() {
        if out.len() + vendor.len() > MAX_ADV_LEN {
            log::warn!(
                "dropping {} bytes of vendor adv data, {} bytes of capacity remain",
                vendor.len(),
                MAX_ADV_LEN - out.len()
            );
        } else {
            out.extend_from_slice(vendor).map_err(|()| Error::AdvDataTooLarge)?;
        }
    }

    Ok(out)
}
