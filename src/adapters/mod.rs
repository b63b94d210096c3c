//! Adapters — concrete ESP-IDF implementations of the HAL port traits
//! the engine is generic over.
//!
//! | Adapter | Implements        | Backed by                          |
//! |---------|--------------------|-------------------------------------|
//! | `ble`   | [`crate::hal::BleHal`]  | Bluedroid GATTS/GAP            |
//! | `nvs`   | [`crate::hal::KvStore`] | ESP-IDF NVS (single namespace) |
//! | `time`  | [`crate::hal::OsHal`]   | `esp_timer` + hardware RNG     |
//!
//! [`crate::crypto::DefaultCrypto`] already implements [`crate::hal::Crypto`]
//! in software and needs no ESP-IDF-specific counterpart.

pub mod ble;
pub mod nvs;
pub mod time;
