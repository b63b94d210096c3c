//! Breeze protocol engine — device-side core.
//!
//! Implements the BLE IoT provisioning/control protocol's transport
//! framing, authentication, advertising-data, extended-command, and OTA
//! passthrough layers as a single engine handle driven by an injected set
//! of HAL ports. No radio, timer, flash, or crypto hardware is touched
//! directly here; all of it crosses the [`hal`] trait boundary.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (caller-supplied)                │
//! │                                                                │
//! │  BleHal   OsHal   KvStore   Crypto        EngineEvents        │
//! │                                                                │
//! │  ─────────────────── HAL trait boundary ────────────────────  │
//! │                                                                │
//! │  ┌──────────────────────────────────────────────────────┐    │
//! │  │                     BreezeEngine                      │    │
//! │  │   Transport ── Auth ── Extcmd ── Adv builder ── OTA    │    │
//! │  └──────────────────────────────────────────────────────┘    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![cfg_attr(not(any(test, feature = "espidf")), no_std)]
#![deny(unused_must_use)]

pub mod adv;
pub mod auth;
pub mod command;
pub mod config;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod event;
pub mod extcmd;
pub mod frame;
pub mod hal;
pub mod ota;
pub mod transport;

#[cfg(feature = "espidf")]
pub mod adapters;

pub use config::DeviceConfig;
pub use engine::{BreezeEngine, EngineEvents};
pub use error::{Error, Result};
