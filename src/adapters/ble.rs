//! ESP-IDF [`BleHal`] adapter — Bluedroid GATT server.
//!
//! One custom service with two characteristics carries the whole wire
//! protocol: a write-only RX characteristic the central sends frames to,
//! and a notify+indicate TX characteristic the device sends frames
//! from. Connection/GATTS event plumbing (service registration,
//! characteristic discovery, write dispatch into [`BreezeEngine::on_rx`])
//! is owned by the caller's event loop, which is where the Bluedroid
//! callback surface naturally lives; this adapter only issues the
//! outbound GAP/GATTS commands the [`BleHal`] trait needs.
//!
//! [`BreezeEngine::on_rx`]: crate::engine::BreezeEngine::on_rx

use esp_idf_svc::sys::*;

use crate::error::{Error, Result};
use crate::hal::{BleHal, DisconnectReason};

/// 128-bit UUID for the Breeze GATT service.
pub const SERVICE_UUID: u128 = 0xb91d_4a65_91b7_4b91_a032_5f6c9a1d7e3a;
/// Central-writes-here characteristic (frames from the central).
pub const CHAR_RX_UUID: u128 = 0xb91d_4a65_0002_4b91_a032_5f6c9a1d7e3a;
/// Device-notifies/indicates-here characteristic (frames to the central).
pub const CHAR_TX_UUID: u128 = 0xb91d_4a65_0003_4b91_a032_5f6c9a1d7e3a;

fn check(ret: esp_err_t) -> Result<()> {
    if ret == ESP_OK {
        Ok(())
    } else {
        log::warn!("BLE HAL call failed: esp_err_t={ret}");
        Err(Error::Internal)
    }
}

/// Handles populated once the GATTS service-registration event fires.
/// The caller's event loop fills these in as the Bluedroid callbacks
/// arrive and constructs the adapter only once they're all known —
/// there is nothing for this adapter to do before then.
#[derive(Debug, Clone, Copy)]
pub struct GattHandles {
    pub gatts_if: esp_gatt_if_t,
    pub service_handle: u16,
    pub tx_char_handle: u16,
    pub conn_id: u16,
}

/// `BleHal` implementation over ESP-IDF's Bluedroid GATTS/GAP APIs.
pub struct EspBleHal {
    handles: GattHandles,
    mac: [u8; 6],
    adv_data: esp_ble_adv_data_t,
    adv_params: esp_ble_adv_params_t,
}

impl EspBleHal {
    #[must_use]
    pub fn new(handles: GattHandles, mac: [u8; 6]) -> Self {
        Self {
            handles,
            mac,
            // SAFETY: these are plain-old-data C structs; esp-idf-sys
            // zero-initializes the advertising fields it doesn't use.
            adv_data: unsafe { core::mem::zeroed() },
            adv_params: unsafe { core::mem::zeroed() },
        }
    }
}

impl BleHal for EspBleHal {
    fn adv_start(&mut self, payload: &[u8]) -> Result<()> {
        if payload.len() > 31 {
            return Err(Error::AdvDataTooLarge);
        }
        self.adv_data.set_scan_rsp = false;
        self.adv_data.include_name = true;
        self.adv_data.manufacturer_len = payload.len() as u16;
        self.adv_data.p_manufacturer_data = payload.as_ptr().cast_mut();
        // SAFETY: p_manufacturer_data points at `payload`, which outlives
        // this call; esp_ble_gap_config_adv_data copies it synchronously.
        check(unsafe { esp_ble_gap_config_adv_data(&mut self.adv_data) })?;

        self.adv_params.adv_type = esp_ble_adv_type_t_ADV_TYPE_IND;
        self.adv_params.own_addr_type = esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC;
        self.adv_params.channel_map = esp_ble_adv_channel_t_ADV_CHNL_ALL;
        self.adv_params.adv_filter_policy =
            esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY;
        // SAFETY: adv_params is a valid, fully-initialized struct.
        check(unsafe { esp_ble_gap_start_advertising(&mut self.adv_params) })
    }

    fn adv_stop(&mut self) -> Result<()> {
        check(unsafe { esp_ble_gap_stop_advertising() })
    }

    fn notify(&mut self, bytes: &[u8]) -> Result<()> {
        self.send(bytes, false)
    }

    fn indicate(&mut self, bytes: &[u8]) -> Result<()> {
        self.send(bytes, true)
    }

    fn disconnect(&mut self, _reason: DisconnectReason) -> Result<()> {
        check(unsafe { esp_ble_gap_disconnect(self.mac.as_mut_ptr()) })
    }

    fn get_mac(&self) -> [u8; 6] {
        self.mac
    }

    fn deinit(&mut self) -> Result<()> {
        check(unsafe { esp_bluedroid_disable() })?;
        check(unsafe { esp_bluedroid_deinit() })?;
        check(unsafe { esp_bt_controller_disable() })
    }
}

impl EspBleHal {
    fn send(&mut self, bytes: &[u8], need_confirm: bool) -> Result<()> {
        // SAFETY: bytes outlives this call; the Bluedroid stack copies the
        // PDU into its own TX queue before returning.
        check(unsafe {
            esp_ble_gatts_send_indicate(
                self.handles.gatts_if,
                self.handles.conn_id,
                self.handles.tx_char_handle,
                bytes.len() as u16,
                bytes.as_ptr().cast_mut(),
                need_confirm,
            )
        })
    }
}
