//! ESP-IDF [`KvStore`] adapter.
//!
//! The engine persists exactly one record — the signed-adv sequence
//! counter — so this adapter is a thin single-namespace wrapper around
//! raw NVS reads/writes rather than a general config store.

use crate::hal::KvStore;
use esp_idf_svc::sys::*;

const NAMESPACE: &str = "breeze\0";

/// `KvStore` implementation backed by an ESP-IDF NVS namespace.
pub struct NvsKvStore;

impl NvsKvStore {
    /// Initialise the NVS flash partition (erasing and retrying once on a
    /// free-pages/version mismatch, matching the startup dance every
    /// ESP-IDF NVS user needs before the first `nvs_open`).
    pub fn new() -> Result<Self, crate::Error> {
        // SAFETY: nvs_flash_init/_erase are called once, from the single
        // main-task context, before any concurrent NVS access begins.
        let ret = unsafe { nvs_flash_init() };
        if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
            log::warn!("NVS: erasing and re-initialising flash partition");
            if unsafe { nvs_flash_erase() } != ESP_OK {
                return Err(crate::Error::Internal);
            }
            if unsafe { nvs_flash_init() } != ESP_OK {
                return Err(crate::Error::Internal);
            }
        } else if ret != ESP_OK {
            return Err(crate::Error::Internal);
        }
        Ok(Self)
    }

    fn with_handle<T>(
        write: bool,
        f: impl FnOnce(nvs_handle_t) -> T,
    ) -> Option<T> {
        let mode = if write { nvs_open_mode_t_NVS_READWRITE } else { nvs_open_mode_t_NVS_READONLY };
        let mut handle: nvs_handle_t = 0;
        let ret = unsafe { nvs_open(NAMESPACE.as_ptr().cast(), mode, &mut handle) };
        if ret != ESP_OK {
            return None;
        }
        let result = f(handle);
        unsafe { nvs_close(handle) };
        Some(result)
    }
}

impl KvStore for NvsKvStore {
    fn get(&self, key: &str, buf: &mut [u8]) -> Option<usize> {
        let mut key_buf = [0u8; 16];
        let bytes = key.as_bytes();
        let len = bytes.len().min(key_buf.len() - 1);
        key_buf[..len].copy_from_slice(&bytes[..len]);

        Self::with_handle(false, |handle| {
            let mut required: usize = 0;
            // SAFETY: handle is valid for the duration of this call, and a
            // null out-pointer is the documented way to query the length.
            let ret = unsafe {
                nvs_get_blob(handle, key_buf.as_ptr().cast(), core::ptr::null_mut(), &mut required)
            };
            if ret != ESP_OK || required > buf.len() {
                return None;
            }
            let ret = unsafe {
                nvs_get_blob(handle, key_buf.as_ptr().cast(), buf.as_mut_ptr().cast(), &mut required)
            };
            (ret == ESP_OK).then_some(required)
        })
        .flatten()
    }

    fn set(&mut self, key: &str, data: &[u8]) {
        let mut key_buf = [0u8; 16];
        let bytes = key.as_bytes();
        let len = bytes.len().min(key_buf.len() - 1);
        key_buf[..len].copy_from_slice(&bytes[..len]);

        Self::with_handle(true, |handle| {
            // SAFETY: key_buf is NUL-terminated, data is a valid (ptr, len)
            // pair for the duration of the call.
            let ret = unsafe {
                nvs_set_blob(handle, key_buf.as_ptr().cast(), data.as_ptr().cast(), data.len())
            };
            if ret == ESP_OK {
                unsafe { nvs_commit(handle) };
            } else {
                log::warn!("NVS: failed to persist key {key} (err {ret})");
            }
        });
    }
}
