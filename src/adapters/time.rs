//! ESP-IDF [`OsHal`] adapter.
//!
//! Wraps `esp_timer_get_time()` for monotonic milliseconds and the
//! ESP-IDF hardware RNG for nonce generation. Both are thin wrappers —
//! the engine only ever needs a clock and a source of random bytes, not
//! a full timer-service abstraction.

use crate::hal::OsHal;

/// `OsHal` implementation backed by the ESP-IDF system timer and RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct EspOsHal;

impl OsHal for EspOsHal {
    fn now_ms(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
    }

    fn random_bytes(&mut self, buf: &mut [u8]) {
        // SAFETY: esp_fill_random has no preconditions beyond a valid
        // (ptr, len) pair, which `buf` always provides.
        unsafe {
            esp_idf_svc::sys::esp_fill_random(buf.as_mut_ptr().cast(), buf.len() as u32);
        }
    }
}
