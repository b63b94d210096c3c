//! Unified error type for the Breeze protocol engine.
//!
//! Every fallible entry point funnels into this type, following the same
//! single-umbrella-enum shape used throughout the engine's subsystems.
//! All variants are `Copy` so they can be threaded through the transport
//! and auth state machines without allocation.

use core::fmt;

/// Every fallible operation in the engine returns this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Caller passed an oversized or empty payload to `post`/`post_fast`.
    DataSize,
    /// The engine handle or a raw buffer argument failed the alignment
    /// precondition (4-byte aligned).
    InvalidAddr,
    /// An RX, TX, or auth timer expired.
    Timeout,
    /// The BLE HAL refused a submission (e.g. `notify`/`indicate` returned
    /// an error). No `ERR` frame is sent for this case — see §7.
    Internal,
    /// An out-of-order fragment was received mid-message.
    FrameDiscontinuity,
    /// An assembled inbound message exceeded the 256-byte reassembly
    /// buffer.
    RxBufferSize,
    /// A received frame's command is not in the valid-RX set.
    InvalidRxCommand,
    /// An internal producer attempted to send a command not in the
    /// valid-TX set — a bug in the caller, not a wire fault.
    InvalidTxCommand,
    /// A send was requested while another message is still in flight.
    Busy,
    /// Advertising data (including any appended vendor bytes) exceeded
    /// the manufacturer-data capacity.
    AdvDataTooLarge,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DataSize => write!(f, "payload size out of range"),
            Self::InvalidAddr => write!(f, "misaligned context"),
            Self::Timeout => write!(f, "timer expired"),
            Self::Internal => write!(f, "HAL refused submission"),
            Self::FrameDiscontinuity => write!(f, "out-of-order frame"),
            Self::RxBufferSize => write!(f, "assembled payload too large"),
            Self::InvalidRxCommand => write!(f, "command not valid for RX"),
            Self::InvalidTxCommand => write!(f, "command not valid for TX"),
            Self::Busy => write!(f, "a message is already in flight"),
            Self::AdvDataTooLarge => write!(f, "advertising data too large"),
        }
    }
}

/// Engine-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
