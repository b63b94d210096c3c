//! Extended command handler: AP-info passdown and acknowledgement.
//!
//! `EXT_DOWN` carries a vendor-defined blob (Wi-Fi provisioning info in
//! the reference product) that the engine has no opinion about beyond
//! forwarding it upward as `APINFO`; `EXT_UP` is the fixed-format reply
//! the caller sends back once it has processed it.

use heapless::Vec;

use crate::error::{Error, Result};

/// Cap on an `EXT_DOWN`/`EXT_UP` payload.
pub const EXTCMD_BUFFER_CAP: usize = 256;

/// Extended-command handler. Currently stateless beyond a buffer for
/// the last-received payload; kept as a struct (rather than a free
/// function) so the engine's dispatch surface is uniform across
/// subsystems (§9 REDESIGN FLAG: one handler per tag).
#[derive(Default)]
pub struct Extcmd;

impl Extcmd {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Translate a reassembled `EXT_DOWN` payload into the upward
    /// AP-info event payload. The engine forwards this verbatim; the
    /// caller's application layer owns the wire format of the blob.
    pub fn on_ext_down<'a>(&self, payload: &'a [u8]) -> Result<&'a [u8]> {
        if payload.is_empty() || payload.len() > EXTCMD_BUFFER_CAP {
            return Err(Error::DataSize);
        }
        Ok(payload)
    }

    /// Build the `EXT_UP` reply payload the caller wants sent back.
    pub fn build_ext_up(&self, data: &[u8]) -> Result<Vec<u8, EXTCMD_BUFFER_CAP>> {
        Vec::from_slice(data).map_err(|()| Error::DataSize)
    }
}
