//! OTA passthrough — not a state machine, just a classifier and an
//! envelope. All real OTA logic (flash writer, image verification)
//! lives outside the engine; this module only recognizes OTA-tagged
//! traffic and wraps it for forwarding.

use crate::command::{self, is_ota};

/// Everything the caller's OTA handler needs from one reassembled
/// OTA-tagged message.
#[derive(Debug, Clone, Copy)]
pub struct OtaInfo<'a> {
    pub cmd: u8,
    pub frame_count: u8,
    pub payload: &'a [u8],
}

impl<'a> OtaInfo<'a> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// If `cmd` is an OTA command, wrap the reassembled payload for
/// `OTA_CMD` delivery.
#[must_use]
pub fn classify_rx(cmd: u8, frame_count: u8, payload: &[u8]) -> Option<OtaInfo<'_>> {
    is_ota(cmd).then_some(OtaInfo {
        cmd,
        frame_count,
        payload,
    })
}

/// `true` if a completed TX of `cmd` should raise a synthetic
/// `ALI_OTA_ON_TX_DONE` event toward the OTA handler.
#[must_use]
pub fn tx_done_notifies_ota(cmd: u8) -> bool {
    matches!(
        cmd,
        command::OTA_CHECK_RESULT | command::ERR | command::OTA_PUB_SIZE
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_rx_wraps_ota_commands_only() {
        let payload = [1, 2, 3];
        let info = classify_rx(command::OTA_DATA, 4, &payload).unwrap();
        assert_eq!(info.cmd, command::OTA_DATA);
        assert_eq!(info.frame_count, 4);
        assert_eq!(info.payload, &payload);

        assert!(classify_rx(command::CTRL, 1, &payload).is_none());
    }

    #[test]
    fn tx_done_notifies_only_the_three_named_commands() {
        assert!(tx_done_notifies_ota(command::OTA_CHECK_RESULT));
        assert!(tx_done_notifies_ota(command::ERR));
        assert!(tx_done_notifies_ota(command::OTA_PUB_SIZE));
        assert!(!tx_done_notifies_ota(command::OTA_RSP));
        assert!(!tx_done_notifies_ota(command::STATUS));
    }
}
