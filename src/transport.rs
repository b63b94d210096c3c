//! Transport: frame segmentation/reassembly, RX/TX timeouts, and
//! session-key payload encryption.
//!
//! One message is in flight per direction at a time — there is no
//! interleaving of multiple outbound messages and no retransmission;
//! the link layer underneath is trusted to deliver frames in order
//! (§5). A stalled peer is only detected via the RX/TX timers checked
//! from [`Transport::tick`].

use heapless::Vec;

use crate::command::is_encrypted;
use crate::crypto::{cbc_decrypt, cbc_encrypt};
use crate::error::{Error, Result};
use crate::event::ErrorSource;
use crate::frame::{self, MAX_PAYLOAD_SIZE};
use crate::hal::{BleHal, Crypto, OsHal, TxKind};

/// Cap on a reassembled RX payload (§4.2 failure semantics).
pub const RX_BUFFER_CAP: usize = 256;

/// Outcome of feeding one frame into [`Transport::rx`].
pub enum RxOutcome {
    /// More frames are expected before the message is complete.
    Partial,
    /// The message is fully reassembled; frame's `cmd` identifies it and
    /// the payload can be read back via [`Transport::take_rx`].
    Complete { cmd: u8 },
}

struct TxState {
    kind: TxKind,
    cmd: u8,
    seq: u8,
    buf: Vec<u8, MAX_PAYLOAD_SIZE>,
    total_frames: u8,
    remaining: u8,
    offset: usize,
    deadline_ms: u64,
}

struct RxState {
    cmd: u8,
    seq: u8,
    total_frames: u8,
    expected_remaining: u8,
    buf: Vec<u8, RX_BUFFER_CAP>,
    deadline_ms: u64,
}

/// Segmentation/reassembly engine for one GATT connection.
pub struct Transport {
    tx: Option<TxState>,
    rx: Option<RxState>,
    rx_done: Option<(u8, u8, Vec<u8, RX_BUFFER_CAP>)>,
    session_key: Option<[u8; 16]>,
    mtu_payload: usize,
    timeout_ms: u64,
}

impl Transport {
    #[must_use]
    pub fn new(mtu_payload: usize, timeout_ms: u64) -> Self {
        Self {
            tx: None,
            rx: None,
            rx_done: None,
            session_key: None,
            mtu_payload: mtu_payload.max(frame::HEADER_LEN + 1),
            timeout_ms,
        }
    }

    /// Install the session key derived by the auth handshake. `None`
    /// clears it (disconnect / reset).
    pub fn set_session_key(&mut self, key: Option<[u8; 16]>) {
        self.session_key = key;
    }

    /// Drop all in-flight state. Called on disconnect and on auth
    /// restart.
    pub fn reset(&mut self) {
        self.tx = None;
        self.rx = None;
        self.rx_done = None;
    }

    /// `true` while a TX message is still being drained frame by frame.
    #[must_use]
    pub fn tx_busy(&self) -> bool {
        self.tx.is_some()
    }

    /// Begin sending `payload` tagged as `cmd`, fragmented to the
    /// connection MTU. Encrypts first if `cmd` is in the encrypted
    /// command class (§9 `is_encrypted` policy predicate) and a session
    /// key has actually been installed; before that, encrypted-class
    /// commands still travel in the clear.
    pub fn tx(
        &mut self,
        os: &impl OsHal,
        ble: &mut impl BleHal,
        crypto: &impl Crypto,
        kind: TxKind,
        cmd: u8,
        seq: u8,
        payload: &[u8],
    ) -> Result<()> {
        if self.tx.is_some() {
            return Err(Error::Busy);
        }
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(Error::DataSize);
        }

        let mut buf: Vec<u8, MAX_PAYLOAD_SIZE> = Vec::new();

        // Encryption is only ever "in effect" once a session key exists —
        // before the handshake completes (or with auth disabled entirely)
        // encrypted-class commands still travel in the clear, since there
        // is no key to encrypt them with.
        if is_encrypted(cmd) && self.session_key.is_some() {
            let key = self.session_key.ok_or(Error::Internal)?;
            // Plaintext length goes in the first two payload bytes so the
            // receiver can strip PKCS-style zero padding after decrypting.
            buf.extend_from_slice(&(payload.len() as u16).to_le_bytes())
                .map_err(|()| Error::DataSize)?;
            buf.extend_from_slice(payload).map_err(|()| Error::DataSize)?;
            let padded_len = (buf.len() + 15) / 16 * 16;
            buf.resize(padded_len, 0).map_err(|()| Error::DataSize)?;
            cbc_encrypt(crypto, &key, &mut buf);
        } else {
            buf.extend_from_slice(payload).map_err(|()| Error::DataSize)?;
        }

        let max_chunk = self.mtu_payload - frame::HEADER_LEN;
        let total_frames = buf.len().div_ceil(max_chunk).max(1);
        if total_frames > usize::from(frame::MAX_FRAMES) {
            return Err(Error::DataSize);
        }

        self.send_next_frame(
            ble,
            &TxState {
                kind,
                cmd,
                seq,
                buf,
                total_frames: total_frames as u8,
                remaining: total_frames as u8,
                offset: 0,
                deadline_ms: os.now_ms() + self.timeout_ms,
            },
        )?;

        Ok(())
    }

    fn send_next_frame(&mut self, ble: &mut impl BleHal, state: &TxState) -> Result<()> {
        let max_chunk = self.mtu_payload - frame::HEADER_LEN;
        let remaining_bytes = state.buf.len() - state.offset;
        let chunk_len = remaining_bytes.min(max_chunk);
        let chunk = &state.buf[state.offset..state.offset + chunk_len];

        let mut wire: Vec<u8, { frame::HEADER_LEN + MAX_PAYLOAD_SIZE }> =
            Vec::new();
        wire.resize(frame::HEADER_LEN + chunk_len, 0)
            .map_err(|()| Error::DataSize)?;
        let n = frame::encode(
            state.cmd,
            state.seq,
            state.remaining - 1,
            state.total_frames,
            chunk,
            &mut wire,
        )?;
        ble_send(ble, state.kind, &wire[..n])?;

        // The frame just submitted is awaiting its HAL acknowledgment
        // (`tx_done`) regardless of whether it was the last one — a
        // message stays "in flight" until that ack arrives, not merely
        // until its bytes are handed to the HAL.
        self.tx = Some(TxState {
            kind: state.kind,
            cmd: state.cmd,
            seq: state.seq,
            buf: state.buf.clone(),
            total_frames: state.total_frames,
            remaining: state.remaining - 1,
            offset: state.offset + chunk_len,
            deadline_ms: state.deadline_ms,
        });
        Ok(())
    }

    /// Called once the BLE stack confirms the previous notify/indicate
    /// left the TX buffer (`TX_DONE`). Sends the next fragment, if any;
    /// returns `Some(cmd)` once the message's last frame has been
    /// acknowledged.
    pub fn tx_done(&mut self, ble: &mut impl BleHal) -> Result<Option<u8>> {
        let Some(state) = self.tx.take() else {
            return Ok(None);
        };
        if state.remaining == 0 {
            return Ok(Some(state.cmd));
        }
        self.send_next_frame(ble, &state)?;
        Ok(None)
    }

    /// Feed one received frame into the reassembler.
    pub fn rx(&mut self, os: &impl OsHal, bytes: &[u8]) -> core::result::Result<RxOutcome, ErrorSource> {
        let frame = frame::decode(bytes).map_err(|_| ErrorSource::TransportFwDataDisc)?;

        match &mut self.rx {
            None => {
                if !frame.is_first() {
                    return Err(ErrorSource::TransportFwDataDisc);
                }
                let mut buf: Vec<u8, RX_BUFFER_CAP> = Vec::new();
                buf.extend_from_slice(frame.payload)
                    .map_err(|()| ErrorSource::TransportRxBuffSize)?;
                if frame.is_last() {
                    self.rx_done = Some((frame.cmd, frame.total_frames, buf));
                    return Ok(RxOutcome::Complete { cmd: frame.cmd });
                }
                self.rx = Some(RxState {
                    cmd: frame.cmd,
                    seq: frame.seq,
                    total_frames: frame.total_frames,
                    expected_remaining: frame.frames_remaining_including_self - 1,
                    buf,
                    deadline_ms: os.now_ms() + self.timeout_ms,
                });
                Ok(RxOutcome::Partial)
            }
            Some(state) => {
                if frame.cmd != state.cmd
                    || frame.seq != state.seq
                    || frame.total_frames != state.total_frames
                    || frame.frames_remaining_including_self != state.expected_remaining
                {
                    self.rx = None;
                    return Err(ErrorSource::TransportFwDataDisc);
                }
                state
                    .buf
                    .extend_from_slice(frame.payload)
                    .map_err(|()| {
                        self.rx = None;
                        ErrorSource::TransportRxBuffSize
                    })?;
                if frame.is_last() {
                    let state = self.rx.take().unwrap();
                    self.rx_done = Some((state.cmd, state.total_frames, state.buf));
                    Ok(RxOutcome::Complete { cmd: frame.cmd })
                } else {
                    state.expected_remaining -= 1;
                    state.deadline_ms = os.now_ms() + self.timeout_ms;
                    Ok(RxOutcome::Partial)
                }
            }
        }
    }

    /// Take the most recently completed RX payload, decrypting it first
    /// if `cmd` is in the encrypted command class. Returns
    /// `(cmd, total_frames, payload)`.
    pub fn take_rx(&mut self, crypto: &impl Crypto) -> Result<(u8, u8, Vec<u8, RX_BUFFER_CAP>)> {
        let (cmd, total_frames, mut buf) = self.rx_done.take().ok_or(Error::Internal)?;
        if is_encrypted(cmd) && self.session_key.is_some() {
            let key = self.session_key.ok_or(Error::Internal)?;
            if buf.len() % 16 != 0 || buf.len() < 16 {
                return Err(Error::DataSize);
            }
            cbc_decrypt(crypto, &key, &mut buf);
            let plaintext_len = usize::from(u16::from_le_bytes([buf[0], buf[1]]));
            if plaintext_len > buf.len() - 2 {
                return Err(Error::DataSize);
            }
            buf.rotate_left(2);
            buf.truncate(plaintext_len);
        }
        Ok((cmd, total_frames, buf))
    }

    /// Check RX/TX timers against `now_ms`, tearing down any stalled
    /// in-flight message and reporting which timer fired (if any).
    pub fn tick(&mut self, now_ms: u64) -> Option<ErrorSource> {
        if let Some(state) = &self.rx {
            if now_ms >= state.deadline_ms {
                self.rx = None;
                return Some(ErrorSource::TransportRxTimer);
            }
        }
        if let Some(state) = &self.tx {
            if now_ms >= state.deadline_ms {
                self.tx = None;
                return Some(ErrorSource::TransportTxTimer);
            }
        }
        None
    }
}

fn ble_send(ble: &mut impl BleHal, kind: TxKind, bytes: &[u8]) -> Result<()> {
    match kind {
        TxKind::Indication => ble.indicate(bytes),
        TxKind::Notification => ble.notify(bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::DefaultCrypto;
    use crate::hal::DisconnectReason;
    use std::vec::Vec as StdVec;

    struct FakeBle {
        sent: StdVec<StdVec<u8>>,
    }
    impl BleHal for FakeBle {
        fn adv_start(&mut self, _payload: &[u8]) -> Result<()> {
            Ok(())
        }
        fn adv_stop(&mut self) -> Result<()> {
            Ok(())
        }
        fn notify(&mut self, bytes: &[u8]) -> Result<()> {
            self.sent.push(bytes.to_vec());
            Ok(())
        }
        fn indicate(&mut self, bytes: &[u8]) -> Result<()> {
            self.sent.push(bytes.to_vec());
            Ok(())
        }
        fn disconnect(&mut self, _reason: DisconnectReason) -> Result<()> {
            Ok(())
        }
        fn get_mac(&self) -> [u8; 6] {
            [0; 6]
        }
        fn deinit(&mut self) -> Result<()> {
            Ok(())
        }
    }

    struct FakeOs {
        now: u64,
    }
    impl OsHal for FakeOs {
        fn now_ms(&self) -> u64 {
            self.now
        }
        fn random_bytes(&mut self, buf: &mut [u8]) {
            buf.fill(0x42);
        }
    }

    #[test]
    fn single_frame_round_trip_unencrypted() {
        let mut transport = Transport::new(23, 5_000);
        let os = FakeOs { now: 1_000 };
        let mut ble = FakeBle { sent: StdVec::new() };
        let crypto = DefaultCrypto;

        transport
            .tx(&os, &mut ble, &crypto, TxKind::Notification, crate::command::STATUS, 1, b"ok")
            .unwrap();
        assert_eq!(ble.sent.len(), 1);

        let mut other = Transport::new(23, 5_000);
        match other.rx(&os, &ble.sent[0]).unwrap() {
            RxOutcome::Complete { cmd } => assert_eq!(cmd, crate::command::STATUS),
            RxOutcome::Partial => panic!("expected single-frame message to complete"),
        }
        let (cmd, total_frames, payload) = other.take_rx(&crypto).unwrap();
        assert_eq!(cmd, crate::command::STATUS);
        assert_eq!(total_frames, 1);
        assert_eq!(&payload[..], b"ok");
    }

    #[test]
    fn encrypted_command_round_trips_through_session_key() {
        let mut transport = Transport::new(200, 5_000);
        transport.set_session_key(Some([0x11; 16]));
        let os = FakeOs { now: 0 };
        let mut ble = FakeBle { sent: StdVec::new() };
        let crypto = DefaultCrypto;

        transport
            .tx(&os, &mut ble, &crypto, TxKind::Indication, crate::command::CTRL, 9, b"turn-on-pump")
            .unwrap();

        let mut rx_side = Transport::new(200, 5_000);
        rx_side.set_session_key(Some([0x11; 16]));
        for frame in &ble.sent {
            let _ = rx_side.rx(&os, frame).unwrap();
        }
        let (cmd, _total_frames, payload) = rx_side.take_rx(&crypto).unwrap();
        assert_eq!(cmd, crate::command::CTRL);
        assert_eq!(&payload[..], b"turn-on-pump");
    }

    #[test]
    fn out_of_order_frame_is_discontinuity() {
        let mut transport = Transport::new(200, 5_000);
        let os = FakeOs { now: 0 };

        let mut buf1 = [0u8; 5];
        frame::encode(crate::command::QUERY, 1, 2, 3, b"a", &mut buf1).unwrap();
        transport.rx(&os, &buf1).unwrap();

        let mut buf_bad = [0u8; 5];
        frame::encode(crate::command::QUERY, 1, 0, 3, b"b", &mut buf_bad).unwrap();
        let err = transport.rx(&os, &buf_bad).unwrap_err();
        assert!(matches!(err, ErrorSource::TransportFwDataDisc));
    }

    #[test]
    fn rx_timeout_clears_in_progress_message() {
        let mut transport = Transport::new(200, 1_000);
        let os_early = FakeOs { now: 0 };
        let mut buf = [0u8; 5];
        frame::encode(crate::command::QUERY, 1, 2, 3, b"a", &mut buf).unwrap();
        transport.rx(&os_early, &buf).unwrap();

        let fired = transport.tick(5_000);
        assert!(matches!(fired, Some(ErrorSource::TransportRxTimer)));
        assert!(transport.rx.is_none());
    }
}
