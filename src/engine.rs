//! Core dispatcher — owns the Transport/Auth/Extcmd subsystems and the
//! persisted adv-seq counter, and translates their internal events into
//! the upward [`EngineEvents`] callback surface.
//!
//! [`BreezeEngine`] replaces the source's single process-wide context
//! pointer (§9 REDESIGN FLAG): it is an owned handle the caller
//! constructs once per device and drives from its BLE HAL callbacks.
//! Each subsystem is a state object with its own `on_*`/`tick` entry
//! points; this module is the only place that knows how they chain
//! together.

use heapless::Vec;

use crate::adv::{self, AdvParams, MAX_ADV_LEN};
use crate::auth::Auth;
use crate::command;
use crate::config::DeviceConfig;
use crate::error::{Error, Result};
use crate::event::ErrorSource;
use crate::extcmd::Extcmd;
use crate::hal::{BleHal, Crypto, DisconnectReason, KvStore, OsHal, TxKind};
use crate::ota::{self, OtaInfo};
use crate::transport::{RxOutcome, Transport};

/// NV-KV key the persisted advertisement sequence counter is stored under.
pub const ADV_SEQ_KEY: &str = "ais_adv_seq";

/// How often [`BreezeEngine::tick`] flushes `adv_seq` to the [`KvStore`]
/// even if nothing else triggered a write (nominal cadence, §3).
pub const ADV_SEQ_FLUSH_INTERVAL_MS: u64 = 60 * 60 * 1000;

/// Upward callback surface the caller implements. One method per upward
/// event/tag (§9 REDESIGN FLAG: no single "dispatch by variant"
/// callback on the outward boundary either). All methods default to a
/// no-op so a caller only needs to implement the events it cares about.
#[allow(unused_variables)]
pub trait EngineEvents {
    /// A central connected.
    fn connected(&mut self) {}
    /// The connection was torn down; engine state has already been reset.
    fn disconnected(&mut self) {}
    /// The auth handshake completed, successfully or not.
    fn authenticated(&mut self, ok: bool) {}
    /// A previously queued `post`/`post_fast` message finished sending.
    /// Only raised for `STATUS`/`REPLY` (§4.6).
    fn tx_done(&mut self, cmd: u8) {}
    /// A reassembled `CTRL` message arrived.
    fn rx_ctrl(&mut self, payload: &[u8]) {}
    /// A reassembled `QUERY` message arrived.
    fn rx_query(&mut self, payload: &[u8]) {}
    /// AP-info extended-command payload arrived.
    fn apinfo(&mut self, payload: &[u8]) {}
    /// An OTA-tagged message arrived.
    fn ota_cmd(&mut self, info: OtaInfo<'_>) {}
    /// An error condition was raised upward (§7).
    fn err(&mut self, err: Error) {}

    /// Synthetic OTA lifecycle events (§4.6/§4.7) — forwarded so the
    /// caller's OTA handler can track connection/auth state without
    /// the core understanding OTA itself.
    fn ota_on_disconnected(&mut self) {}
    fn ota_on_tx_done(&mut self) {}
    fn ota_on_auth_evt(&mut self, ok: bool) {}
    fn ota_on_discontinue_err(&mut self) {}
}

/// Owned protocol-engine handle. Generic over the four injected HAL
/// ports (§1); the engine itself never touches a radio, a flash
/// partition, or a hardware RNG.
///
/// 4-byte aligned by construction like any owned Rust value — the
/// source's `EINVALIDADDR` misaligned-context precondition is therefore
/// a type-level guarantee here rather than a runtime check (§9).
#[repr(align(4))]
pub struct BreezeEngine<B: BleHal, O: OsHal, K: KvStore, C: Crypto> {
    ble: B,
    os: O,
    kv: K,
    crypto: C,
    config: DeviceConfig,
    transport: Transport,
    auth: Auth,
    extcmd: Extcmd,
    adv_seq: u32,
    tx_seq: u8,
    auth_tx_seq: u8,
    connected: bool,
    last_flush_ms: u64,
}

impl<B: BleHal, O: OsHal, K: KvStore, C: Crypto> BreezeEngine<B, O, K, C> {
    /// Construct the engine. Loads the persisted `adv_seq` counter from
    /// `kv`, defaulting to 0 if absent.
    pub fn new(ble: B, os: O, kv: K, crypto: C, config: DeviceConfig) -> Self {
        let mut raw = [0u8; 4];
        let adv_seq = match kv.get(ADV_SEQ_KEY, &mut raw) {
            Some(n) if n == 4 => u32::from_le_bytes(raw),
            _ => 0,
        };
        let transport = Transport::new(
            usize::from(config.max_mtu).max(crate::frame::HEADER_LEN + 1),
            u64::from(config.transport_timeout_ms),
        );
        let auth = Auth::new(u64::from(config.auth_timeout_ms));
        Self {
            ble,
            os,
            kv,
            crypto,
            config,
            transport,
            auth,
            extcmd: Extcmd::new(),
            adv_seq,
            tx_seq: 0,
            auth_tx_seq: 0,
            connected: false,
            last_flush_ms: 0,
        }
    }

    /// `true` once the auth handshake has completed, or always `true` if
    /// auth is disabled at build time (§3 invariant).
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        !self.config.enable_auth || self.auth.state() == crate::auth::State::Done
    }

    // ── Advertising ──────────────────────────────────────────────

    fn adv_params(&self) -> AdvParams {
        AdvParams {
            company_id: adv::COMPANY_ID,
            protocol_id: adv::PROTOCOL_ID,
            bluetooth_version: adv::BLUETOOTH_VERSION,
            ota_enabled: self.config.enable_ota,
            auth_enabled: self.config.enable_auth,
            use_product_secret: self.config.use_product_secret,
            signed_adv: self.config.enable_signed_adv,
            model_id: self.config.product_id,
            mac: self.ble.get_mac(),
        }
    }

    /// Build the current advertisement payload. Advances and persists
    /// `adv_seq` when signed-adv is on (§4.5/§6 — every call that
    /// produces a signed payload increments the counter).
    pub fn build_adv(&mut self) -> Result<Vec<u8, MAX_ADV_LEN>> {
        let params = self.adv_params();
        let seq = self.adv_seq;
        let payload = adv::build(
            &self.crypto,
            &params,
            self.config.auth_secret(),
            seq,
            &self.config.user_adv_data,
        )?;
        if params.signed_adv {
            self.adv_seq = self.adv_seq.wrapping_add(1);
            self.kv.set(ADV_SEQ_KEY, &self.adv_seq.to_le_bytes());
        }
        Ok(payload)
    }

    /// Build and start advertising the manufacturer payload.
    pub fn start_advertising(&mut self) -> Result<()> {
        let payload = self.build_adv()?;
        self.ble.adv_start(&payload)
    }

    // ── BLE HAL callbacks ────────────────────────────────────────

    /// The BLE GATT service was enabled. Forwarded to Auth (no-op state
    /// change, IDLE stays IDLE per §4.3) plus the synthetic OTA
    /// auth-event the source always raises here.
    pub fn on_service_enabled(&mut self, events: &mut impl EngineEvents) {
        events.ota_on_auth_evt(true);
    }

    /// A central connected.
    pub fn on_connect(&mut self, events: &mut impl EngineEvents) {
        self.connected = true;
        events.connected();
    }

    /// The connection was torn down. Resets Auth and Transport *before*
    /// the upward `DISCONNECTED` callback, then forwards the synthetic
    /// `ALI_OTA_ON_DISCONNECTED` event — this exact order matters (§4.6).
    pub fn on_disconnect(&mut self, events: &mut impl EngineEvents) {
        self.connected = false;
        self.auth.reset();
        self.transport.reset();
        events.disconnected();
        events.ota_on_disconnected();
    }

    /// The BLE stack finished writing the previous notify/indicate PDU.
    pub fn on_tx_complete(&mut self, events: &mut impl EngineEvents) {
        let done_cmd = match self.transport.tx_done(&mut self.ble) {
            Ok(done) => done,
            Err(_) => {
                // EINTERNAL: upward ERR, no ERR frame is sent (§7).
                events.err(Error::Internal);
                return;
            }
        };
        let Some(cmd) = done_cmd else {
            return;
        };

        if cmd == command::AUTH_RSP {
            if let Some(key) = self.auth.auth_tx_done(&self.crypto, self.config.auth_secret()) {
                self.transport.set_session_key(Some(key));
                events.ota_on_auth_evt(true);
                events.authenticated(true);
            }
        }

        if matches!(cmd, command::STATUS | command::REPLY) {
            events.tx_done(cmd);
        }
        if ota::tx_done_notifies_ota(cmd) {
            events.ota_on_tx_done();
        }
    }

    /// A characteristic write arrived from the BLE HAL.
    pub fn on_rx(&mut self, bytes: &[u8], events: &mut impl EngineEvents) {
        match self.transport.rx(&self.os, bytes) {
            Ok(RxOutcome::Partial) => {}
            Ok(RxOutcome::Complete { cmd }) => self.on_rx_done(cmd, events),
            Err(source) => self.on_transport_error(source, events),
        }
    }

    fn on_transport_error(&mut self, source: ErrorSource, events: &mut impl EngineEvents) {
        let err = match source {
            ErrorSource::TransportRxTimer | ErrorSource::TransportTxTimer => Error::Timeout,
            ErrorSource::TransportRxBuffSize => Error::RxBufferSize,
            ErrorSource::TransportFwDataDisc => Error::FrameDiscontinuity,
            ErrorSource::TransportSend | ErrorSource::TransportSetKey => Error::Internal,
            ErrorSource::Auth | ErrorSource::Extcmd => Error::Internal,
        };
        events.err(err);
        if !matches!(err, Error::Internal) {
            self.send_err_notification();
        }
        if matches!(source, ErrorSource::TransportFwDataDisc) {
            events.ota_on_discontinue_err();
        }
    }

    fn send_err_notification(&mut self) {
        let mut wire = [0u8; crate::frame::HEADER_LEN];
        if crate::frame::encode(command::ERR, self.next_seq(), 0, 1, &[], &mut wire).is_ok() {
            let _ = self.ble.notify(&wire);
        }
    }

    fn on_rx_done(&mut self, cmd: u8, events: &mut impl EngineEvents) {
        if !command::is_valid_rx_command(cmd) {
            self.send_err_notification();
            let _ = self.transport.take_rx(&self.crypto);
            return;
        }

        let Ok((cmd, total_frames, payload)) = self.transport.take_rx(&self.crypto) else {
            events.err(Error::DataSize);
            self.send_err_notification();
            return;
        };

        // This order — app upward event, then Auth, then OTA classifier,
        // then Extcmd — is the concrete instantiation the source always
        // follows for every reassembled message, even ones Auth/Extcmd
        // have no interest in (§4.6 [EXPANDED]).
        let authed = self.is_authenticated();
        match cmd {
            command::CTRL if authed && !payload.is_empty() => events.rx_ctrl(&payload),
            command::QUERY if authed && !payload.is_empty() => events.rx_query(&payload),
            _ => {}
        }

        self.dispatch_auth(cmd, &payload, events);

        if authed {
            if let Some(info) = ota::classify_rx(cmd, total_frames, &payload) {
                events.ota_cmd(info);
            }
        }

        if authed && cmd == command::EXT_DOWN {
            match self.extcmd.on_ext_down(&payload) {
                Ok(ap) => events.apinfo(ap),
                Err(e) => events.err(e),
            }
        }
    }

    fn dispatch_auth(&mut self, cmd: u8, payload: &[u8], events: &mut impl EngineEvents) {
        match cmd {
            command::AUTH_REQ => {
                let nonce = self.auth.start(&mut self.os);
                self.send_auth_frame(command::AUTH_RAND, &nonce);
            }
            command::AUTH_CFM => {
                match self
                    .auth
                    .on_peer_cfm(&self.crypto, &self.os, self.config.auth_secret(), payload)
                {
                    Some(rsp) => self.send_auth_frame(command::AUTH_RSP, &rsp),
                    None => {
                        self.send_err_notification();
                        events.ota_on_auth_evt(false);
                        events.authenticated(false);
                        let _ = self.ble.disconnect(DisconnectReason::RemoteUserTermConn);
                    }
                }
            }
            _ => {}
        }
    }

    fn send_auth_frame(&mut self, cmd: u8, payload: &[u8]) {
        let seq = self.next_auth_seq();
        let _ = self
            .transport
            .tx(&self.os, &mut self.ble, &self.crypto, TxKind::Notification, cmd, seq, payload);
    }

    // ── Post API (§6) ────────────────────────────────────────────

    /// Send `payload` tagged as `cmd` via an acknowledged GATT indication.
    pub fn post(&mut self, cmd: u8, payload: &[u8]) -> Result<()> {
        self.post_internal(TxKind::Indication, cmd, payload)
    }

    /// Send `payload` tagged as `cmd` via an unacknowledged GATT
    /// notification.
    pub fn post_fast(&mut self, cmd: u8, payload: &[u8]) -> Result<()> {
        self.post_internal(TxKind::Notification, cmd, payload)
    }

    fn post_internal(&mut self, kind: TxKind, cmd: u8, payload: &[u8]) -> Result<()> {
        let cmd = if cmd == 0 { command::STATUS } else { cmd };
        if !command::is_valid_tx_command(cmd) {
            // Internal producer bug, not a wire fault: suppress the send
            // and report upward instead of returning it synchronously.
            return Err(Error::InvalidTxCommand);
        }
        if payload.is_empty() || payload.len() > crate::frame::MAX_PAYLOAD_SIZE {
            return Err(Error::DataSize);
        }
        let seq = self.next_seq();
        self.transport.tx(&self.os, &mut self.ble, &self.crypto, kind, cmd, seq, payload)
    }

    fn next_seq(&mut self) -> u8 {
        let seq = self.tx_seq;
        self.tx_seq = self.tx_seq.wrapping_add(1);
        seq
    }

    fn next_auth_seq(&mut self) -> u8 {
        let seq = self.auth_tx_seq;
        self.auth_tx_seq = self.auth_tx_seq.wrapping_add(1);
        seq
    }

    // ── Timer tick ───────────────────────────────────────────────

    /// Drive the RX/TX/auth timers and the adv-seq flush timer. The
    /// caller's OS HAL event loop should call this roughly on every
    /// timer tick (the engine itself owns no background timer).
    pub fn tick(&mut self, events: &mut impl EngineEvents) {
        let now = self.os.now_ms();

        if let Some(source) = self.transport.tick(now) {
            self.on_transport_error(source, events);
        }

        if self.auth.tick(now) {
            events.err(Error::Timeout);
            let _ = self.ble.disconnect(DisconnectReason::RemoteUserTermConn);
        }

        if now.saturating_sub(self.last_flush_ms) >= ADV_SEQ_FLUSH_INTERVAL_MS {
            self.kv.set(ADV_SEQ_KEY, &self.adv_seq.to_le_bytes());
            self.last_flush_ms = now;
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Best-effort teardown: returns the BLE HAL's real deinit status
    /// instead of unconditionally succeeding (§9 REDESIGN FLAG — the
    /// source's `breeze_end` always returned 0).
    pub fn shutdown(&mut self) -> Result<()> {
        self.ble.deinit()
    }
}
