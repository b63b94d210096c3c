//! Internal event types shared by the Transport, Auth, and Extcmd state
//! machines, plus the subsystem tag the core dispatcher registers each of
//! them under.
//!
//! Each subsystem exposes a distinct `on_*` entry point rather than a
//! shared `handle(tag, event)` dispatch, so no handler ever re-checks a
//! tag it was already routed under (§9 REDESIGN FLAG: one handler per
//! tag).

/// Identifies which subsystem raised an [`ErrorSource`]-tagged error, for
/// upward `ERR{source, err_code}` reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSource {
    TransportRxTimer,
    TransportTxTimer,
    TransportRxBuffSize,
    TransportFwDataDisc,
    TransportSend,
    TransportSetKey,
    Auth,
    Extcmd,
}
