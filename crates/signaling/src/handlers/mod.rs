//! Handler fuer alle Nachrichten des Ereigniskanals
//!
//! Jeder Handler ist fuer eine Nachrichtengruppe zustaendig und hat Zugriff
//! auf den gemeinsamen SignalingState.

pub mod media_handler;
pub mod query_handler;
pub mod room_handler;
pub mod session_handler;

use easyconnect_protocol::control::ControlMessage;

use crate::error::SignalingError;

/// Baut die Fehler-Antwort zu einem Coordinator-Fehler
pub(crate) fn fehler_antwort(request_id: u32, fehler: &SignalingError) -> ControlMessage {
    ControlMessage::error(request_id, fehler.fehler_code(), fehler.to_string())
}
