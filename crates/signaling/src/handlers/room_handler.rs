//! Raum-Handler – Raumwechsel und Sprecher-Slot

use easyconnect_protocol::control::{
    ControlMessage, ControlPayload, JoinRoomRequest, SetSpeakerRequest,
};

use crate::handlers::fehler_antwort;
use crate::server_state::SignalingState;

/// Wechselt den Raum; die Antwort enthaelt Mitglieder und Chat-Verlauf
pub fn handle_join_room(
    request: JoinRoomRequest,
    request_id: u32,
    state: &SignalingState,
) -> ControlMessage {
    match state
        .coordinator
        .raum_beitreten(&request.username, request.room_id)
    {
        Ok(antwort) => ControlMessage::new(request_id, ControlPayload::JoinRoomResponse(antwort)),
        Err(e) => fehler_antwort(request_id, &e),
    }
}

/// Setzt (`speaking = true`) oder gibt den Sprecher-Slot im eigenen Raum frei
pub fn handle_set_speaker(
    request: SetSpeakerRequest,
    request_id: u32,
    state: &SignalingState,
) -> ControlMessage {
    match state
        .coordinator
        .sprecher_setzen(&request.username, request.speaking)
    {
        Ok(antwort) => ControlMessage::new(request_id, ControlPayload::SpeakerResponse(antwort)),
        Err(e) => fehler_antwort(request_id, &e),
    }
}
