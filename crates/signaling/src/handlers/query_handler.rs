//! Abfrage-Handler – Status, Benutzer und Raeume

use easyconnect_protocol::control::{ControlMessage, ControlPayload, QueryUsersRequest};

use crate::server_state::SignalingState;

/// Status; wendet vorher die kurze Liveness-Schwelle an
pub fn handle_query_status(request_id: u32, state: &SignalingState) -> ControlMessage {
    ControlMessage::new(
        request_id,
        ControlPayload::StatusResponse(state.coordinator.status()),
    )
}

pub fn handle_query_users(
    request: QueryUsersRequest,
    request_id: u32,
    state: &SignalingState,
) -> ControlMessage {
    ControlMessage::new(
        request_id,
        ControlPayload::UsersResponse(state.coordinator.benutzer(request.room_id.as_ref())),
    )
}

pub fn handle_query_rooms(request_id: u32, state: &SignalingState) -> ControlMessage {
    ControlMessage::new(
        request_id,
        ControlPayload::RoomsResponse(state.coordinator.raeume()),
    )
}
