//! Session-Handler – Connect, Attach, Disconnect, Heartbeat, Einstellungen
//!
//! Bindet beim Connect/Attach die Send-Queue der Verbindung an die Session,
//! damit der Coordinator Ereignisse an diesen Client zustellen kann.

use easyconnect_protocol::control::{
    AttachRequest, ConnectRequest, ControlMessage, ControlPayload, DisconnectRequest, ErrorCode,
    HeartbeatAck, HeartbeatRequest, VoiceSettingsRequest,
};

use crate::dispatcher::DispatcherContext;
use crate::handlers::fehler_antwort;
use crate::server_state::SignalingState;

fn bereits_gebunden(request_id: u32, ctx: &DispatcherContext) -> Option<ControlMessage> {
    ctx.gebunden.as_ref().map(|(identity, _)| {
        ControlMessage::error(
            request_id,
            ErrorCode::InvalidRequest,
            format!("Verbindung bereits an {identity} gebunden"),
        )
    })
}

/// Legt eine Session an und bindet die Verbindung daran
pub fn handle_connect(
    request: ConnectRequest,
    request_id: u32,
    ctx: &mut DispatcherContext,
    state: &SignalingState,
) -> ControlMessage {
    if let Some(fehler) = bereits_gebunden(request_id, ctx) {
        return fehler;
    }

    let kanal = ctx.kanal_erzeugen(&request.username);
    let kanal_id = kanal.kanal_id;
    let identity = request.username.clone();

    match state.coordinator.verbinden(
        request.username,
        request.client_id,
        request.room_id,
        Some(kanal),
    ) {
        Ok(antwort) => {
            ctx.gebunden = Some((identity, kanal_id));
            ControlMessage::new(request_id, ControlPayload::ConnectResponse(antwort))
        }
        Err(e) => {
            tracing::debug!(peer = %ctx.peer_addr, identity = %identity, fehler = %e, "Connect abgelehnt");
            fehler_antwort(request_id, &e)
        }
    }
}

/// Bindet die Verbindung an eine bestehende Session (z.B. per REST angelegt)
pub fn handle_attach(
    request: AttachRequest,
    request_id: u32,
    ctx: &mut DispatcherContext,
    state: &SignalingState,
) -> ControlMessage {
    if let Some(fehler) = bereits_gebunden(request_id, ctx) {
        return fehler;
    }

    let kanal = ctx.kanal_erzeugen(&request.username);
    let kanal_id = kanal.kanal_id;

    match state
        .coordinator
        .anbinden(&request.username, &request.client_id, kanal)
    {
        Ok(()) => {
            ctx.gebunden = Some((request.username, kanal_id));
            ControlMessage::ack(request_id)
        }
        Err(e) => fehler_antwort(request_id, &e),
    }
}

/// Trennt eine Session; trennt sich der eigene Client, wird die Bindung geloest
pub fn handle_disconnect(
    request: DisconnectRequest,
    request_id: u32,
    ctx: &mut DispatcherContext,
    state: &SignalingState,
) -> ControlMessage {
    match state
        .coordinator
        .trennen(request.username.as_ref(), request.client_id.as_ref())
    {
        Ok(antwort) => {
            if ctx
                .gebunden
                .as_ref()
                .is_some_and(|(identity, _)| identity == &antwort.disconnected_user)
            {
                ctx.gebunden = None;
            }
            ControlMessage::new(request_id, ControlPayload::DisconnectResponse(antwort))
        }
        Err(e) => fehler_antwort(request_id, &e),
    }
}

pub fn handle_heartbeat(
    request: HeartbeatRequest,
    request_id: u32,
    state: &SignalingState,
) -> ControlMessage {
    match state
        .coordinator
        .heartbeat(&request.username, request.client_id.as_ref())
    {
        Ok(timestamp) => ControlMessage::new(
            request_id,
            ControlPayload::HeartbeatAck(HeartbeatAck {
                username: request.username,
                timestamp,
            }),
        ),
        Err(e) => fehler_antwort(request_id, &e),
    }
}

pub fn handle_voice_settings(
    request: VoiceSettingsRequest,
    request_id: u32,
    state: &SignalingState,
) -> ControlMessage {
    match state
        .coordinator
        .einstellungen_aktualisieren(&request.username, &request.settings)
    {
        Ok(_) => ControlMessage::ack(request_id),
        Err(e) => fehler_antwort(request_id, &e),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
