//! Message-Dispatcher – Routet ControlMessages an die richtigen Handler
//!
//! Der Dispatcher empfaengt ControlMessages von einer ClientConnection,
//! bestimmt den richtigen Handler und gibt die Antwort zurueck.
//!
//! ## Bindung
//! Eine Verbindung wird per `connect` oder `attach` an genau eine Session
//! gebunden. Ab dann stellt der Coordinator Ereignisse fuer diese Session
//! ueber die Send-Queue der Verbindung zu.

use easyconnect_core::types::Identity;
use easyconnect_protocol::control::{ControlMessage, ControlPayload, ErrorCode};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::broadcast::ClientSender;
use crate::handlers::{media_handler, query_handler, room_handler, session_handler};
use crate::server_state::SignalingState;

/// Dispatcher-Kontext – Informationen ueber die aktuelle Verbindung
pub struct DispatcherContext {
    pub peer_addr: SocketAddr,
    /// Send-Queue der Verbindung (Coordinator -> Client)
    pub sende_tx: mpsc::Sender<ControlMessage>,
    /// Gebundene Session samt Kanal-ID (None vor connect/attach)
    pub gebunden: Option<(Identity, u64)>,
}

impl DispatcherContext {
    pub fn neu(peer_addr: SocketAddr, sende_tx: mpsc::Sender<ControlMessage>) -> Self {
        Self {
            peer_addr,
            sende_tx,
            gebunden: None,
        }
    }

    /// Erzeugt einen Ereigniskanal auf die Send-Queue dieser Verbindung
    pub fn kanal_erzeugen(&self, identity: &Identity) -> ClientSender {
        ClientSender::neu(identity.clone(), self.sende_tx.clone())
    }
}

/// Zentraler Message-Dispatcher
///
/// Alle Coordinator-Operationen sind synchron; `dispatch` blockiert nur fuer
/// die Dauer einer Zustandsaenderung samt Zustellung in die Queues.
pub struct MessageDispatcher {
    state: Arc<SignalingState>,
}

impl MessageDispatcher {
    pub fn neu(state: Arc<SignalingState>) -> Self {
        Self { state }
    }

    /// Verarbeitet eine eingehende ControlMessage und gibt die Antwort zurueck
    ///
    /// Gibt `None` zurueck wenn keine Antwort gesendet werden soll
    /// (Pong, Voice- und Video-Ereignisse).
    pub fn dispatch(
        &self,
        message: ControlMessage,
        ctx: &mut DispatcherContext,
    ) -> Option<ControlMessage> {
        let request_id = message.request_id;
        let state = self.state.as_ref();

        match message.payload {
            // -------------------------------------------------------------------
            // Session
            // -------------------------------------------------------------------
            ControlPayload::Connect(req) => Some(session_handler::handle_connect(
                req, request_id, ctx, state,
            )),
            ControlPayload::Attach(req) => Some(session_handler::handle_attach(
                req, request_id, ctx, state,
            )),
            ControlPayload::Disconnect(req) => Some(session_handler::handle_disconnect(
                req, request_id, ctx, state,
            )),
            ControlPayload::Heartbeat(req) => {
                Some(session_handler::handle_heartbeat(req, request_id, state))
            }
            ControlPayload::VoiceSettings(req) => {
                Some(session_handler::handle_voice_settings(req, request_id, state))
            }

            // -------------------------------------------------------------------
            // Raum
            // -------------------------------------------------------------------
            ControlPayload::JoinRoom(req) => {
                Some(room_handler::handle_join_room(req, request_id, state))
            }
            ControlPayload::SetSpeaker(req) => {
                Some(room_handler::handle_set_speaker(req, request_id, state))
            }

            // -------------------------------------------------------------------
            // Ereignisse
            // -------------------------------------------------------------------
            ControlPayload::Voice(ev) => media_handler::handle_voice(ev, state),
            ControlPayload::Video(ev) => media_handler::handle_video(ev, state),
            ControlPayload::Chat(ev) => Some(media_handler::handle_chat(ev, request_id, state)),
            ControlPayload::File(ev) => Some(media_handler::handle_file(ev, request_id, state)),

            // -------------------------------------------------------------------
            // Abfragen
            // -------------------------------------------------------------------
            ControlPayload::QueryStatus => {
                Some(query_handler::handle_query_status(request_id, state))
            }
            ControlPayload::QueryUsers(req) => {
                Some(query_handler::handle_query_users(req, request_id, state))
            }
            ControlPayload::QueryRooms => {
                Some(query_handler::handle_query_rooms(request_id, state))
            }

            // -------------------------------------------------------------------
            // Keepalive
            // -------------------------------------------------------------------
            ControlPayload::Ping(ping) => {
                let server_ts = chrono::Utc::now().timestamp_millis().max(0) as u64;
                Some(ControlMessage::pong(request_id, ping.timestamp_ms, server_ts))
            }

            ControlPayload::Pong(_) => {
                tracing::trace!("Pong empfangen (RTT-Messung)");
                None
            }

            // -------------------------------------------------------------------
            // Unerwartete Nachrichten
            // -------------------------------------------------------------------
            ControlPayload::ConnectResponse(_)
            | ControlPayload::DisconnectResponse(_)
            | ControlPayload::HeartbeatAck(_)
            | ControlPayload::JoinRoomResponse(_)
            | ControlPayload::SpeakerResponse(_)
            | ControlPayload::PresenceJoined(_)
            | ControlPayload::PresenceLeft(_)
            | ControlPayload::SpeakerChanged(_)
            | ControlPayload::ChatMessage(_)
            | ControlPayload::FileShared(_)
            | ControlPayload::VoiceData(_)
            | ControlPayload::VideoData(_)
            | ControlPayload::StatusResponse(_)
            | ControlPayload::UsersResponse(_)
            | ControlPayload::RoomsResponse(_)
            | ControlPayload::Ack
            | ControlPayload::Error(_) => {
                tracing::warn!(
                    request_id,
                    peer = %ctx.peer_addr,
                    "Unerwartete Server->Client Nachricht vom Client empfangen"
                );
                Some(ControlMessage::error(
                    request_id,
                    ErrorCode::InvalidRequest,
                    "Unerwartete Nachricht",
                ))
            }
        }
    }

    /// Loest die Bindung beim Ende der Verbindung
    ///
    /// Die Session selbst bleibt bestehen, bis sie getrennt oder vom
    /// Liveness-Sweeper entfernt wird.
    pub fn verbindung_beendet(&self, ctx: &DispatcherContext) {
        if let Some((identity, kanal_id)) = &ctx.gebunden {
            if self.state.coordinator.kanal_loesen(identity, *kanal_id) {
                tracing::debug!(identity = %identity, "Ereigniskanal geloest");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
