//! Control-Protokoll (TCP)
//!
//! Definiert alle Nachrichten die ueber den Ereignis-Kanal zwischen Client
//! und Coordinator ausgetauscht werden.
//!
//! ## Design
//! - Request/Response Pattern: jede Nachricht hat eine `request_id: u32`
//! - Ereignisse an Empfaenger (Presence, Chat, Voice, ...) tragen `request_id = 0`
//! - JSON-Serialisierung via serde, Feldnamen wie in der HTTP-API
//!   (`username`, `client_id`, `room_id`)
//! - Medien-Payloads sind Base64-Strings und werden nicht interpretiert

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use easyconnect_core::types::{AudioQualitaet, ClientToken, Identity, RoomId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Fehler-Codes
// ---------------------------------------------------------------------------

/// Standardisierte Fehler-Codes fuer Error-Responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InternalError,
    InvalidRequest,
    IdentityTaken,
    NotConnected,
    NotFound,
    MalformedEvent,
    ServerFull,
}

// ---------------------------------------------------------------------------
// Session-Nachrichten
// ---------------------------------------------------------------------------

/// Verbindungsanfrage (legt eine Session an)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectRequest {
    pub username: Identity,
    /// Ohne Angabe erzeugt der Coordinator einen Token
    #[serde(default)]
    pub client_id: Option<ClientToken>,
    /// Ohne Angabe: Standard-Raum
    #[serde(default)]
    pub room_id: Option<RoomId>,
}

/// Antwort auf eine erfolgreiche Verbindung
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectResponse {
    pub client_id: ClientToken,
    pub room_id: RoomId,
    /// Alle verbundenen Identitaeten
    pub connected_users: Vec<Identity>,
    /// Mitglieder des Ziel-Raums
    pub room_users: Vec<Identity>,
    /// Letzte Chat-Nachrichten des Raums (aelteste zuerst)
    pub recent_chat: Vec<ChatMessage>,
}

/// Bindet den Ereignis-Kanal an eine bestehende Session (z.B. per REST angelegt)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachRequest {
    pub username: Identity,
    pub client_id: ClientToken,
}

/// Trennt eine Session ueber Identitaet oder Token
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisconnectRequest {
    #[serde(default)]
    pub username: Option<Identity>,
    #[serde(default)]
    pub client_id: Option<ClientToken>,
}

/// Bestaetigung der Trennung
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisconnectResponse {
    pub disconnected_user: Identity,
    pub remaining_users: Vec<Identity>,
}

/// Lebenszeichen eines Clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    pub username: Identity,
    #[serde(default)]
    pub client_id: Option<ClientToken>,
}

/// Bestaetigung eines Heartbeats
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatAck {
    pub username: Identity,
    pub timestamp: DateTime<Utc>,
}

/// Teil-Aktualisierung der Client-Einstellungen (nur gesetzte Felder aendern sich)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    #[serde(default)]
    pub volume: Option<f32>,
    #[serde(default)]
    pub audio_quality: Option<AudioQualitaet>,
    #[serde(default)]
    pub is_muted: Option<bool>,
}

/// Einstellungs-Aenderung eines Clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceSettingsRequest {
    pub username: Identity,
    #[serde(default)]
    pub settings: SettingsUpdate,
}

// ---------------------------------------------------------------------------
// Raum-Nachrichten
// ---------------------------------------------------------------------------

/// Raumwechsel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRoomRequest {
    pub username: Identity,
    #[serde(default)]
    pub room_id: Option<RoomId>,
}

/// Bestaetigung des Raumwechsels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRoomResponse {
    pub room_id: RoomId,
    pub room_users: Vec<Identity>,
    pub recent_chat: Vec<ChatMessage>,
}

/// Sprecher explizit setzen oder freigeben
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetSpeakerRequest {
    pub username: Identity,
    #[serde(default = "standard_true")]
    pub speaking: bool,
}

fn standard_true() -> bool {
    true
}

/// Ergebnis einer Sprecher-Anfrage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakerResponse {
    pub room_id: RoomId,
    pub current_speaker: Option<Identity>,
    pub previous_speaker: Option<Identity>,
}

// ---------------------------------------------------------------------------
// Medien- und Chat-Ereignisse (Client -> Coordinator)
// ---------------------------------------------------------------------------

/// Voice-Daten mit Sprech-Status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceEvent {
    pub username: Identity,
    pub room_id: RoomId,
    #[serde(default)]
    pub is_speaking: bool,
    /// Base64-kodierte Audiodaten
    #[serde(default)]
    pub audio_data: Option<String>,
}

/// Text-Nachricht
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatEvent {
    pub username: Identity,
    pub room_id: RoomId,
    pub text: String,
}

/// Datei-Versand
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEvent {
    pub username: Identity,
    pub room_id: RoomId,
    pub filename: String,
    /// Base64-kodierter Dateiinhalt
    pub payload: String,
}

/// Video-Frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoEvent {
    pub username: Identity,
    pub room_id: RoomId,
    /// Base64-kodierte Videodaten
    pub payload: String,
}

// ---------------------------------------------------------------------------
// Ereignisse (Coordinator -> Empfaenger)
// ---------------------------------------------------------------------------

/// Presence-Ereignis (Beitritt oder Austritt)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceInfo {
    pub room_id: RoomId,
    pub username: Identity,
}

/// Sprecher-Wechsel in einem Raum (`None` = niemand spricht)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerChanged {
    pub room_id: RoomId,
    pub username: Option<Identity>,
}

/// Chat-Nachricht wie sie verteilt und im Verlauf gehalten wird
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub room_id: RoomId,
    pub username: Identity,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Verteilte Datei
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileShared {
    pub username: Identity,
    pub filename: String,
    pub payload: String,
}

/// Verteilte Voice-Daten
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceData {
    pub username: Identity,
    pub audio_data: Option<String>,
    pub is_speaking: bool,
    pub timestamp: DateTime<Utc>,
}

/// Verteilte Video-Daten
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoData {
    pub username: Identity,
    pub payload: String,
}

// ---------------------------------------------------------------------------
// Status-Abfragen
// ---------------------------------------------------------------------------

/// Abfrage der Sessions (optional auf einen Raum beschraenkt)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryUsersRequest {
    #[serde(default)]
    pub room_id: Option<RoomId>,
}

/// Oeffentliche Sicht auf eine Session (ohne Token)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub username: Identity,
    pub room_id: RoomId,
    pub connected_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
    pub is_speaking: bool,
    pub is_muted: bool,
    pub volume: f32,
    pub audio_quality: AudioQualitaet,
}

/// Liste der Sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsersResponse {
    pub users: Vec<SessionInfo>,
    pub total_users: usize,
}

/// Server-Status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub total_users: usize,
    pub total_rooms: usize,
    /// Aktueller Sprecher je Raum
    pub current_speakers: BTreeMap<RoomId, Option<Identity>>,
    pub server_time: DateTime<Utc>,
}

/// Mitglieder eines Raums
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomInfo {
    pub users: Vec<Identity>,
    pub user_count: usize,
}

/// Alle Raeume
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomsResponse {
    pub rooms: BTreeMap<RoomId, RoomInfo>,
    pub total_rooms: usize,
}

// ---------------------------------------------------------------------------
// Keepalive
// ---------------------------------------------------------------------------

/// Ping (Client -> Server oder Server -> Client)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingMessage {
    /// Unix-Timestamp in Millisekunden fuer RTT-Messung
    pub timestamp_ms: u64,
}

/// Pong-Antwort (spiegelt Timestamp zurueck)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PongMessage {
    pub echo_timestamp_ms: u64,
    pub server_timestamp_ms: u64,
}

// ---------------------------------------------------------------------------
// Haupt-Enum
// ---------------------------------------------------------------------------

/// Alle moeglichen Control-Nachrichten (typsicher via Tagged Enum)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlPayload {
    // Session
    Connect(ConnectRequest),
    ConnectResponse(ConnectResponse),
    Attach(AttachRequest),
    Disconnect(DisconnectRequest),
    DisconnectResponse(DisconnectResponse),
    Heartbeat(HeartbeatRequest),
    HeartbeatAck(HeartbeatAck),
    VoiceSettings(VoiceSettingsRequest),

    // Raum
    JoinRoom(JoinRoomRequest),
    JoinRoomResponse(JoinRoomResponse),
    SetSpeaker(SetSpeakerRequest),
    SpeakerResponse(SpeakerResponse),

    // Client -> Coordinator Ereignisse
    Voice(VoiceEvent),
    Chat(ChatEvent),
    File(FileEvent),
    Video(VideoEvent),

    // Coordinator -> Empfaenger Ereignisse
    PresenceJoined(PresenceInfo),
    PresenceLeft(PresenceInfo),
    SpeakerChanged(SpeakerChanged),
    ChatMessage(ChatMessage),
    FileShared(FileShared),
    VoiceData(VoiceData),
    VideoData(VideoData),

    // Abfragen
    QueryStatus,
    StatusResponse(StatusResponse),
    QueryUsers(QueryUsersRequest),
    UsersResponse(UsersResponse),
    QueryRooms,
    RoomsResponse(RoomsResponse),

    // Keepalive
    Ping(PingMessage),
    Pong(PongMessage),

    // Allgemeine Bestaetigung
    Ack,

    // Error
    Error(ErrorResponse),
}

/// Standardisierte Fehler-Antwort
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Control-Frame (Umschlag fuer alle Nachrichten)
// ---------------------------------------------------------------------------

/// Control-Protokoll-Nachricht mit Request/Response-Zuordnung
///
/// Jede Anfrage traegt eine `request_id` die der Client vergibt.
/// Der Coordinator kopiert die ID in die Antwort. Ereignisse ohne
/// zugehoerige Anfrage tragen die ID 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlMessage {
    pub request_id: u32,
    pub payload: ControlPayload,
}

impl ControlMessage {
    /// Erstellt eine neue Control-Nachricht
    pub fn new(request_id: u32, payload: ControlPayload) -> Self {
        Self {
            request_id,
            payload,
        }
    }

    /// Erstellt ein Ereignis ohne Request-Zuordnung
    pub fn ereignis(payload: ControlPayload) -> Self {
        Self::new(0, payload)
    }

    /// Erstellt eine Ping-Nachricht
    pub fn ping(request_id: u32, timestamp_ms: u64) -> Self {
        Self::new(
            request_id,
            ControlPayload::Ping(PingMessage { timestamp_ms }),
        )
    }

    /// Erstellt eine Pong-Antwort
    pub fn pong(request_id: u32, echo_timestamp_ms: u64, server_timestamp_ms: u64) -> Self {
        Self::new(
            request_id,
            ControlPayload::Pong(PongMessage {
                echo_timestamp_ms,
                server_timestamp_ms,
            }),
        )
    }

    /// Erstellt eine Bestaetigung
    pub fn ack(request_id: u32) -> Self {
        Self::new(request_id, ControlPayload::Ack)
    }

    /// Erstellt eine Fehler-Antwort
    pub fn error(request_id: u32, code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(
            request_id,
            ControlPayload::Error(ErrorResponse {
                code,
                message: message.into(),
            }),
        )
    }

    /// Serialisiert die Nachricht als JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialisiert eine Nachricht aus JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
