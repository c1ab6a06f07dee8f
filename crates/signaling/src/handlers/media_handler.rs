//! Medien-Handler – Voice, Video, Chat und Dateien
//!
//! Voice und Video sind fire-and-forget: der Absender bekommt weder Ack noch
//! Fehler zurueck. Chat und Datei werden mit Ack bzw. Error beantwortet.

use easyconnect_protocol::control::{ChatEvent, ControlMessage, FileEvent, VideoEvent, VoiceEvent};

use crate::handlers::fehler_antwort;
use crate::server_state::SignalingState;

pub fn handle_voice(ereignis: VoiceEvent, state: &SignalingState) -> Option<ControlMessage> {
    let identity = ereignis.username.clone();
    if let Err(e) = state.coordinator.voice_ereignis(ereignis) {
        tracing::debug!(identity = %identity, fehler = %e, "Voice-Ereignis verworfen");
    }
    None
}

pub fn handle_video(ereignis: VideoEvent, state: &SignalingState) -> Option<ControlMessage> {
    let identity = ereignis.username.clone();
    if let Err(e) = state.coordinator.video_ereignis(ereignis) {
        tracing::debug!(identity = %identity, fehler = %e, "Video-Ereignis verworfen");
    }
    None
}

/// Chat-Nachricht; die Verteilung (inkl. Echo) laeuft ueber die Queue
pub fn handle_chat(ereignis: ChatEvent, request_id: u32, state: &SignalingState) -> ControlMessage {
    match state.coordinator.chat_ereignis(ereignis) {
        Ok(_) => ControlMessage::ack(request_id),
        Err(e) => fehler_antwort(request_id, &e),
    }
}

pub fn handle_file(ereignis: FileEvent, request_id: u32, state: &SignalingState) -> ControlMessage {
    match state.coordinator.datei_ereignis(ereignis) {
        Ok(()) => ControlMessage::ack(request_id),
        Err(e) => fehler_antwort(request_id, &e),
    }
}
