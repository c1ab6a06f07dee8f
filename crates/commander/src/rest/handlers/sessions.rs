//! REST-Handler fuer Session-Endpunkte

use axum::{extract::State, response::Json};
use easyconnect_core::types::AudioQualitaet;
use easyconnect_protocol::control::SettingsUpdate;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{CommanderError, CommanderResult};
use crate::rest::{identitaet, optionale_identitaet, optionaler_raum, optionaler_token, ApiState};

/// GET / – API-Uebersicht
pub async fn api_info() -> Json<Value> {
    Json(json!({
        "message": "EasyConnect Server API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "POST /api/connect": "Client verbinden",
            "POST /api/disconnect": "Client trennen",
            "POST /api/heartbeat": "Lebenszeichen senden",
            "POST /api/settings": "Einstellungen aendern",
            "POST /api/room/join": "Raum wechseln",
            "POST /api/speaker": "Sprecher setzen",
            "GET /api/users": "Verbundene Clients",
            "GET /api/rooms": "Aktive Raeume",
            "GET /api/status": "Serverstatus",
        }
    }))
}

#[derive(Debug, Deserialize)]
pub struct ConnectBody {
    pub username: Option<String>,
    pub client_id: Option<String>,
    pub room_id: Option<String>,
}

/// POST /api/connect
pub async fn connect(
    State(state): State<ApiState>,
    Json(body): Json<ConnectBody>,
) -> CommanderResult<Json<Value>> {
    let identity = identitaet(body.username.as_deref())?;
    let token = optionaler_token(body.client_id.as_deref())?;
    let raum = optionaler_raum(body.room_id.as_deref())?;

    let antwort = state.coordinator.verbinden(identity, token, raum, None)?;

    Ok(Json(json!({
        "message": "Erfolgreich verbunden",
        "client_id": antwort.client_id,
        "room_id": antwort.room_id,
        "connected_users": antwort.connected_users,
        "room_users": antwort.room_users,
        "recent_chat": antwort.recent_chat,
        "timestamp": chrono::Utc::now(),
    })))
}

#[derive(Debug, Deserialize)]
pub struct DisconnectBody {
    pub username: Option<String>,
    pub client_id: Option<String>,
}

/// POST /api/disconnect
pub async fn disconnect(
    State(state): State<ApiState>,
    Json(body): Json<DisconnectBody>,
) -> CommanderResult<Json<Value>> {
    let identity = optionale_identitaet(body.username.as_deref())?;
    let token = optionaler_token(body.client_id.as_deref())?;

    let antwort = state
        .coordinator
        .trennen(identity.as_ref(), token.as_ref())?;

    Ok(Json(json!({
        "message": "Erfolgreich getrennt",
        "disconnected_user": antwort.disconnected_user,
        "remaining_users": antwort.remaining_users,
        "timestamp": chrono::Utc::now(),
    })))
}

#[derive(Debug, Deserialize)]
pub struct HeartbeatBody {
    pub username: Option<String>,
    pub client_id: Option<String>,
}

/// POST /api/heartbeat
pub async fn heartbeat(
    State(state): State<ApiState>,
    Json(body): Json<HeartbeatBody>,
) -> CommanderResult<Json<Value>> {
    let identity = identitaet(body.username.as_deref())?;
    let token = optionaler_token(body.client_id.as_deref())?;

    let gesehen = state.coordinator.heartbeat(&identity, token.as_ref())?;

    Ok(Json(json!({
        "message": "Heartbeat aktualisiert",
        "username": identity,
        "timestamp": gesehen,
    })))
}

#[derive(Debug, Deserialize)]
pub struct SettingsBody {
    pub username: Option<String>,
    pub volume: Option<f32>,
    pub audio_quality: Option<String>,
    pub is_muted: Option<bool>,
}

/// POST /api/settings
pub async fn settings(
    State(state): State<ApiState>,
    Json(body): Json<SettingsBody>,
) -> CommanderResult<Json<Value>> {
    let identity = identitaet(body.username.as_deref())?;
    let audio_quality = body
        .audio_quality
        .as_deref()
        .map(str::parse::<AudioQualitaet>)
        .transpose()
        .map_err(CommanderError::from)?;

    let aenderung = SettingsUpdate {
        volume: body.volume,
        audio_quality,
        is_muted: body.is_muted,
    };
    let session = state
        .coordinator
        .einstellungen_aktualisieren(&identity, &aenderung)?;

    Ok(Json(json!({
        "message": "Einstellungen aktualisiert",
        "user": session,
        "timestamp": chrono::Utc::now(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::handlers::testhilfe::api_state;

    fn connect_body(name: &str) -> ConnectBody {
        ConnectBody {
            username: Some(name.into()),
            client_id: None,
            room_id: None,
        }
    }

    #[tokio::test]
    async fn connect_liefert_token_und_benutzerliste() {
        let (state, _) = api_state();
        let Json(antwort) = connect(State(state.clone()), Json(connect_body("alice")))
            .await
            .unwrap();

        assert_eq!(antwort["room_id"], "default");
        assert_eq!(antwort["connected_users"], json!(["alice"]));
        assert!(!antwort["client_id"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn connect_ohne_benutzername_ist_400() {
        let (state, _) = api_state();
        let fehler = connect(
            State(state),
            Json(ConnectBody {
                username: Some("  ".into()),
                client_id: None,
                room_id: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(fehler.http_status(), 400);
    }

    #[tokio::test]
    async fn doppelter_connect_ist_409() {
        let (state, _) = api_state();
        connect(State(state.clone()), Json(connect_body("alice")))
            .await
            .unwrap();
        let fehler = connect(State(state), Json(connect_body("alice")))
            .await
            .unwrap_err();
        assert_eq!(fehler.http_status(), 409);
    }

    #[tokio::test]
    async fn disconnect_per_token() {
        let (state, _) = api_state();
        let Json(verbunden) = connect(
            State(state.clone()),
            Json(ConnectBody {
                username: Some("alice".into()),
                client_id: Some("token-1".into()),
                room_id: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(verbunden["client_id"], "token-1");

        let Json(antwort) = disconnect(
            State(state),
            Json(DisconnectBody {
                username: None,
                client_id: Some("token-1".into()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(antwort["disconnected_user"], "alice");
        assert_eq!(antwort["remaining_users"], json!([]));
    }

    #[tokio::test]
    async fn disconnect_ohne_angaben_und_unbekannt() {
        let (state, _) = api_state();
        let leer = disconnect(
            State(state.clone()),
            Json(DisconnectBody {
                username: None,
                client_id: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(leer.http_status(), 400);

        let unbekannt = disconnect(
            State(state),
            Json(DisconnectBody {
                username: Some("ghost".into()),
                client_id: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(unbekannt.http_status(), 404);
    }

    #[tokio::test]
    async fn heartbeat_fuer_unbekannten_client_ist_404() {
        let (state, _) = api_state();
        let fehler = heartbeat(
            State(state),
            Json(HeartbeatBody {
                username: Some("ghost".into()),
                client_id: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(fehler.http_status(), 404);
    }

    #[tokio::test]
    async fn einstellungen_aendern() {
        let (state, _) = api_state();
        connect(State(state.clone()), Json(connect_body("alice")))
            .await
            .unwrap();

        let Json(antwort) = settings(
            State(state.clone()),
            Json(SettingsBody {
                username: Some("alice".into()),
                volume: Some(0.5),
                audio_quality: Some("low".into()),
                is_muted: Some(true),
            }),
        )
        .await
        .unwrap();
        assert_eq!(antwort["user"]["audio_quality"], "low");
        assert_eq!(antwort["user"]["is_muted"], true);

        let fehler = settings(
            State(state),
            Json(SettingsBody {
                username: Some("alice".into()),
                volume: None,
                audio_quality: Some("ultra".into()),
                is_muted: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(fehler.http_status(), 400);
    }
}
