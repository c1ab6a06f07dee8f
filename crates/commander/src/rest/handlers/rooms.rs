//! REST-Handler fuer Raeume und Sprecher

use axum::{extract::State, response::Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::CommanderResult;
use crate::rest::{identitaet, optionaler_raum, ApiState};

#[derive(Debug, Deserialize)]
pub struct JoinRoomBody {
    pub username: Option<String>,
    pub room_id: Option<String>,
}

/// POST /api/room/join – ohne `room_id` geht es zurueck in den Standard-Raum
pub async fn join_room(
    State(state): State<ApiState>,
    Json(body): Json<JoinRoomBody>,
) -> CommanderResult<Json<Value>> {
    let identity = identitaet(body.username.as_deref())?;
    let raum = optionaler_raum(body.room_id.as_deref())?;

    let antwort = state.coordinator.raum_beitreten(&identity, raum)?;

    Ok(Json(json!({
        "message": "Raum betreten",
        "room_id": antwort.room_id,
        "room_users": antwort.room_users,
        "recent_chat": antwort.recent_chat,
        "timestamp": chrono::Utc::now(),
    })))
}

#[derive(Debug, Deserialize)]
pub struct SpeakerBody {
    pub username: Option<String>,
    /// `false` gibt den Slot frei
    #[serde(default = "sprechen_standard")]
    pub speaking: bool,
}

fn sprechen_standard() -> bool {
    true
}

/// POST /api/speaker
pub async fn set_speaker(
    State(state): State<ApiState>,
    Json(body): Json<SpeakerBody>,
) -> CommanderResult<Json<Value>> {
    let identity = identitaet(body.username.as_deref())?;
    let antwort = state.coordinator.sprecher_setzen(&identity, body.speaking)?;

    Ok(Json(json!({
        "message": "Sprecher aktualisiert",
        "room_id": antwort.room_id,
        "current_speaker": antwort.current_speaker,
        "previous_speaker": antwort.previous_speaker,
        "timestamp": chrono::Utc::now(),
    })))
}

/// GET /api/rooms
pub async fn list_rooms(State(state): State<ApiState>) -> Json<Value> {
    let antwort = state.coordinator.raeume();
    Json(json!({
        "rooms": antwort.rooms,
        "total_rooms": antwort.total_rooms,
        "timestamp": chrono::Utc::now(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::handlers::testhilfe::api_state;
    use easyconnect_core::types::Identity;

    fn verbinden(state: &ApiState, name: &str) {
        state
            .coordinator
            .verbinden(Identity::neu(name).unwrap(), None, None, None)
            .unwrap();
    }

    #[tokio::test]
    async fn sprecher_wechsel_meldet_vorgaenger() {
        let (state, _) = api_state();
        verbinden(&state, "alice");
        verbinden(&state, "bob");

        let body = |name: &str| SpeakerBody {
            username: Some(name.into()),
            speaking: true,
        };
        set_speaker(State(state.clone()), Json(body("alice")))
            .await
            .unwrap();
        let Json(antwort) = set_speaker(State(state), Json(body("bob")))
            .await
            .unwrap();

        assert_eq!(antwort["current_speaker"], "bob");
        assert_eq!(antwort["previous_speaker"], "alice");
        assert_eq!(antwort["room_id"], "default");
    }

    #[tokio::test]
    async fn sprecher_fuer_unbekannten_client_ist_404() {
        let (state, _) = api_state();
        let fehler = set_speaker(
            State(state),
            Json(SpeakerBody {
                username: Some("ghost".into()),
                speaking: true,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(fehler.http_status(), 404);
    }

    #[tokio::test]
    async fn raumwechsel_und_raumliste() {
        let (state, _) = api_state();
        verbinden(&state, "alice");
        verbinden(&state, "bob");

        let Json(antwort) = join_room(
            State(state.clone()),
            Json(JoinRoomBody {
                username: Some("bob".into()),
                room_id: Some("lounge".into()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(antwort["room_users"], json!(["bob"]));

        let Json(raeume) = list_rooms(State(state)).await;
        assert_eq!(raeume["total_rooms"], 2);
        assert_eq!(raeume["rooms"]["lounge"]["user_count"], 1);
        assert_eq!(raeume["rooms"]["default"]["users"], json!(["alice"]));
    }
}
