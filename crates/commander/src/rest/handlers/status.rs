//! REST-Handler fuer Status- und Benutzerabfragen

use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::CommanderResult;
use crate::rest::{optionaler_raum, ApiState};

#[derive(Debug, Default, Deserialize)]
pub struct UsersQuery {
    pub room_id: Option<String>,
}

/// GET /api/users?room_id=
pub async fn list_users(
    State(state): State<ApiState>,
    Query(query): Query<UsersQuery>,
) -> CommanderResult<Json<Value>> {
    let raum = optionaler_raum(query.room_id.as_deref())?;
    let antwort = state.coordinator.benutzer(raum.as_ref());

    Ok(Json(json!({
        "users": antwort.users,
        "total_users": antwort.total_users,
        "timestamp": chrono::Utc::now(),
    })))
}

/// GET /api/status – entfernt vorher Sessions ohne aktuelles Lebenszeichen
pub async fn get_status(State(state): State<ApiState>) -> Json<Value> {
    let status = state.coordinator.status();
    Json(json!({
        "status": "running",
        "total_users": status.total_users,
        "total_rooms": status.total_rooms,
        "current_speakers": status.current_speakers,
        "server_time": status.server_time,
        "uptime_seconds": state.start_time.elapsed().as_secs(),
        "timestamp": chrono::Utc::now(),
    }))
}
