//! Route-Definitionen fuer die REST-API (/api/...)

use axum::{
    routing::{get, post},
    Router,
};

use crate::rest::{handlers, ApiState};

/// Erstellt den vollstaendigen API-Router
pub fn api_router() -> Router<ApiState> {
    Router::new()
        .route("/", get(handlers::sessions::api_info))
        // Sessions
        .route("/api/connect", post(handlers::sessions::connect))
        .route("/api/disconnect", post(handlers::sessions::disconnect))
        .route("/api/heartbeat", post(handlers::sessions::heartbeat))
        .route("/api/settings", post(handlers::sessions::settings))
        // Raeume
        .route("/api/room/join", post(handlers::rooms::join_room))
        .route("/api/speaker", post(handlers::rooms::set_speaker))
        .route("/api/rooms", get(handlers::rooms::list_rooms))
        // Abfragen
        .route("/api/users", get(handlers::status::list_users))
        .route("/api/status", get(handlers::status::get_status))
}
