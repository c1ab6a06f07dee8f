//! Health-Check-Endpunkt fuer EasyConnect
//!
//! Endpoint: `GET /health`
//! Response: JSON mit Status, Version, Uptime und aktuellem Bestand

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Status des Health-Checks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

/// Vom Coordinator gelieferte Kennzahlen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HealthKennzahlen {
    pub connected_users: usize,
    pub voice_rooms: usize,
    pub max_clients: usize,
}

impl HealthKennzahlen {
    /// Degraded sobald das Client-Limit erreicht ist
    pub fn status(&self) -> HealthStatus {
        if self.max_clients > 0 && self.connected_users >= self.max_clients {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}

/// Antwort des Health-Check-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub connected_users: usize,
    pub voice_rooms: usize,
    pub timestamp: DateTime<Utc>,
}

type KennzahlenQuelle = Arc<dyn Fn() -> HealthKennzahlen + Send + Sync>;

/// Geteilter Zustand fuer den Health-Check-Handler
#[derive(Clone)]
pub struct HealthState {
    pub start_time: Arc<Instant>,
    quelle: KennzahlenQuelle,
}

impl HealthState {
    /// Erstellt den Zustand mit einer Abfragefunktion fuer die Kennzahlen
    pub fn neu<F>(quelle: F) -> Self
    where
        F: Fn() -> HealthKennzahlen + Send + Sync + 'static,
    {
        Self {
            start_time: Arc::new(Instant::now()),
            quelle: Arc::new(quelle),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn kennzahlen(&self) -> HealthKennzahlen {
        (self.quelle)()
    }

    /// Baut die aktuelle Antwort
    pub fn antwort(&self) -> HealthResponse {
        let kennzahlen = self.kennzahlen();
        HealthResponse {
            status: kennzahlen.status(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.uptime_seconds(),
            connected_users: kennzahlen.connected_users,
            voice_rooms: kennzahlen.voice_rooms,
            timestamp: Utc::now(),
        }
    }
}

/// Axum-Router fuer den `/health`-Endpunkt
pub fn health_router<S>(state: HealthState) -> Router<S> {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

/// `GET /health` – gibt den Serverstatus zurueck
async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    // 200 auch bei degraded (Health-Check des Orchestrators soll nicht scheitern)
    (StatusCode::OK, Json(state.antwort()))
}
