//! Axum HTTP-Server fuer den Commander

use std::net::SocketAddr;

use anyhow::Result;
use axum::http::{HeaderValue, Method};
use axum::middleware;
use axum::Router;
use easyconnect_observability::{
    health_router, metrics_router, request_timing_layer, timing_middleware, CoordinatorMetrics,
    HealthState,
};
use tokio::sync::watch;
use tower_http::cors::CorsLayer;

use crate::rest::{routes::api_router, ApiState};

/// REST-Server-Konfiguration
#[derive(Debug, Clone)]
pub struct RestServerKonfig {
    pub bind_addr: SocketAddr,
    /// Erlaubte CORS-Origins. Leer = alle Origins erlaubt.
    pub cors_origins: Vec<String>,
}

impl Default for RestServerKonfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            cors_origins: vec![],
        }
    }
}

/// Axum HTTP-Server fuer den Commander
pub struct RestServer {
    konfig: RestServerKonfig,
}

impl RestServer {
    pub fn neu(konfig: RestServerKonfig) -> Self {
        Self { konfig }
    }

    fn cors(&self) -> CorsLayer {
        if self.konfig.cors_origins.is_empty() {
            return CorsLayer::permissive();
        }
        let origins: Vec<HeaderValue> = self
            .konfig
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(tower_http::cors::Any)
    }

    /// Baut den kompletten Router: API, `/health` und optional `/metrics`
    pub fn router(
        &self,
        state: ApiState,
        health: HealthState,
        metriken: Option<CoordinatorMetrics>,
    ) -> Router {
        let mut app = api_router().with_state(state).merge(health_router(health));

        if let Some(metriken) = metriken {
            app = app
                .merge(metrics_router(metriken.clone()))
                .layer(middleware::from_fn_with_state(metriken, timing_middleware));
        }

        app.layer(request_timing_layer()).layer(self.cors())
    }

    /// Startet den REST-Server; endet beim Shutdown-Signal
    pub async fn starten(
        self,
        state: ApiState,
        health: HealthState,
        metriken: Option<CoordinatorMetrics>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> Result<()> {
        let app = self.router(state, health, metriken);

        let listener = tokio::net::TcpListener::bind(self.konfig.bind_addr).await?;
        tracing::info!(addr = %self.konfig.bind_addr, "REST-Server gestartet");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.wait_for(|stop| *stop).await;
            })
            .await?;

        tracing::info!("REST-Server gestoppt");
        Ok(())
    }
}
