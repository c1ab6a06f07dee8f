//! Prometheus-kompatible Metriken fuer EasyConnect
//!
//! Registrierte Metriken:
//! - `easyconnect_sessions_connected` – Gauge: Aktuell verbundene Sessions
//! - `easyconnect_rooms_active` – Gauge: Raeume mit mindestens einem Mitglied
//! - `easyconnect_sessions_evicted_total` – Counter: Vom Sweeper entfernte Sessions
//! - `easyconnect_events_relayed_total` – Counter: Verteilte Ereignisse (kind)
//! - `easyconnect_deliveries_failed_total` – Counter: Fehlgeschlagene Zustellungen
//! - `easyconnect_http_requests_total` – Counter: HTTP-Anfragen (method, path, status)
//! - `easyconnect_http_request_duration_seconds` – Histogram: HTTP-Antwortzeit

use anyhow::Result;
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Alle Coordinator-Metriken. Clone teilt die Registry.
#[derive(Clone)]
pub struct CoordinatorMetrics {
    pub registry: Arc<Registry>,

    // Coordinator
    pub sessions_connected: IntGauge,
    pub rooms_active: IntGauge,
    pub sessions_evicted_total: IntCounter,
    pub events_relayed_total: IntCounterVec,
    pub deliveries_failed_total: IntCounter,

    // HTTP
    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,
}

impl CoordinatorMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        let sessions_connected = IntGauge::with_opts(Opts::new(
            "easyconnect_sessions_connected",
            "Anzahl aktuell verbundener Sessions",
        ))?;
        registry.register(Box::new(sessions_connected.clone()))?;

        let rooms_active = IntGauge::with_opts(Opts::new(
            "easyconnect_rooms_active",
            "Anzahl Raeume mit mindestens einem Mitglied",
        ))?;
        registry.register(Box::new(rooms_active.clone()))?;

        let sessions_evicted_total = IntCounter::with_opts(Opts::new(
            "easyconnect_sessions_evicted_total",
            "Gesamtanzahl wegen Inaktivitaet entfernter Sessions",
        ))?;
        registry.register(Box::new(sessions_evicted_total.clone()))?;

        let events_relayed_total = IntCounterVec::new(
            Opts::new(
                "easyconnect_events_relayed_total",
                "Gesamtanzahl verteilter Ereignisse",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(events_relayed_total.clone()))?;

        let deliveries_failed_total = IntCounter::with_opts(Opts::new(
            "easyconnect_deliveries_failed_total",
            "Gesamtanzahl fehlgeschlagener Zustellungen an einzelne Empfaenger",
        ))?;
        registry.register(Box::new(deliveries_failed_total.clone()))?;

        let http_requests_total = IntCounterVec::new(
            Opts::new("easyconnect_http_requests_total", "Gesamtanzahl HTTP-Anfragen"),
            &["method", "path", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "easyconnect_http_request_duration_seconds",
                "HTTP-Antwortzeit in Sekunden",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
            &["method", "path"],
        )?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            sessions_connected,
            rooms_active,
            sessions_evicted_total,
            events_relayed_total,
            deliveries_failed_total,
            http_requests_total,
            http_request_duration_seconds,
        })
    }

    /// Setzt die Gauges auf den aktuellen Bestand
    pub fn bestand_setzen(&self, sessions: usize, raeume: usize) {
        self.sessions_connected.set(sessions as i64);
        self.rooms_active.set(raeume as i64);
    }

    /// Zaehlt ein verteiltes Ereignis und die fehlgeschlagenen Zustellungen
    pub fn ereignis_gezaehlt(&self, art: &str, fehlgeschlagen: usize) {
        self.events_relayed_total.with_label_values(&[art]).inc();
        if fehlgeschlagen > 0 {
            self.deliveries_failed_total.inc_by(fehlgeschlagen as u64);
        }
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router<S>(metriken: CoordinatorMetrics) -> Router<S> {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<CoordinatorMetrics>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            axum::http::StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
