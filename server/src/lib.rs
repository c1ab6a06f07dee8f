//! easyconnect-server – Bibliotheks-Root
//!
//! Verdrahtet Coordinator, Liveness-Sweeper, TCP-Ereigniskanal und
//! REST-API und stellt den Einstiegspunkt fuer Integrationstests bereit.

pub mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use config::ServerConfig;
use easyconnect_commander::{ApiState, RestServer, RestServerKonfig};
use easyconnect_observability::{CoordinatorMetrics, HealthState};
use easyconnect_signaling::{LivenessSweeper, SignalingServer, SignalingState, SystemUhr};
use tokio::sync::watch;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Server-Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Metriken und Coordinator anlegen
    /// 2. Liveness-Sweeper starten
    /// 3. TCP-Ereigniskanal starten
    /// 4. REST-API starten
    /// 5. Auf Ctrl-C warten, dann Shutdown an alle Tasks
    pub async fn starten(self) -> Result<()> {
        let tcp_addr = self.config.tcp_bind_adresse()?;
        let api_addr = self.config.api_bind_adresse()?;
        let signaling_config = self.config.signaling_config()?;
        let intervall = signaling_config.sweep_intervall;
        let schwelle = signaling_config.schwelle;

        tracing::info!(
            server_name = %self.config.server.name,
            tcp = %tcp_addr,
            api = %api_addr,
            "Server startet"
        );

        let metriken = CoordinatorMetrics::neu().context("Metriken nicht registrierbar")?;
        let state = SignalingState::neu(
            signaling_config,
            Arc::new(SystemUhr),
            Some(metriken.clone()),
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let sweeper = LivenessSweeper::neu(state.coordinator.clone(), intervall, schwelle)
            .starten(shutdown_rx.clone());

        let mut tcp = tokio::spawn(
            SignalingServer::neu(Arc::clone(&state), tcp_addr).starten(shutdown_rx.clone()),
        );

        let health_coordinator = state.coordinator.clone();
        let health = HealthState::neu(move || health_coordinator.health_kennzahlen());
        let rest_server = RestServer::neu(RestServerKonfig {
            bind_addr: api_addr,
            cors_origins: self.config.commander.cors_origins.clone(),
        });
        let mut rest = tokio::spawn(rest_server.starten(
            ApiState::neu(state.coordinator.clone()),
            health,
            Some(metriken),
            shutdown_rx,
        ));

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");

        // Ein vorzeitig beendeter Listener (z.B. Port belegt) beendet den Server
        let ergebnis: Result<()> = tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
                signal.map_err(Into::into)
            }
            ende = &mut tcp => match ende {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(anyhow::Error::new(e).context("TCP-Ereigniskanal beendet")),
                Err(e) => Err(anyhow::Error::new(e).context("TCP-Task abgebrochen")),
            },
            ende = &mut rest => match ende {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e.context("REST-Server beendet")),
                Err(e) => Err(anyhow::Error::new(e).context("REST-Task abgebrochen")),
            },
        };

        let _ = shutdown_tx.send(true);
        if let Err(e) = sweeper.await {
            tracing::warn!(fehler = %e, "Liveness-Sweeper nicht sauber beendet");
        }
        if !tcp.is_finished() {
            let _ = tcp.await;
        }
        if !rest.is_finished() {
            let _ = rest.await;
        }

        tracing::info!("Server gestoppt");
        ergebnis
    }
}
