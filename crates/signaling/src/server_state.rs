//! Gemeinsamer Server-Zustand fuer den Ereigniskanal
//!
//! Haelt Konfiguration und Coordinator als Arc-Referenzen, die sicher
//! zwischen tokio-Tasks geteilt werden koennen.

use easyconnect_observability::CoordinatorMetrics;
use easyconnect_protocol::wire::DEFAULT_MAX_FRAME_SIZE;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Uhr;
use crate::coordinator::{Coordinator, CoordinatorConfig};
use crate::sweeper::{STANDARD_INTERVALL, STANDARD_SCHWELLE};

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Keepalive-Intervall in Sekunden
    pub keepalive_sek: u64,
    /// Timeout fuer stumme TCP-Verbindungen in Sekunden
    pub verbindungs_timeout_sek: u64,
    /// Maximale Frame-Groesse des Ereigniskanals
    pub max_frame_groesse: usize,
    /// Abstand der Liveness-Durchlaeufe
    pub sweep_intervall: Duration,
    /// Schwelle der Liveness-Durchlaeufe
    pub schwelle: Duration,
    pub coordinator: CoordinatorConfig,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            keepalive_sek: 30,
            verbindungs_timeout_sek: 90,
            max_frame_groesse: DEFAULT_MAX_FRAME_SIZE,
            sweep_intervall: STANDARD_INTERVALL,
            schwelle: STANDARD_SCHWELLE,
            coordinator: CoordinatorConfig::default(),
        }
    }
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
pub struct SignalingState {
    pub config: Arc<SignalingConfig>,
    pub coordinator: Coordinator,
}

impl SignalingState {
    /// Erstellt den Zustand samt Coordinator
    ///
    /// Der Coordinator uebernimmt die Frame-Grenze des Ereigniskanals.
    pub fn neu(
        mut config: SignalingConfig,
        uhr: Arc<dyn Uhr>,
        metriken: Option<CoordinatorMetrics>,
    ) -> Arc<Self> {
        config.coordinator.max_frame_groesse = config.max_frame_groesse;
        let coordinator = Coordinator::neu(config.coordinator.clone(), uhr, metriken);
        Arc::new(Self {
            config: Arc::new(config),
            coordinator,
        })
    }

    /// Ist das Session-Limit erreicht?
    pub fn ist_voll(&self) -> bool {
        self.coordinator.anzahl_sessions() >= self.config.coordinator.max_clients
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemUhr;
    use easyconnect_core::types::Identity;

    #[test]
    fn standard_konfiguration() {
        let config = SignalingConfig::default();
        assert_eq!(config.keepalive_sek, 30);
        assert_eq!(config.sweep_intervall, Duration::from_secs(30));
        assert_eq!(config.schwelle, Duration::from_secs(60));
        assert_eq!(config.coordinator.status_schwelle, Duration::from_secs(30));
        assert_eq!(config.coordinator.chat_verlauf_groesse, 100);
    }

    #[test]
    fn limit_erkennung() {
        let mut config = SignalingConfig::default();
        config.coordinator.max_clients = 1;
        let state = SignalingState::neu(config, Arc::new(SystemUhr), None);
        assert!(!state.ist_voll());
        state
            .coordinator
            .verbinden(Identity::neu("alice").unwrap(), None, None, None)
            .unwrap();
        assert!(state.ist_voll());
    }

    #[test]
    fn frame_grenze_wird_an_coordinator_weitergegeben() {
        let config = SignalingConfig {
            max_frame_groesse: 4096,
            ..SignalingConfig::default()
        };
        let state = SignalingState::neu(config, Arc::new(SystemUhr), None);
        assert_eq!(state.coordinator.config().max_frame_groesse, 4096);
    }
}
