//! Liveness-Sweeper – entfernt periodisch Sessions ohne Lebenszeichen
//!
//! Ein einzelner tokio-Task ruft in festem Abstand
//! [`Coordinator::veraltete_entfernen`] auf. Die Verdraengung laeuft ueber
//! dieselbe synchronisierte Schnittstelle wie explizites Trennen.

use easyconnect_core::types::Identity;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::coordinator::Coordinator;

/// Standard-Abstand zwischen zwei Durchlaeufen
pub const STANDARD_INTERVALL: Duration = Duration::from_secs(30);

/// Standard-Schwelle fuer veraltete Sessions
pub const STANDARD_SCHWELLE: Duration = Duration::from_secs(60);

pub struct LivenessSweeper {
    coordinator: Coordinator,
    intervall: Duration,
    schwelle: Duration,
}

impl LivenessSweeper {
    pub fn neu(coordinator: Coordinator, intervall: Duration, schwelle: Duration) -> Self {
        Self {
            coordinator,
            intervall,
            schwelle,
        }
    }

    /// Ein einzelner Durchlauf
    pub fn durchlauf(&self) -> Vec<Identity> {
        let entfernt = self.coordinator.veraltete_entfernen(self.schwelle);
        if !entfernt.is_empty() {
            tracing::info!(anzahl = entfernt.len(), "Liveness-Sweep: Sessions entfernt");
        }
        entfernt
    }

    /// Startet den periodischen Task; endet beim Shutdown-Signal
    pub fn starten(self, mut shutdown_rx: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut intervall = tokio::time::interval(self.intervall);
            intervall.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::info!(
                intervall_sek = self.intervall.as_secs(),
                schwelle_sek = self.schwelle.as_secs(),
                "Liveness-Sweeper gestartet"
            );

            loop {
                tokio::select! {
                    _ = intervall.tick() => {
                        self.durchlauf();
                    }

                    Ok(()) = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            tracing::info!("Liveness-Sweeper gestoppt");
        })
    }
}
