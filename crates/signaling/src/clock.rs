//! Zeitquelle fuer Liveness-Fristen
//!
//! Der Coordinator liest die Zeit ausschliesslich ueber [`Uhr`], damit Tests
//! die Zeit kontrolliert vorstellen koennen.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Wanduhr-Abstraktion
pub trait Uhr: Send + Sync {
    fn jetzt(&self) -> DateTime<Utc>;
}

/// Systemzeit (UTC)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemUhr;

impl Uhr for SystemUhr {
    fn jetzt(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manuell gesteuerte Uhr fuer Tests
#[derive(Debug)]
pub struct TestUhr {
    zeit: Mutex<DateTime<Utc>>,
}

impl TestUhr {
    /// Startet bei der aktuellen Systemzeit
    pub fn neu() -> Self {
        Self::ab(Utc::now())
    }

    /// Startet bei einem festen Zeitpunkt
    pub fn ab(start: DateTime<Utc>) -> Self {
        Self {
            zeit: Mutex::new(start),
        }
    }

    /// Stellt die Uhr um `dauer` vor (negative Werte stellen zurueck)
    pub fn vorstellen(&self, dauer: Duration) {
        let mut zeit = self.zeit.lock();
        *zeit += dauer;
    }

    pub fn setzen(&self, zeitpunkt: DateTime<Utc>) {
        *self.zeit.lock() = zeitpunkt;
    }
}

impl Default for TestUhr {
    fn default() -> Self {
        Self::neu()
    }
}

impl Uhr for TestUhr {
    fn jetzt(&self) -> DateTime<Utc> {
        *self.zeit.lock()
    }
}
