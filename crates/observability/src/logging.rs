//! Logging-Initialisierung ueber tracing-subscriber
//!
//! Level und Format kommen aus der Server-Konfiguration. Beim Start
//! ueberschreiben `EC_LOG_LEVEL` (beliebige Filter-Direktive) und
//! `EC_LOG_FORMAT` (`text`/`json`) beide Werte.

use std::str::FromStr;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LEVEL_ENV: &str = "EC_LOG_LEVEL";
pub const FORMAT_ENV: &str = "EC_LOG_FORMAT";

/// Ausgabeformat der Log-Zeilen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    /// Eine JSON-Zeile pro Ereignis, inklusive aktuellem Span
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            andere => Err(format!("Unbekanntes Log-Format: {andere}")),
        }
    }
}

/// Filter aus Umgebung oder Konfiguration, zuletzt `info`
fn filter_bauen(level: &str, umgebung: Option<&str>) -> EnvFilter {
    umgebung
        .and_then(|direktive| EnvFilter::try_new(direktive).ok())
        .or_else(|| EnvFilter::try_new(level).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Format aus Umgebung oder Konfiguration; Unbekanntes faellt auf Text
fn format_waehlen(format: &str, umgebung: Option<&str>) -> LogFormat {
    umgebung
        .and_then(|f| f.parse().ok())
        .or_else(|| format.parse().ok())
        .unwrap_or_default()
}

/// Installiert den globalen Subscriber
///
/// Schlaegt fehl, wenn bereits ein Subscriber gesetzt ist.
pub fn logging_initialisieren(level: &str, format: &str) -> anyhow::Result<()> {
    let env_level = std::env::var(LEVEL_ENV).ok();
    let env_format = std::env::var(FORMAT_ENV).ok();

    let filter = filter_bauen(level, env_level.as_deref());
    let (text, json) = match format_waehlen(format, env_format.as_deref()) {
        LogFormat::Text => (Some(fmt::layer().with_target(true)), None),
        LogFormat::Json => (
            None,
            Some(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_current_span(true),
            ),
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .try_init()?;
    Ok(())
}

/// Akzeptierte Werte fuer `logging.level` in der Konfiguration
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

pub fn log_format_gueltig(format: &str) -> bool {
    format.parse::<LogFormat>().is_ok()
}
