//! EasyConnect Server – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und startet den Server.

use anyhow::Result;
use easyconnect_observability::logging_initialisieren;
use easyconnect_server::{
    config::{ServerConfig, CONFIG_ENV},
    Server,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config_pfad = std::env::var(CONFIG_ENV).unwrap_or_else(|_| "config.toml".into());

    // Standardwerte falls die Datei fehlt
    let config = ServerConfig::laden(&config_pfad)?;

    logging_initialisieren(&config.logging.level, &config.logging.format)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        "EasyConnect Server wird initialisiert"
    );

    Server::neu(config).starten().await
}
