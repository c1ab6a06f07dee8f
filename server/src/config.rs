//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context};
use easyconnect_core::types::RoomId;
use easyconnect_observability::logging::{log_format_gueltig, log_level_gueltig};
use easyconnect_signaling::{CoordinatorConfig, SignalingConfig};
use serde::{Deserialize, Serialize};

/// Umgebungsvariable mit dem Pfad der Konfigurationsdatei
pub const CONFIG_ENV: &str = "EASYCONNECT_CONFIG";

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerEinstellungen,
    pub netzwerk: NetzwerkEinstellungen,
    /// Heartbeat-Schwellen und Sweep-Intervall
    pub liveness: LivenessEinstellungen,
    pub raeume: RaumEinstellungen,
    pub logging: LoggingEinstellungen,
    /// REST-Schnittstelle
    pub commander: CommanderEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers
    pub name: String,
    /// Maximale Anzahl gleichzeitiger Sessions
    pub max_clients: usize,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "EasyConnect Server".into(),
            max_clients: 512,
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    pub bind_adresse: String,
    /// Port des TCP-Ereigniskanals
    pub tcp_port: u16,
    /// Port der REST-API
    pub api_port: u16,
    /// Keepalive-Ping auf dem Ereigniskanal in Sekunden
    pub keepalive_sek: u64,
    /// Stumme TCP-Verbindungen werden nach dieser Zeit getrennt
    pub verbindungs_timeout_sek: u64,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            tcp_port: 5001,
            api_port: 5000,
            keepalive_sek: 30,
            verbindungs_timeout_sek: 90,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LivenessEinstellungen {
    pub sweep_intervall_sek: u64,
    pub schwelle_sek: u64,
    /// Strengere Schwelle, die jede Statusabfrage vorher anwendet
    pub status_schwelle_sek: u64,
}

impl Default for LivenessEinstellungen {
    fn default() -> Self {
        Self {
            sweep_intervall_sek: 30,
            schwelle_sek: 60,
            status_schwelle_sek: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RaumEinstellungen {
    pub standard_raum: String,
    pub chat_verlauf_groesse: usize,
    /// Heartbeats nur mit passendem `client_id` akzeptieren
    pub heartbeat_token_pruefen: bool,
    /// Maximale Laenge einer Chat-Nachricht in Bytes
    pub max_chat_laenge: usize,
}

impl Default for RaumEinstellungen {
    fn default() -> Self {
        Self {
            standard_raum: "default".into(),
            chat_verlauf_groesse: 100,
            heartbeat_token_pruefen: false,
            max_chat_laenge: 4096,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommanderEinstellungen {
    /// CORS-Origins fuer REST (leer = alle erlaubt)
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        let config = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => Self::aus_toml(&inhalt)
                .with_context(|| format!("Konfigurationsfehler in '{pfad}'"))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Self::default()
            }
            Err(e) => bail!("Konfigurationsdatei '{pfad}' nicht lesbar: {e}"),
        };
        config.validieren()?;
        Ok(config)
    }

    pub fn aus_toml(inhalt: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(inhalt)?)
    }

    /// Prueft Werte, die serde allein nicht abfangen kann
    pub fn validieren(&self) -> anyhow::Result<()> {
        if self.server.max_clients == 0 {
            bail!("server.max_clients muss groesser als 0 sein");
        }
        if self.liveness.sweep_intervall_sek == 0 {
            bail!("liveness.sweep_intervall_sek muss groesser als 0 sein");
        }
        if !log_level_gueltig(&self.logging.level) {
            bail!("Unbekanntes Log-Level: {}", self.logging.level);
        }
        if !log_format_gueltig(&self.logging.format) {
            bail!("Unbekanntes Log-Format: {}", self.logging.format);
        }
        RoomId::neu(&self.raeume.standard_raum).context("raeume.standard_raum")?;
        Ok(())
    }

    /// Bind-Adresse des TCP-Ereigniskanals
    pub fn tcp_bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        let adresse = format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.tcp_port);
        adresse
            .parse()
            .with_context(|| format!("Ungueltige TCP-Adresse '{adresse}'"))
    }

    /// Bind-Adresse der REST-API
    pub fn api_bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        let adresse = format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.api_port);
        adresse
            .parse()
            .with_context(|| format!("Ungueltige API-Adresse '{adresse}'"))
    }

    /// Baut die Konfiguration des Signaling-Crates
    pub fn signaling_config(&self) -> anyhow::Result<SignalingConfig> {
        let standard_raum = RoomId::neu(&self.raeume.standard_raum)?;
        Ok(SignalingConfig {
            keepalive_sek: self.netzwerk.keepalive_sek,
            verbindungs_timeout_sek: self.netzwerk.verbindungs_timeout_sek,
            sweep_intervall: Duration::from_secs(self.liveness.sweep_intervall_sek),
            schwelle: Duration::from_secs(self.liveness.schwelle_sek),
            coordinator: CoordinatorConfig {
                standard_raum,
                chat_verlauf_groesse: self.raeume.chat_verlauf_groesse,
                heartbeat_token_pruefen: self.raeume.heartbeat_token_pruefen,
                status_schwelle: Duration::from_secs(self.liveness.status_schwelle_sek),
                max_clients: self.server.max_clients,
                max_chat_laenge: self.raeume.max_chat_laenge,
                ..CoordinatorConfig::default()
            },
            ..SignalingConfig::default()
        })
    }
}
