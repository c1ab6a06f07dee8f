//! Fehlertypen fuer Coordinator und Ereigniskanal

use easyconnect_core::EasyConnectError;
use easyconnect_protocol::control::ErrorCode;
use thiserror::Error;

/// Fehlertyp fuer den Signaling-Service
#[derive(Debug, Error)]
pub enum SignalingError {
    /// Identitaet (oder Token) ist bereits einer Session zugeordnet
    #[error("Identitaet bereits vergeben: {0}")]
    IdentitaetVergeben(String),

    /// Identitaet ist nicht verbunden bzw. nicht im angegebenen Raum
    #[error("Nicht verbunden: {0}")]
    NichtVerbunden(String),

    /// Trennen einer unbekannten Identitaet bzw. eines unbekannten Tokens
    #[error("Nicht gefunden: {0}")]
    NichtGefunden(String),

    /// Ereignis-Payload ist nicht verwertbar
    #[error("Ungueltiges Ereignis: {0}")]
    UngueltigesEreignis(String),

    /// Zustellung an einen Empfaenger gescheitert (wird nur geloggt)
    #[error("Zustellung an {0} fehlgeschlagen")]
    ZustellungFehlgeschlagen(String),

    /// Fehlende oder ungueltige Eingabe
    #[error("Ungueltige Eingabe: {0}")]
    UngueltigeEingabe(String),

    /// Client-Limit erreicht
    #[error("Server ist voll")]
    ServerVoll,

    /// IO-Fehler (TCP, Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Protokollfehler (ungueltiges Frame, falscher Zustand)
    #[error("Protokollfehler: {0}")]
    Protokoll(String),
}

impl SignalingError {
    /// Erstellt einen Protokollfehler
    pub fn protokoll(msg: impl Into<String>) -> Self {
        Self::Protokoll(msg.into())
    }

    /// Fehler-Code fuer die Antwort auf dem Ereigniskanal
    pub fn fehler_code(&self) -> ErrorCode {
        match self {
            Self::IdentitaetVergeben(_) => ErrorCode::IdentityTaken,
            Self::NichtVerbunden(_) => ErrorCode::NotConnected,
            Self::NichtGefunden(_) => ErrorCode::NotFound,
            Self::UngueltigesEreignis(_) => ErrorCode::MalformedEvent,
            Self::UngueltigeEingabe(_) => ErrorCode::InvalidRequest,
            Self::ServerVoll => ErrorCode::ServerFull,
            Self::ZustellungFehlgeschlagen(_) | Self::Io(_) | Self::Protokoll(_) => {
                ErrorCode::InternalError
            }
        }
    }
}

impl From<EasyConnectError> for SignalingError {
    fn from(e: EasyConnectError) -> Self {
        Self::UngueltigeEingabe(e.to_string())
    }
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;
