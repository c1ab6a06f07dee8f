//! Fehlertypen fuer den EasyConnect Commander

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use easyconnect_core::error::EasyConnectError;
use easyconnect_signaling::SignalingError;
use serde_json::json;
use thiserror::Error;

/// Alle moeglichen Fehler im Commander-Crate
#[derive(Debug, Error)]
pub enum CommanderError {
    #[error("Benutzername bereits vergeben: {0}")]
    IdentitaetVergeben(String),

    #[error("Client nicht verbunden: {0}")]
    NichtVerbunden(String),

    #[error("Ressource nicht gefunden: {0}")]
    NichtGefunden(String),

    #[error("Ungueltige Eingabe: {0}")]
    UngueltigeEingabe(String),

    #[error("Server voll")]
    ServerVoll,

    #[error("Interner Fehler: {0}")]
    Intern(#[from] anyhow::Error),

    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),
}

pub type CommanderResult<T> = Result<T, CommanderError>;

/// HTTP-Statuscode fuer REST-Fehler
impl CommanderError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::IdentitaetVergeben(_) => 409,
            Self::NichtVerbunden(_) | Self::NichtGefunden(_) => 404,
            Self::UngueltigeEingabe(_) => 400,
            Self::ServerVoll => 503,
            Self::Intern(_) | Self::Io(_) => 500,
        }
    }
}

impl From<SignalingError> for CommanderError {
    fn from(e: SignalingError) -> Self {
        match e {
            SignalingError::IdentitaetVergeben(name) => Self::IdentitaetVergeben(name),
            SignalingError::NichtVerbunden(name) => Self::NichtVerbunden(name),
            SignalingError::NichtGefunden(name) => Self::NichtGefunden(name),
            SignalingError::UngueltigesEreignis(text) | SignalingError::UngueltigeEingabe(text) => {
                Self::UngueltigeEingabe(text)
            }
            SignalingError::ServerVoll => Self::ServerVoll,
            SignalingError::Io(e) => Self::Io(e),
            andere => Self::Intern(anyhow::anyhow!(andere.to_string())),
        }
    }
}

impl From<EasyConnectError> for CommanderError {
    fn from(e: EasyConnectError) -> Self {
        Self::UngueltigeEingabe(e.to_string())
    }
}

impl IntoResponse for CommanderError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(fehler = %self, "REST-Anfrage fehlgeschlagen");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuscodes_aus_coordinator_fehlern() {
        let faelle = [
            (SignalingError::IdentitaetVergeben("alice".into()), 409),
            (SignalingError::NichtVerbunden("bob".into()), 404),
            (SignalingError::NichtGefunden("carol".into()), 404),
            (SignalingError::UngueltigeEingabe("volume".into()), 400),
            (SignalingError::UngueltigesEreignis("base64".into()), 400),
            (SignalingError::ServerVoll, 503),
            (SignalingError::protokoll("kaputt"), 500),
        ];
        for (fehler, status) in faelle {
            assert_eq!(CommanderError::from(fehler).http_status(), status);
        }
    }

    #[test]
    fn validierungsfehler_ist_400() {
        let e = CommanderError::from(EasyConnectError::IdentitaetLeer);
        assert_eq!(e.http_status(), 400);
        assert_eq!(e.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
