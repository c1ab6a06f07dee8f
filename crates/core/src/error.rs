//! Fehlertypen fuer EasyConnect
//!
//! Validierungsfehler der gemeinsamen Typen. Die Dienst-Crates definieren
//! eigene Fehler und konvertieren via `#[from]`.

use thiserror::Error;

/// Globaler Result-Alias fuer EasyConnect
pub type Result<T> = std::result::Result<T, EasyConnectError>;

/// Fehler beim Erzeugen oder Pruefen der gemeinsamen Typen
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EasyConnectError {
    #[error("Identitaet fehlt oder ist leer")]
    IdentitaetLeer,

    #[error("Raum-ID darf nicht leer sein")]
    RaumLeer,

    #[error("Client-Token darf nicht leer sein")]
    TokenLeer,

    #[error("Unbekannte Audio-Qualitaet: {0}")]
    UnbekannteQualitaet(String),
}
