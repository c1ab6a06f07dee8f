//! Gemeinsame Identifikationstypen fuer EasyConnect
//!
//! Alle Bezeichner verwenden das Newtype-Pattern um Verwechslungen zwischen
//! Identitaet, Raum und Client-Token zur Compilezeit auszuschliessen.
//! Leere Werte werden bereits beim Erzeugen (auch beim Deserialisieren)
//! abgelehnt.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EasyConnectError;

/// Name des Raums, dem Clients ohne Raumangabe beitreten
pub const STANDARD_RAUM: &str = "default";

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Eindeutiger Anzeigename eines Clients (eindeutig im ganzen Coordinator)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Erstellt eine Identitaet, fuehrende/abschliessende Leerzeichen werden entfernt
    pub fn neu(name: impl AsRef<str>) -> Result<Self, EasyConnectError> {
        let name = name.as_ref().trim();
        if name.is_empty() {
            return Err(EasyConnectError::IdentitaetLeer);
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Identity {
    type Error = EasyConnectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::neu(value)
    }
}

impl From<Identity> for String {
    fn from(value: Identity) -> Self {
        value.0
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// RoomId
// ---------------------------------------------------------------------------

/// Bezeichner eines Raums (beliebiger nicht-leerer String)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomId(String);

impl RoomId {
    /// Erstellt eine Raum-ID
    pub fn neu(name: impl AsRef<str>) -> Result<Self, EasyConnectError> {
        let name = name.as_ref().trim();
        if name.is_empty() {
            return Err(EasyConnectError::RaumLeer);
        }
        Ok(Self(name.to_string()))
    }

    /// Der Standard-Raum `default`
    pub fn standard() -> Self {
        Self(STANDARD_RAUM.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RoomId {
    fn default() -> Self {
        Self::standard()
    }
}

impl TryFrom<String> for RoomId {
    type Error = EasyConnectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::neu(value)
    }
}

impl From<RoomId> for String {
    fn from(value: RoomId) -> Self {
        value.0
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// ClientToken
// ---------------------------------------------------------------------------

/// Opaker Token des verbindenden Clients (`client_id` im Protokoll)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientToken(String);

impl ClientToken {
    /// Uebernimmt einen vom Client gelieferten Token
    pub fn neu(token: impl AsRef<str>) -> Result<Self, EasyConnectError> {
        let token = token.as_ref().trim();
        if token.is_empty() {
            return Err(EasyConnectError::TokenLeer);
        }
        Ok(Self(token.to_string()))
    }

    /// Erzeugt einen neuen zufaelligen Token (UUID v4)
    pub fn generieren() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ClientToken {
    type Error = EasyConnectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::neu(value)
    }
}

impl From<ClientToken> for String {
    fn from(value: ClientToken) -> Self {
        value.0
    }
}

impl std::fmt::Display for ClientToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// AudioQualitaet
// ---------------------------------------------------------------------------

/// Audio-Qualitaetsstufe eines Clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioQualitaet {
    Low,
    Medium,
    #[default]
    High,
}

impl std::str::FromStr for AudioQualitaet {
    type Err = EasyConnectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(EasyConnectError::UnbekannteQualitaet(s.to_string())),
        }
    }
}
