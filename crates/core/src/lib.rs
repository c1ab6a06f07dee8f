//! easyconnect-core – Gemeinsame Typen und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen EasyConnect-Crates gemeinsam genutzt werden.

pub mod error;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{EasyConnectError, Result};
pub use types::{AudioQualitaet, ClientToken, Identity, RoomId};
