//! easyconnect-commander – REST-Schnittstelle fuer den EasyConnect Coordinator
//!
//! Stellt die HTTP-Endpunkte (`/api/...`) bereit, ueber die Clients ohne
//! Ereigniskanal Sessions anlegen, Lebenszeichen senden und den Zustand
//! abfragen. Alle Handler arbeiten direkt auf dem geteilten
//! [`easyconnect_signaling::Coordinator`].

pub mod error;
pub mod rest;

pub use error::{CommanderError, CommanderResult};
pub use rest::{ApiState, RestServer, RestServerKonfig};
