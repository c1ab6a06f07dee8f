//! REST-Interface fuer den EasyConnect Commander

pub mod handlers;
pub mod routes;
pub mod server;

use easyconnect_core::types::{ClientToken, Identity, RoomId};
use easyconnect_signaling::Coordinator;
use std::time::Instant;

use crate::error::{CommanderError, CommanderResult};

/// Axum-State fuer den Commander-REST-Server
#[derive(Clone)]
pub struct ApiState {
    pub coordinator: Coordinator,
    /// Startzeitpunkt fuer `uptime_seconds`
    pub start_time: Instant,
}

impl ApiState {
    pub fn neu(coordinator: Coordinator) -> Self {
        Self {
            coordinator,
            start_time: Instant::now(),
        }
    }
}

/// Leere oder fehlende Strings gelten als nicht angegeben
fn angegeben(wert: Option<&str>) -> Option<&str> {
    wert.filter(|w| !w.trim().is_empty())
}

/// Pflichtfeld `username`
pub(crate) fn identitaet(wert: Option<&str>) -> CommanderResult<Identity> {
    let name = angegeben(wert)
        .ok_or_else(|| CommanderError::UngueltigeEingabe("Benutzername erforderlich".into()))?;
    Ok(Identity::neu(name)?)
}

pub(crate) fn optionale_identitaet(wert: Option<&str>) -> CommanderResult<Option<Identity>> {
    Ok(angegeben(wert).map(Identity::neu).transpose()?)
}

pub(crate) fn optionaler_token(wert: Option<&str>) -> CommanderResult<Option<ClientToken>> {
    Ok(angegeben(wert).map(ClientToken::neu).transpose()?)
}

pub(crate) fn optionaler_raum(wert: Option<&str>) -> CommanderResult<Option<RoomId>> {
    Ok(angegeben(wert).map(RoomId::neu).transpose()?)
}

pub use server::{RestServer, RestServerKonfig};
