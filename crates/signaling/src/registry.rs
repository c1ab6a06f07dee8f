//! Session-Registry – verbundene Identitaeten und ihr Zustand
//!
//! Die Registry besitzt alle Sessions exklusiv. Sie wird nur ueber den
//! Coordinator und unter dessen Zustandssperre veraendert.

use chrono::{DateTime, Duration, Utc};
use easyconnect_core::types::{AudioQualitaet, ClientToken, Identity, RoomId};
use easyconnect_protocol::control::{SessionInfo, SettingsUpdate};
use std::collections::HashMap;

use crate::broadcast::ClientSender;
use crate::error::{SignalingError, SignalingResult};

/// Standard-Lautstaerke neuer Sessions
pub const STANDARD_LAUTSTAERKE: f32 = 1.0;

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Zustand eines verbundenen Clients
#[derive(Debug, Clone)]
pub struct Session {
    pub identity: Identity,
    pub token: ClientToken,
    pub raum: RoomId,
    pub verbunden_seit: DateTime<Utc>,
    pub zuletzt_gesehen: DateTime<Utc>,
    pub spricht: bool,
    pub stumm: bool,
    pub lautstaerke: f32,
    pub qualitaet: AudioQualitaet,
    /// Gebundener Ereigniskanal (nur bei TCP-Clients)
    kanal: Option<ClientSender>,
}

impl Session {
    /// Oeffentliche Sicht ohne Token und Kanal
    pub fn ansicht(&self) -> SessionInfo {
        SessionInfo {
            username: self.identity.clone(),
            room_id: self.raum.clone(),
            connected_at: self.verbunden_seit,
            last_heartbeat: self.zuletzt_gesehen,
            is_speaking: self.spricht,
            is_muted: self.stumm,
            volume: self.lautstaerke,
            audio_quality: self.qualitaet,
        }
    }

    /// `zuletzt_gesehen` waechst monoton, auch wenn die Wanduhr zurueckspringt
    fn gesehen(&mut self, jetzt: DateTime<Utc>) {
        if jetzt > self.zuletzt_gesehen {
            self.zuletzt_gesehen = jetzt;
        }
    }
}

// ---------------------------------------------------------------------------
// SessionRegistry
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<Identity, Session>,
    /// token -> identity
    tokens: HashMap<ClientToken, Identity>,
}

impl SessionRegistry {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Legt eine neue Session an
    ///
    /// Schlaegt fehl wenn Identitaet oder Token bereits einer Session gehoeren;
    /// die bestehende Session bleibt dann unveraendert.
    pub fn anlegen(
        &mut self,
        identity: Identity,
        token: ClientToken,
        raum: RoomId,
        jetzt: DateTime<Utc>,
    ) -> SignalingResult<&Session> {
        if self.sessions.contains_key(&identity) {
            return Err(SignalingError::IdentitaetVergeben(identity.to_string()));
        }
        if self.tokens.contains_key(&token) {
            return Err(SignalingError::IdentitaetVergeben(format!(
                "Token von {identity} bereits in Verwendung"
            )));
        }

        self.tokens.insert(token.clone(), identity.clone());
        let session = Session {
            identity: identity.clone(),
            token,
            raum,
            verbunden_seit: jetzt,
            zuletzt_gesehen: jetzt,
            spricht: false,
            stumm: false,
            lautstaerke: STANDARD_LAUTSTAERKE,
            qualitaet: AudioQualitaet::default(),
            kanal: None,
        };
        Ok(self.sessions.entry(identity).or_insert(session))
    }

    pub fn get(&self, identity: &Identity) -> Option<&Session> {
        self.sessions.get(identity)
    }

    pub fn enthaelt(&self, identity: &Identity) -> bool {
        self.sessions.contains_key(identity)
    }

    fn verbunden_mut(&mut self, identity: &Identity) -> SignalingResult<&mut Session> {
        self.sessions
            .get_mut(identity)
            .ok_or_else(|| SignalingError::NichtVerbunden(identity.to_string()))
    }

    /// Aktualisiert `zuletzt_gesehen`
    ///
    /// Mit `token_pruefen` muss ein mitgesendeter Token zur Session passen.
    pub fn heartbeat(
        &mut self,
        identity: &Identity,
        token: Option<&ClientToken>,
        jetzt: DateTime<Utc>,
        token_pruefen: bool,
    ) -> SignalingResult<DateTime<Utc>> {
        let session = self.verbunden_mut(identity)?;
        if token_pruefen {
            if let Some(token) = token {
                if token != &session.token {
                    return Err(SignalingError::NichtVerbunden(format!(
                        "{identity} (Token passt nicht)"
                    )));
                }
            }
        }
        session.gesehen(jetzt);
        Ok(session.zuletzt_gesehen)
    }

    /// Ermittelt die Identitaet zu einem Trenn-Aufruf
    ///
    /// Eine bekannte Identitaet hat Vorrang vor dem Token.
    pub fn aufloesen(
        &self,
        identity: Option<&Identity>,
        token: Option<&ClientToken>,
    ) -> Option<Identity> {
        if let Some(id) = identity.filter(|id| self.sessions.contains_key(*id)) {
            return Some(id.clone());
        }
        token.and_then(|t| self.tokens.get(t)).cloned()
    }

    /// Entfernt eine Session; `None` wenn sie nicht (mehr) existiert
    pub fn entfernen(&mut self, identity: &Identity) -> Option<Session> {
        let session = self.sessions.remove(identity)?;
        self.tokens.remove(&session.token);
        Some(session)
    }

    pub fn raum_setzen(&mut self, identity: &Identity, raum: &RoomId) -> SignalingResult<()> {
        self.verbunden_mut(identity)?.raum = raum.clone();
        Ok(())
    }

    pub fn sprech_status_setzen(&mut self, identity: &Identity, spricht: bool) {
        if let Some(session) = self.sessions.get_mut(identity) {
            session.spricht = spricht;
        }
    }

    /// Teil-Aktualisierung: nur gesetzte Felder aendern sich
    ///
    /// Eine ungueltige Lautstaerke lehnt die gesamte Aenderung ab.
    pub fn einstellungen_aktualisieren(
        &mut self,
        identity: &Identity,
        aenderung: &SettingsUpdate,
    ) -> SignalingResult<SessionInfo> {
        if let Some(volume) = aenderung.volume {
            if !volume.is_finite() || volume < 0.0 {
                return Err(SignalingError::UngueltigeEingabe(format!(
                    "Lautstaerke {volume} ungueltig"
                )));
            }
        }

        let session = self.verbunden_mut(identity)?;
        if let Some(volume) = aenderung.volume {
            session.lautstaerke = volume;
        }
        if let Some(qualitaet) = aenderung.audio_quality {
            session.qualitaet = qualitaet;
        }
        if let Some(stumm) = aenderung.is_muted {
            session.stumm = stumm;
        }
        Ok(session.ansicht())
    }

    /// Bindet einen Ereigniskanal an eine bestehende Session (Token muss passen)
    pub fn kanal_binden(
        &mut self,
        identity: &Identity,
        token: &ClientToken,
        kanal: ClientSender,
    ) -> SignalingResult<()> {
        let session = self.verbunden_mut(identity)?;
        if &session.token != token {
            return Err(SignalingError::NichtVerbunden(format!(
                "{identity} (Token passt nicht)"
            )));
        }
        session.kanal = Some(kanal);
        Ok(())
    }

    /// Loest den Kanal, sofern noch derselbe gebunden ist
    pub fn kanal_loesen(&mut self, identity: &Identity, kanal_id: u64) -> bool {
        match self.sessions.get_mut(identity) {
            Some(session) if session.kanal.as_ref().map(|k| k.kanal_id) == Some(kanal_id) => {
                session.kanal = None;
                true
            }
            _ => false,
        }
    }

    pub fn sender(&self, identity: &Identity) -> Option<ClientSender> {
        self.sessions.get(identity).and_then(|s| s.kanal.clone())
    }

    /// Sessions deren letztes Lebenszeichen mehr als `schwelle` zurueckliegt
    pub fn veraltete(&self, jetzt: DateTime<Utc>, schwelle: Duration) -> Vec<Identity> {
        let mut veraltet: Vec<Identity> = self
            .sessions
            .values()
            .filter(|s| jetzt - s.zuletzt_gesehen > schwelle)
            .map(|s| s.identity.clone())
            .collect();
        veraltet.sort();
        veraltet
    }

    /// Punktuelle Sicht auf alle Sessions, nach Verbindungszeit und Identitaet
    pub fn snapshot(&self) -> Vec<SessionInfo> {
        let mut sessions: Vec<&Session> = self.sessions.values().collect();
        sessions.sort_by(|a, b| {
            a.verbunden_seit
                .cmp(&b.verbunden_seit)
                .then_with(|| a.identity.cmp(&b.identity))
        });
        sessions.into_iter().map(Session::ansicht).collect()
    }

    /// Alle verbundenen Identitaeten (sortiert)
    pub fn identitaeten(&self) -> Vec<Identity> {
        let mut ids: Vec<Identity> = self.sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn anzahl(&self) -> usize {
        self.sessions.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
