//! Coordinator – Sessions, Raeume, Sprecher und Verteilung unter einer Sperre
//!
//! Der gesamte veraenderliche Zustand (Registry, Raum-Verzeichnis mit den
//! Sprecher-Slots, Chat-Verlauf) liegt in einem [`Zustand`] hinter einem
//! `RwLock`. Jede Mutation laeuft unter der Schreibsperre, Abfragen unter der
//! Lesesperre und sehen damit immer einen konsistenten Stand.
//!
//! Ereignisse werden unter der Sperre nur *berechnet* (Publikum als Liste von
//! Sendern). Die Zustellung erfolgt nach Freigabe der Zustandssperre, aber
//! noch unter der Relay-Sperre, damit Ereignisse eines Raums in der
//! Verarbeitungsreihenfolge bei den Empfaengern ankommen.

use base64::Engine;
use chrono::{DateTime, Utc};
use easyconnect_core::types::{ClientToken, Identity, RoomId};
use easyconnect_observability::{CoordinatorMetrics, HealthKennzahlen};
use easyconnect_protocol::control::{
    ChatEvent, ChatMessage, ConnectResponse, ControlMessage, ControlPayload, DisconnectResponse,
    FileEvent, FileShared, JoinRoomResponse, PresenceInfo, RoomInfo, RoomsResponse, SessionInfo,
    SettingsUpdate, SpeakerChanged, SpeakerResponse, StatusResponse, UsersResponse, VideoData,
    VideoEvent, VoiceData, VoiceEvent,
};
use easyconnect_protocol::wire::{kodierte_laenge, DEFAULT_MAX_FRAME_SIZE};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;

use crate::broadcast::{Ausgang, BroadcastRelay, ClientSender, EreignisArt};
use crate::clock::Uhr;
use crate::error::{SignalingError, SignalingResult};
use crate::history::{ChatVerlauf, STANDARD_KAPAZITAET};
use crate::registry::SessionRegistry;
use crate::rooms::RoomDirectory;
use crate::speaker::SprecherWechsel;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Laufzeit-Einstellungen des Coordinators
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Raum fuer Verbindungen ohne Raumangabe
    pub standard_raum: RoomId,
    /// Kapazitaet des Chat-Verlaufs
    pub chat_verlauf_groesse: usize,
    /// Heartbeats mit fremdem Token ablehnen
    pub heartbeat_token_pruefen: bool,
    /// Strengere Schwelle, die vor jeder Statusabfrage angewendet wird
    pub status_schwelle: Duration,
    /// Maximale Anzahl gleichzeitiger Sessions
    pub max_clients: usize,
    /// Maximale Laenge einer Chat-Nachricht in Bytes
    pub max_chat_laenge: usize,
    /// Obergrenze fuer kodierte Antworten und Ereignisse (Frame-Grenze)
    pub max_frame_groesse: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            standard_raum: RoomId::standard(),
            chat_verlauf_groesse: STANDARD_KAPAZITAET,
            heartbeat_token_pruefen: false,
            status_schwelle: Duration::from_secs(30),
            max_clients: 512,
            max_chat_laenge: 4096,
            max_frame_groesse: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

// ---------------------------------------------------------------------------
// Zustand
// ---------------------------------------------------------------------------

/// Gesamter veraenderlicher Zustand, nur unter der Sperre erreichbar
struct Zustand {
    registry: SessionRegistry,
    raeume: RoomDirectory,
    verlauf: ChatVerlauf,
}

impl Zustand {
    fn ausgang(
        &self,
        art: EreignisArt,
        raum: &RoomId,
        absender: Option<&Identity>,
        payload: ControlPayload,
    ) -> Ausgang {
        self.ausgang_fuer(art, raum, absender, ControlMessage::ereignis(payload))
    }

    fn ausgang_fuer(
        &self,
        art: EreignisArt,
        raum: &RoomId,
        absender: Option<&Identity>,
        nachricht: ControlMessage,
    ) -> Ausgang {
        Ausgang::berechnen(
            art,
            raum,
            &self.raeume.mitglieder(raum),
            absender,
            &self.registry,
            nachricht,
        )
    }

    /// Neueste Chat-Nachrichten von `raum`, soweit sie neben `antwort` in einen Frame passen
    fn verlauf_einpassen(
        &self,
        raum: &RoomId,
        antwort: ControlPayload,
        max_frame: usize,
    ) -> Vec<ChatMessage> {
        // Groesste moegliche request_id, damit die Grenze fuer jede Anfrage haelt
        let basis = kodierte_laenge(&ControlMessage::new(u32::MAX, antwort)).unwrap_or(max_frame);
        let verlauf = self.verlauf.fuer_raum_begrenzt(raum, max_frame.saturating_sub(basis));
        tracing::trace!(raum = %raum, nachrichten = verlauf.len(), "Chat-Verlauf eingepasst");
        verlauf
    }

    fn presence_ausgang(&self, art: EreignisArt, raum: &RoomId, identity: &Identity) -> Ausgang {
        let info = PresenceInfo {
            room_id: raum.clone(),
            username: identity.clone(),
        };
        let payload = match art {
            EreignisArt::PresenceLeft => ControlPayload::PresenceLeft(info),
            _ => ControlPayload::PresenceJoined(info),
        };
        self.ausgang(art, raum, Some(identity), payload)
    }

    fn sprecher_ausgang(&self, raum: &RoomId, wechsel: &SprecherWechsel) -> Ausgang {
        self.ausgang(
            EreignisArt::SpeakerChanged,
            raum,
            None,
            ControlPayload::SpeakerChanged(SpeakerChanged {
                room_id: raum.clone(),
                username: wechsel.nachher.clone(),
            }),
        )
    }

    /// Haelt die `spricht`-Flags der Sessions synchron zum Slot
    fn wechsel_anwenden(&mut self, wechsel: &SprecherWechsel) {
        if !wechsel.geaendert() {
            return;
        }
        if let Some(vorher) = &wechsel.vorher {
            self.registry.sprech_status_setzen(vorher, false);
        }
        if let Some(nachher) = &wechsel.nachher {
            self.registry.sprech_status_setzen(nachher, true);
        }
    }

    /// Anfordern (`spricht = true`) oder Freigeben des Slots in `raum`
    fn sprecher_umschalten(
        &mut self,
        identity: &Identity,
        raum: &RoomId,
        spricht: bool,
    ) -> SignalingResult<(SprecherWechsel, Option<Ausgang>)> {
        let wechsel = if spricht {
            self.raeume.sprechen_anfordern(identity, raum)
        } else {
            self.raeume.sprechen_freigeben(identity, raum)
        };
        let wechsel = wechsel.ok_or_else(|| {
            SignalingError::NichtVerbunden(format!("{identity} ist nicht in {raum}"))
        })?;

        if !wechsel.geaendert() {
            return Ok((wechsel, None));
        }
        self.wechsel_anwenden(&wechsel);
        tracing::debug!(
            raum = %raum,
            vorher = ?wechsel.vorher.as_ref().map(Identity::as_str),
            nachher = ?wechsel.nachher.as_ref().map(Identity::as_str),
            "Sprecher gewechselt"
        );
        let ausgang = self.sprecher_ausgang(raum, &wechsel);
        Ok((wechsel, Some(ausgang)))
    }

    /// Absender muss verbunden und Mitglied des Ereignis-Raums sein
    fn absender_pruefen(&self, identity: &Identity, raum: &RoomId) -> SignalingResult<()> {
        if !self.registry.enthaelt(identity) {
            return Err(SignalingError::NichtVerbunden(identity.to_string()));
        }
        if self.raeume.raum_von(identity) != Some(raum) {
            return Err(SignalingError::NichtVerbunden(format!(
                "{identity} ist nicht in {raum}"
            )));
        }
        Ok(())
    }

    /// Gemeinsamer Pfad fuer explizites Trennen und Verdraengung
    ///
    /// `None` wenn die Session bereits entfernt wurde.
    fn session_entfernen(&mut self, identity: &Identity) -> Option<Vec<Ausgang>> {
        let session = self.registry.entfernen(identity)?;
        let mut ausgaenge = Vec::new();

        if let Some(austritt) = self.raeume.verlassen(identity, &session.raum) {
            if let Some(wechsel) = &austritt.sprecher_wechsel {
                self.wechsel_anwenden(wechsel);
                ausgaenge.push(self.sprecher_ausgang(&austritt.raum, wechsel));
            }
            ausgaenge.push(self.presence_ausgang(
                EreignisArt::PresenceLeft,
                &austritt.raum,
                identity,
            ));
        }
        Some(ausgaenge)
    }
}

/// Verteilte Ereignisse muessen in einen Frame des Ereigniskanals passen
fn frame_pruefen(nachricht: &ControlMessage, max_frame: usize) -> SignalingResult<()> {
    let laenge = kodierte_laenge(nachricht)
        .map_err(|e| SignalingError::UngueltigesEreignis(e.to_string()))?;
    if laenge > max_frame {
        return Err(SignalingError::UngueltigesEreignis(format!(
            "Ereignis zu gross: {laenge} Bytes (Maximum: {max_frame} Bytes)"
        )));
    }
    Ok(())
}

/// Medien-Payloads muessen gueltiges Base64 sein
fn nutzdaten_pruefen(daten: &str) -> SignalingResult<()> {
    base64::engine::general_purpose::STANDARD
        .decode(daten)
        .map(|_| ())
        .map_err(|e| SignalingError::UngueltigesEreignis(format!("Base64: {e}")))
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Zentraler Session- und Raum-Coordinator
///
/// Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    config: CoordinatorConfig,
    uhr: Arc<dyn Uhr>,
    zustand: RwLock<Zustand>,
    /// Serialisiert Publikumsberechnung und Zustellung je Ereignis
    relay_sperre: Mutex<()>,
    relay: BroadcastRelay,
    metriken: Option<CoordinatorMetrics>,
}

impl Coordinator {
    pub fn neu(
        config: CoordinatorConfig,
        uhr: Arc<dyn Uhr>,
        metriken: Option<CoordinatorMetrics>,
    ) -> Self {
        let zustand = Zustand {
            registry: SessionRegistry::neu(),
            raeume: RoomDirectory::neu(),
            verlauf: ChatVerlauf::neu(config.chat_verlauf_groesse),
        };
        Self {
            inner: Arc::new(CoordinatorInner {
                config,
                uhr,
                zustand: RwLock::new(zustand),
                relay_sperre: Mutex::new(()),
                relay: BroadcastRelay::neu(metriken.clone()),
                metriken,
            }),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    /// Fuehrt eine Mutation aus und stellt die berechneten Ereignisse zu
    ///
    /// Schlaegt `aendern` fehl, darf es den Zustand nicht veraendert haben.
    fn mutieren<T>(
        &self,
        aendern: impl FnOnce(&mut Zustand, DateTime<Utc>) -> SignalingResult<(T, Vec<Ausgang>)>,
    ) -> SignalingResult<T> {
        let _reihenfolge = self.inner.relay_sperre.lock();

        let (ergebnis, ausgaenge, bestand) = {
            let mut zustand = self.inner.zustand.write();
            let jetzt = self.inner.uhr.jetzt();
            let (ergebnis, ausgaenge) = aendern(&mut zustand, jetzt)?;
            let bestand = (zustand.registry.anzahl(), zustand.raeume.anzahl());
            (ergebnis, ausgaenge, bestand)
        };

        self.inner.relay.alle_zustellen(ausgaenge);
        if let Some(m) = &self.inner.metriken {
            m.bestand_setzen(bestand.0, bestand.1);
        }
        Ok(ergebnis)
    }

    // -----------------------------------------------------------------------
    // Session-Lebenszyklus
    // -----------------------------------------------------------------------

    /// Legt eine Session an und tritt dem Ziel-Raum bei
    ///
    /// Ohne Token wird einer erzeugt, ohne Raum gilt der Standard-Raum. Ein
    /// mitgegebener Kanal wird sofort gebunden.
    pub fn verbinden(
        &self,
        identity: Identity,
        token: Option<ClientToken>,
        raum: Option<RoomId>,
        kanal: Option<ClientSender>,
    ) -> SignalingResult<ConnectResponse> {
        let max_clients = self.inner.config.max_clients;
        let max_frame = self.inner.config.max_frame_groesse;
        let raum = raum.unwrap_or_else(|| self.inner.config.standard_raum.clone());
        let token = token.unwrap_or_else(ClientToken::generieren);

        self.mutieren(move |z, jetzt| {
            if z.registry.enthaelt(&identity) {
                return Err(SignalingError::IdentitaetVergeben(identity.to_string()));
            }
            if z.registry.anzahl() >= max_clients {
                return Err(SignalingError::ServerVoll);
            }

            z.registry
                .anlegen(identity.clone(), token.clone(), raum.clone(), jetzt)?;
            if let Some(kanal) = kanal {
                z.registry.kanal_binden(&identity, &token, kanal)?;
            }
            z.raeume.beitreten(&identity, &raum);

            tracing::info!(identity = %identity, raum = %raum, "Client verbunden");

            let ausgang = z.presence_ausgang(EreignisArt::PresenceJoined, &raum, &identity);
            let mut antwort = ConnectResponse {
                client_id: token,
                connected_users: z.registry.identitaeten(),
                room_users: z.raeume.mitglieder(&raum),
                recent_chat: Vec::new(),
                room_id: raum,
            };
            antwort.recent_chat = z.verlauf_einpassen(
                &antwort.room_id,
                ControlPayload::ConnectResponse(antwort.clone()),
                max_frame,
            );
            Ok((antwort, vec![ausgang]))
        })
    }

    /// Bindet einen Ereigniskanal an eine bestehende Session
    pub fn anbinden(
        &self,
        identity: &Identity,
        token: &ClientToken,
        kanal: ClientSender,
    ) -> SignalingResult<()> {
        self.inner
            .zustand
            .write()
            .registry
            .kanal_binden(identity, token, kanal)?;
        tracing::debug!(identity = %identity, "Ereigniskanal gebunden");
        Ok(())
    }

    /// Loest einen Ereigniskanal (Verbindung weg); die Session bleibt bestehen
    pub fn kanal_loesen(&self, identity: &Identity, kanal_id: u64) -> bool {
        self.inner
            .zustand
            .write()
            .registry
            .kanal_loesen(identity, kanal_id)
    }

    /// Lebenszeichen; liefert den neuen `last_seen`-Wert
    pub fn heartbeat(
        &self,
        identity: &Identity,
        token: Option<&ClientToken>,
    ) -> SignalingResult<DateTime<Utc>> {
        let jetzt = self.inner.uhr.jetzt();
        let pruefen = self.inner.config.heartbeat_token_pruefen;
        let gesehen = self
            .inner
            .zustand
            .write()
            .registry
            .heartbeat(identity, token, jetzt, pruefen)?;
        tracing::trace!(identity = %identity, "Heartbeat");
        Ok(gesehen)
    }

    /// Trennt eine Session ueber Identitaet und/oder Token
    pub fn trennen(
        &self,
        identity: Option<&Identity>,
        token: Option<&ClientToken>,
    ) -> SignalingResult<DisconnectResponse> {
        if identity.is_none() && token.is_none() {
            return Err(SignalingError::UngueltigeEingabe(
                "username oder client_id erforderlich".into(),
            ));
        }

        self.mutieren(|z, _| {
            let ziel = z.registry.aufloesen(identity, token).ok_or_else(|| {
                SignalingError::NichtGefunden(
                    identity
                        .map(Identity::to_string)
                        .or_else(|| token.map(ClientToken::to_string))
                        .unwrap_or_default(),
                )
            })?;
            let ausgaenge = z.session_entfernen(&ziel).unwrap_or_default();

            tracing::info!(identity = %ziel, "Client getrennt");

            let antwort = DisconnectResponse {
                disconnected_user: ziel,
                remaining_users: z.registry.identitaeten(),
            };
            Ok((antwort, ausgaenge))
        })
    }

    /// Wechselt in einen anderen Raum (ohne Angabe: Standard-Raum)
    pub fn raum_beitreten(
        &self,
        identity: &Identity,
        raum: Option<RoomId>,
    ) -> SignalingResult<JoinRoomResponse> {
        let raum = raum.unwrap_or_else(|| self.inner.config.standard_raum.clone());
        let max_frame = self.inner.config.max_frame_groesse;

        self.mutieren(|z, _| {
            if !z.registry.enthaelt(identity) {
                return Err(SignalingError::NichtVerbunden(identity.to_string()));
            }

            let mut ausgaenge = Vec::new();
            if z.raeume.raum_von(identity) != Some(&raum) {
                if let Some(austritt) = z.raeume.beitreten(identity, &raum) {
                    if let Some(wechsel) = &austritt.sprecher_wechsel {
                        z.wechsel_anwenden(wechsel);
                        ausgaenge.push(z.sprecher_ausgang(&austritt.raum, wechsel));
                    }
                    ausgaenge.push(z.presence_ausgang(
                        EreignisArt::PresenceLeft,
                        &austritt.raum,
                        identity,
                    ));
                }
                z.registry.raum_setzen(identity, &raum)?;
                ausgaenge.push(z.presence_ausgang(EreignisArt::PresenceJoined, &raum, identity));
                tracing::debug!(identity = %identity, raum = %raum, "Raum gewechselt");
            }

            let mut antwort = JoinRoomResponse {
                room_users: z.raeume.mitglieder(&raum),
                recent_chat: Vec::new(),
                room_id: raum.clone(),
            };
            antwort.recent_chat = z.verlauf_einpassen(
                &raum,
                ControlPayload::JoinRoomResponse(antwort.clone()),
                max_frame,
            );
            Ok((antwort, ausgaenge))
        })
    }

    /// Teil-Aktualisierung von Lautstaerke, Qualitaet und Stummschaltung
    pub fn einstellungen_aktualisieren(
        &self,
        identity: &Identity,
        aenderung: &SettingsUpdate,
    ) -> SignalingResult<SessionInfo> {
        self.inner
            .zustand
            .write()
            .registry
            .einstellungen_aktualisieren(identity, aenderung)
    }

    // -----------------------------------------------------------------------
    // Sprecher
    // -----------------------------------------------------------------------

    /// Beansprucht den Sprecher-Slot in `raum` (verdraengt den bisherigen)
    pub fn sprechen_anfordern(
        &self,
        identity: &Identity,
        raum: &RoomId,
    ) -> SignalingResult<SprecherWechsel> {
        self.mutieren(|z, _| {
            let (wechsel, ausgang) = z.sprecher_umschalten(identity, raum, true)?;
            Ok((wechsel, ausgang.into_iter().collect()))
        })
    }

    /// Gibt den Slot frei; fuer Nicht-Sprecher ein No-op
    pub fn sprechen_freigeben(
        &self,
        identity: &Identity,
        raum: &RoomId,
    ) -> SignalingResult<SprecherWechsel> {
        self.mutieren(|z, _| {
            let (wechsel, ausgang) = z.sprecher_umschalten(identity, raum, false)?;
            Ok((wechsel, ausgang.into_iter().collect()))
        })
    }

    /// Setzt bzw. loescht den Sprecher im eigenen Raum der Identitaet
    pub fn sprecher_setzen(
        &self,
        identity: &Identity,
        spricht: bool,
    ) -> SignalingResult<SpeakerResponse> {
        self.mutieren(|z, _| {
            let raum = z
                .raeume
                .raum_von(identity)
                .cloned()
                .ok_or_else(|| SignalingError::NichtVerbunden(identity.to_string()))?;
            let (wechsel, ausgang) = z.sprecher_umschalten(identity, &raum, spricht)?;
            let antwort = SpeakerResponse {
                room_id: raum,
                current_speaker: wechsel.nachher,
                previous_speaker: wechsel.vorher,
            };
            Ok((antwort, ausgang.into_iter().collect()))
        })
    }

    // -----------------------------------------------------------------------
    // Ereignisse
    // -----------------------------------------------------------------------

    /// Voice-Daten: aktualisiert den Sprecher-Slot, dann Verteilung ohne Absender
    pub fn voice_ereignis(&self, ereignis: VoiceEvent) -> SignalingResult<()> {
        if let Some(daten) = &ereignis.audio_data {
            nutzdaten_pruefen(daten)?;
        }
        let max_frame = self.inner.config.max_frame_groesse;

        self.mutieren(|z, jetzt| {
            z.absender_pruefen(&ereignis.username, &ereignis.room_id)?;
            let daten = ControlMessage::ereignis(ControlPayload::VoiceData(VoiceData {
                username: ereignis.username.clone(),
                audio_data: ereignis.audio_data.clone(),
                is_speaking: ereignis.is_speaking,
                timestamp: jetzt,
            }));
            frame_pruefen(&daten, max_frame)?;

            let (_, sprecher) =
                z.sprecher_umschalten(&ereignis.username, &ereignis.room_id, ereignis.is_speaking)?;

            let mut ausgaenge: Vec<Ausgang> = sprecher.into_iter().collect();
            ausgaenge.push(z.ausgang_fuer(
                EreignisArt::Voice,
                &ereignis.room_id,
                Some(&ereignis.username),
                daten,
            ));
            Ok(((), ausgaenge))
        })
    }

    /// Chat-Nachricht: Verlauf, dann Verteilung an alle inkl. Absender
    pub fn chat_ereignis(&self, ereignis: ChatEvent) -> SignalingResult<ChatMessage> {
        if ereignis.text.trim().is_empty() {
            return Err(SignalingError::UngueltigesEreignis(
                "Leere Chat-Nachricht".into(),
            ));
        }
        let max_chat = self.inner.config.max_chat_laenge;
        if ereignis.text.len() > max_chat {
            return Err(SignalingError::UngueltigesEreignis(format!(
                "Chat-Nachricht zu lang: {} Bytes (Maximum: {max_chat} Bytes)",
                ereignis.text.len()
            )));
        }
        let max_frame = self.inner.config.max_frame_groesse;

        self.mutieren(|z, jetzt| {
            z.absender_pruefen(&ereignis.username, &ereignis.room_id)?;
            let nachricht = ChatMessage {
                room_id: ereignis.room_id.clone(),
                username: ereignis.username.clone(),
                text: ereignis.text.clone(),
                timestamp: jetzt,
            };
            let verteilt = ControlMessage::ereignis(ControlPayload::ChatMessage(nachricht.clone()));
            frame_pruefen(&verteilt, max_frame)?;
            z.verlauf.anhaengen(nachricht.clone());

            let ausgang = z.ausgang_fuer(
                EreignisArt::Chat,
                &ereignis.room_id,
                Some(&ereignis.username),
                verteilt,
            );
            Ok((nachricht, vec![ausgang]))
        })
    }

    /// Datei: Verteilung an alle inkl. Absender
    pub fn datei_ereignis(&self, ereignis: FileEvent) -> SignalingResult<()> {
        if ereignis.filename.trim().is_empty() {
            return Err(SignalingError::UngueltigesEreignis("Dateiname fehlt".into()));
        }
        nutzdaten_pruefen(&ereignis.payload)?;
        let max_frame = self.inner.config.max_frame_groesse;

        self.mutieren(|z, _| {
            z.absender_pruefen(&ereignis.username, &ereignis.room_id)?;
            let datei = ControlMessage::ereignis(ControlPayload::FileShared(FileShared {
                username: ereignis.username.clone(),
                filename: ereignis.filename.clone(),
                payload: ereignis.payload.clone(),
            }));
            frame_pruefen(&datei, max_frame)?;
            let ausgang = z.ausgang_fuer(
                EreignisArt::File,
                &ereignis.room_id,
                Some(&ereignis.username),
                datei,
            );
            Ok(((), vec![ausgang]))
        })
    }

    /// Video: Verteilung ohne Absender
    pub fn video_ereignis(&self, ereignis: VideoEvent) -> SignalingResult<()> {
        nutzdaten_pruefen(&ereignis.payload)?;
        let max_frame = self.inner.config.max_frame_groesse;

        self.mutieren(|z, _| {
            z.absender_pruefen(&ereignis.username, &ereignis.room_id)?;
            let video = ControlMessage::ereignis(ControlPayload::VideoData(VideoData {
                username: ereignis.username.clone(),
                payload: ereignis.payload.clone(),
            }));
            frame_pruefen(&video, max_frame)?;
            let ausgang = z.ausgang_fuer(
                EreignisArt::Video,
                &ereignis.room_id,
                Some(&ereignis.username),
                video,
            );
            Ok(((), vec![ausgang]))
        })
    }

    // -----------------------------------------------------------------------
    // Liveness
    // -----------------------------------------------------------------------

    /// Entfernt alle Sessions ohne Lebenszeichen seit mehr als `schwelle`
    ///
    /// Laeuft ueber denselben Pfad wie [`Coordinator::trennen`]. Bereits
    /// getrennte Sessions werden uebersprungen.
    pub fn veraltete_entfernen(&self, schwelle: Duration) -> Vec<Identity> {
        let Ok(schwelle) = chrono::Duration::from_std(schwelle) else {
            return Vec::new();
        };

        let entfernt = self
            .mutieren(|z, jetzt| {
                let mut entfernt = Vec::new();
                let mut ausgaenge = Vec::new();
                for identity in z.registry.veraltete(jetzt, schwelle) {
                    if let Some(a) = z.session_entfernen(&identity) {
                        ausgaenge.extend(a);
                        entfernt.push(identity);
                    }
                }
                Ok((entfernt, ausgaenge))
            })
            .unwrap_or_default();

        for identity in &entfernt {
            tracing::info!(identity = %identity, "Session wegen Inaktivitaet entfernt");
        }
        if let Some(m) = &self.inner.metriken {
            m.sessions_evicted_total.inc_by(entfernt.len() as u64);
        }
        entfernt
    }

    // -----------------------------------------------------------------------
    // Abfragen
    // -----------------------------------------------------------------------

    /// Status nach vorheriger Bereinigung mit der Status-Schwelle
    pub fn status(&self) -> StatusResponse {
        self.veraltete_entfernen(self.inner.config.status_schwelle);

        let z = self.inner.zustand.read();
        StatusResponse {
            total_users: z.registry.anzahl(),
            total_rooms: z.raeume.anzahl(),
            current_speakers: z
                .raeume
                .raeume()
                .map(|(id, raum)| (id.clone(), raum.sprecher().cloned()))
                .collect(),
            server_time: self.inner.uhr.jetzt(),
        }
    }

    /// Sessions, optional auf einen Raum beschraenkt
    pub fn benutzer(&self, raum: Option<&RoomId>) -> UsersResponse {
        let users: Vec<SessionInfo> = self
            .snapshot()
            .into_iter()
            .filter(|s| raum.map_or(true, |r| &s.room_id == r))
            .collect();
        UsersResponse {
            total_users: users.len(),
            users,
        }
    }

    /// Alle Raeume mit sortierten Mitgliedern
    pub fn raeume(&self) -> RoomsResponse {
        let z = self.inner.zustand.read();
        let rooms: std::collections::BTreeMap<RoomId, RoomInfo> = z
            .raeume
            .raeume()
            .map(|(id, raum)| {
                let users: Vec<Identity> = raum.mitglieder().iter().cloned().collect();
                (
                    id.clone(),
                    RoomInfo {
                        user_count: users.len(),
                        users,
                    },
                )
            })
            .collect();
        RoomsResponse {
            total_rooms: rooms.len(),
            rooms,
        }
    }

    /// Punktuelle Sicht auf alle Sessions
    pub fn snapshot(&self) -> Vec<SessionInfo> {
        self.inner.zustand.read().registry.snapshot()
    }

    pub fn session(&self, identity: &Identity) -> Option<SessionInfo> {
        self.inner
            .zustand
            .read()
            .registry
            .get(identity)
            .map(|s| s.ansicht())
    }

    pub fn mitglieder(&self, raum: &RoomId) -> Vec<Identity> {
        self.inner.zustand.read().raeume.mitglieder(raum)
    }

    pub fn sprecher(&self, raum: &RoomId) -> Option<Identity> {
        self.inner
            .zustand
            .read()
            .raeume
            .raum(raum)
            .and_then(|r| r.sprecher().cloned())
    }

    pub fn verbundene(&self) -> Vec<Identity> {
        self.inner.zustand.read().registry.identitaeten()
    }

    pub fn anzahl_sessions(&self) -> usize {
        self.inner.zustand.read().registry.anzahl()
    }

    pub fn anzahl_raeume(&self) -> usize {
        self.inner.zustand.read().raeume.anzahl()
    }

    /// Kennzahlen fuer den Health-Check
    pub fn health_kennzahlen(&self) -> HealthKennzahlen {
        let z = self.inner.zustand.read();
        HealthKennzahlen {
            connected_users: z.registry.anzahl(),
            voice_rooms: z.raeume.anzahl(),
            max_clients: self.inner.config.max_clients,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
