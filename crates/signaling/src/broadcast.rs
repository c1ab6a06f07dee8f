//! Broadcast-Relay – Publikum berechnen und Ereignisse zustellen
//!
//! Das Publikum wird unter der Zustandssperre als Liste von [`ClientSender`]
//! ermittelt; die Zustellung laeuft danach ohne Sperre. Fehler bei einem
//! Empfaenger werden geloggt und gezaehlt, die uebrigen Empfaenger erhalten
//! das Ereignis trotzdem.
//!
//! ## Publikum je Ereignisart
//! - Chat, Datei, Presence, Sprecherwechsel: alle Raummitglieder (inkl. Absender)
//! - Voice, Video: alle Raummitglieder ausser dem Absender

use easyconnect_core::types::{Identity, RoomId};
use easyconnect_observability::CoordinatorMetrics;
use easyconnect_protocol::control::ControlMessage;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

use crate::error::{SignalingError, SignalingResult};
use crate::registry::SessionRegistry;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Groesse der Send-Queue pro Client
pub const SEND_QUEUE_GROESSE: usize = 64;

/// Fortlaufende Kanal-IDs (0 ist reserviert)
static KANAL_ZAEHLER: AtomicU64 = AtomicU64::new(1);

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue eines verbundenen Clients
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub identity: Identity,
    /// Unterscheidet mehrere Verbindungen derselben Identitaet nacheinander
    pub kanal_id: u64,
    tx: mpsc::Sender<ControlMessage>,
}

impl ClientSender {
    pub fn neu(identity: Identity, tx: mpsc::Sender<ControlMessage>) -> Self {
        Self {
            identity,
            kanal_id: KANAL_ZAEHLER.fetch_add(1, Ordering::Relaxed),
            tx,
        }
    }

    /// Erstellt Sender und Empfangs-Queue mit Standardgroesse
    pub fn kanal(identity: Identity) -> (Self, mpsc::Receiver<ControlMessage>) {
        let (tx, rx) = mpsc::channel(SEND_QUEUE_GROESSE);
        (Self::neu(identity, tx), rx)
    }

    /// Sendet eine Nachricht nicht-blockierend an den Client
    pub fn senden(&self, nachricht: ControlMessage) -> SignalingResult<()> {
        match self.tx.try_send(nachricht) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(identity = %self.identity, "Send-Queue voll – Nachricht verworfen");
                Err(SignalingError::ZustellungFehlgeschlagen(
                    self.identity.to_string(),
                ))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(identity = %self.identity, "Send-Queue geschlossen (Client getrennt)");
                Err(SignalingError::ZustellungFehlgeschlagen(
                    self.identity.to_string(),
                ))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Ereignisarten und Publikum
// ---------------------------------------------------------------------------

/// Art eines verteilten Ereignisses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EreignisArt {
    Chat,
    File,
    Voice,
    Video,
    PresenceJoined,
    PresenceLeft,
    SpeakerChanged,
}

impl EreignisArt {
    /// Medien gehen nie an den Absender zurueck
    pub fn sender_ausgeschlossen(self) -> bool {
        matches!(self, Self::Voice | Self::Video)
    }

    /// Label fuer `easyconnect_events_relayed_total{kind}`
    pub fn label(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::File => "file",
            Self::Voice => "voice",
            Self::Video => "video",
            Self::PresenceJoined => "presence_joined",
            Self::PresenceLeft => "presence_left",
            Self::SpeakerChanged => "speaker_changed",
        }
    }
}

/// Ereignis mit fertig berechnetem Publikum
#[derive(Debug, Clone)]
pub struct Ausgang {
    pub art: EreignisArt,
    pub raum: RoomId,
    pub empfaenger: Vec<ClientSender>,
    pub nachricht: ControlMessage,
}

impl Ausgang {
    /// Berechnet das Publikum aus den Raummitgliedern
    ///
    /// Muss unter der Zustandssperre aufgerufen werden. Mitglieder ohne
    /// gebundenen Ereigniskanal werden uebersprungen.
    pub fn berechnen(
        art: EreignisArt,
        raum: &RoomId,
        mitglieder: &[Identity],
        absender: Option<&Identity>,
        registry: &SessionRegistry,
        nachricht: ControlMessage,
    ) -> Self {
        let empfaenger = mitglieder
            .iter()
            .filter(|m| !(art.sender_ausgeschlossen() && Some(*m) == absender))
            .filter_map(|m| {
                let sender = registry.sender(m);
                if sender.is_none() {
                    tracing::trace!(identity = %m, "Kein Ereigniskanal gebunden – uebersprungen");
                }
                sender
            })
            .collect();

        Self {
            art,
            raum: raum.clone(),
            empfaenger,
            nachricht,
        }
    }
}

// ---------------------------------------------------------------------------
// BroadcastRelay
// ---------------------------------------------------------------------------

/// Ergebnis einer Zustellung
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZustellBericht {
    pub zugestellt: usize,
    pub fehlgeschlagen: usize,
}

impl std::ops::AddAssign for ZustellBericht {
    fn add_assign(&mut self, rhs: Self) {
        self.zugestellt += rhs.zugestellt;
        self.fehlgeschlagen += rhs.fehlgeschlagen;
    }
}

/// Stellt berechnete Ereignisse an ihre Empfaenger zu
#[derive(Clone, Default)]
pub struct BroadcastRelay {
    metriken: Option<CoordinatorMetrics>,
}

impl BroadcastRelay {
    pub fn neu(metriken: Option<CoordinatorMetrics>) -> Self {
        Self { metriken }
    }

    /// Stellt ein Ereignis an jeden Empfaenger einzeln zu
    pub fn zustellen(&self, ausgang: Ausgang) -> ZustellBericht {
        let mut bericht = ZustellBericht::default();
        for empfaenger in &ausgang.empfaenger {
            match empfaenger.senden(ausgang.nachricht.clone()) {
                Ok(()) => bericht.zugestellt += 1,
                Err(e) => {
                    bericht.fehlgeschlagen += 1;
                    tracing::debug!(
                        raum = %ausgang.raum,
                        art = ausgang.art.label(),
                        fehler = %e,
                        "Zustellung uebersprungen"
                    );
                }
            }
        }

        if let Some(m) = &self.metriken {
            m.ereignis_gezaehlt(ausgang.art.label(), bericht.fehlgeschlagen);
        }

        tracing::trace!(
            raum = %ausgang.raum,
            art = ausgang.art.label(),
            zugestellt = bericht.zugestellt,
            fehlgeschlagen = bericht.fehlgeschlagen,
            "Ereignis verteilt"
        );
        bericht
    }

    /// Stellt mehrere Ereignisse in der gegebenen Reihenfolge zu
    pub fn alle_zustellen(&self, ausgaenge: Vec<Ausgang>) -> ZustellBericht {
        let mut gesamt = ZustellBericht::default();
        for ausgang in ausgaenge {
            gesamt += self.zustellen(ausgang);
        }
        gesamt
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
