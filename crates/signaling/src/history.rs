//! Chat-Verlauf – begrenzter Ringpuffer der letzten Nachrichten
//!
//! Ein Puffer je Coordinator; jede Nachricht kennt ihren Raum. Beim Beitritt
//! erhaelt ein Client die Nachrichten seines Ziel-Raums (aelteste zuerst),
//! gekuerzt auf das, was noch in den Antwort-Frame passt.

use easyconnect_core::types::RoomId;
use easyconnect_protocol::control::ChatMessage;
use easyconnect_protocol::wire::kodierte_laenge;
use std::collections::VecDeque;

/// Standard-Kapazitaet des Verlaufs
pub const STANDARD_KAPAZITAET: usize = 100;

#[derive(Debug, Clone)]
pub struct ChatVerlauf {
    kapazitaet: usize,
    eintraege: VecDeque<ChatMessage>,
}

impl ChatVerlauf {
    pub fn neu(kapazitaet: usize) -> Self {
        Self {
            kapazitaet,
            eintraege: VecDeque::with_capacity(kapazitaet),
        }
    }

    /// Haengt eine Nachricht an, die aelteste faellt bei voller Kapazitaet heraus
    pub fn anhaengen(&mut self, nachricht: ChatMessage) {
        if self.kapazitaet == 0 {
            return;
        }
        while self.eintraege.len() >= self.kapazitaet {
            self.eintraege.pop_front();
        }
        self.eintraege.push_back(nachricht);
    }

    /// Neueste Nachrichten eines Raums in Eingangsreihenfolge
    ///
    /// Kodiert als JSON-Liste belegen sie hoechstens `budget` Bytes. Die
    /// Auswahl endet an der ersten Nachricht, die nicht mehr passt, damit
    /// keine Luecken im Verlauf entstehen.
    pub fn fuer_raum_begrenzt(&self, raum: &RoomId, budget: usize) -> Vec<ChatMessage> {
        let mut belegt = 0usize;
        let mut auswahl: Vec<ChatMessage> = Vec::new();

        for nachricht in self.eintraege.iter().rev().filter(|n| &n.room_id == raum) {
            // +1 fuer das trennende Komma
            let kosten = match kodierte_laenge(nachricht) {
                Ok(laenge) => laenge + 1,
                Err(_) => break,
            };
            if belegt + kosten > budget {
                break;
            }
            belegt += kosten;
            auswahl.push(nachricht.clone());
        }

        auswahl.reverse();
        auswahl
    }

    pub fn len(&self) -> usize {
        self.eintraege.len()
    }

    pub fn is_empty(&self) -> bool {
        self.eintraege.is_empty()
    }

    pub fn kapazitaet(&self) -> usize {
        self.kapazitaet
    }
}

impl Default for ChatVerlauf {
    fn default() -> Self {
        Self::neu(STANDARD_KAPAZITAET)
    }
}
