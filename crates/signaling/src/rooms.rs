//! Raum-Verzeichnis – Mitgliedschaften und Sprecher-Slot je Raum
//!
//! Jede Identitaet ist hoechstens in einem Raum. Raeume entstehen beim ersten
//! Beitritt und werden entfernt sobald sie leer sind.

use easyconnect_core::types::{Identity, RoomId};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::speaker::{SprecherSlot, SprecherWechsel};

/// Ein Raum mit Mitgliedern und eigenem Sprecher-Slot
#[derive(Debug, Clone, Default)]
pub struct Raum {
    mitglieder: BTreeSet<Identity>,
    sprecher: SprecherSlot,
}

impl Raum {
    pub fn mitglieder(&self) -> &BTreeSet<Identity> {
        &self.mitglieder
    }

    pub fn sprecher(&self) -> Option<&Identity> {
        self.sprecher.aktuell()
    }
}

/// Ergebnis eines Austritts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Austritt {
    pub raum: RoomId,
    /// Gesetzt wenn der Austretende den Sprecher-Slot hielt
    pub sprecher_wechsel: Option<SprecherWechsel>,
    pub raum_entfernt: bool,
}

/// Verzeichnis aller nicht-leeren Raeume
#[derive(Debug, Default)]
pub struct RoomDirectory {
    raeume: BTreeMap<RoomId, Raum>,
    /// identity -> room
    index: HashMap<Identity, RoomId>,
}

impl RoomDirectory {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Verschiebt `identity` nach `raum`
    ///
    /// Gibt den Austritt aus dem bisherigen Raum zurueck. Ist die Identitaet
    /// bereits in `raum`, passiert nichts und das Ergebnis ist `None`.
    pub fn beitreten(&mut self, identity: &Identity, raum: &RoomId) -> Option<Austritt> {
        let austritt = match self.index.get(identity) {
            Some(aktuell) if aktuell == raum => return None,
            Some(aktuell) => {
                let alt = aktuell.clone();
                self.verlassen(identity, &alt)
            }
            None => None,
        };

        self.raeume
            .entry(raum.clone())
            .or_default()
            .mitglieder
            .insert(identity.clone());
        self.index.insert(identity.clone(), raum.clone());

        tracing::debug!(identity = %identity, raum = %raum, "Raum beigetreten");
        austritt
    }

    /// Entfernt `identity` aus `raum`; raeumt leere Raeume ab
    ///
    /// `None` wenn die Identitaet nicht Mitglied des Raums war.
    pub fn verlassen(&mut self, identity: &Identity, raum: &RoomId) -> Option<Austritt> {
        let eintrag = self.raeume.get_mut(raum)?;
        if !eintrag.mitglieder.remove(identity) {
            return None;
        }
        self.index.remove(identity);

        let sprecher_wechsel = eintrag
            .sprecher
            .ist_sprecher(identity)
            .then(|| eintrag.sprecher.freigeben(identity));

        let raum_entfernt = eintrag.mitglieder.is_empty();
        if raum_entfernt {
            self.raeume.remove(raum);
            tracing::debug!(raum = %raum, "Leerer Raum entfernt");
        }

        Some(Austritt {
            raum: raum.clone(),
            sprecher_wechsel,
            raum_entfernt,
        })
    }

    /// Mitglieder eines Raums (sortiert, leer fuer unbekannte Raeume)
    pub fn mitglieder(&self, raum: &RoomId) -> Vec<Identity> {
        self.raeume
            .get(raum)
            .map(|r| r.mitglieder.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn raum_von(&self, identity: &Identity) -> Option<&RoomId> {
        self.index.get(identity)
    }

    pub fn raum(&self, raum: &RoomId) -> Option<&Raum> {
        self.raeume.get(raum)
    }

    pub fn raeume(&self) -> impl Iterator<Item = (&RoomId, &Raum)> {
        self.raeume.iter()
    }

    pub fn anzahl(&self) -> usize {
        self.raeume.len()
    }

    /// Sprecher-Anforderung im Raum; die Identitaet muss Mitglied sein
    pub fn sprechen_anfordern(
        &mut self,
        identity: &Identity,
        raum: &RoomId,
    ) -> Option<SprecherWechsel> {
        let eintrag = self.raeume.get_mut(raum)?;
        if !eintrag.mitglieder.contains(identity) {
            return None;
        }
        Some(eintrag.sprecher.anfordern(identity))
    }

    /// Sprecher-Freigabe im Raum; die Identitaet muss Mitglied sein
    pub fn sprechen_freigeben(
        &mut self,
        identity: &Identity,
        raum: &RoomId,
    ) -> Option<SprecherWechsel> {
        let eintrag = self.raeume.get_mut(raum)?;
        if !eintrag.mitglieder.contains(identity) {
            return None;
        }
        Some(eintrag.sprecher.freigeben(identity))
    }
}
