//! Sprecher-Slot eines Raums
//!
//! Zustandsautomat `Idle | Spricht(identity)`. Jede Anforderung verdraengt
//! den bisherigen Sprecher sofort (letzter gewinnt, keine Warteschlange).
//! Gleichzeitige Anforderungen werden in Ankunftsreihenfolge am Coordinator
//! entschieden; es gibt keine Fairness- oder Reihenfolge-Garantie.

use easyconnect_core::types::Identity;

/// Belegung des Sprecher-Slots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SprecherSlot {
    #[default]
    Idle,
    Spricht(Identity),
}

/// Ergebnis eines Uebergangs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SprecherWechsel {
    pub vorher: Option<Identity>,
    pub nachher: Option<Identity>,
}

impl SprecherWechsel {
    /// `true` wenn sich die Belegung tatsaechlich geaendert hat
    pub fn geaendert(&self) -> bool {
        self.vorher != self.nachher
    }

    fn unveraendert(aktuell: Option<Identity>) -> Self {
        Self {
            vorher: aktuell.clone(),
            nachher: aktuell,
        }
    }
}

impl SprecherSlot {
    pub fn aktuell(&self) -> Option<&Identity> {
        match self {
            Self::Idle => None,
            Self::Spricht(id) => Some(id),
        }
    }

    pub fn ist_sprecher(&self, identity: &Identity) -> bool {
        self.aktuell() == Some(identity)
    }

    /// `Idle -> Spricht(id)` bzw. `Spricht(anderer) -> Spricht(id)`
    pub fn anfordern(&mut self, identity: &Identity) -> SprecherWechsel {
        let vorher = self.aktuell().cloned();
        *self = Self::Spricht(identity.clone());
        SprecherWechsel {
            vorher,
            nachher: Some(identity.clone()),
        }
    }

    /// `Spricht(id) -> Idle`; fuer jeden anderen Zustand ein No-op
    pub fn freigeben(&mut self, identity: &Identity) -> SprecherWechsel {
        if !self.ist_sprecher(identity) {
            return SprecherWechsel::unveraendert(self.aktuell().cloned());
        }
        *self = Self::Idle;
        SprecherWechsel {
            vorher: Some(identity.clone()),
            nachher: None,
        }
    }
}
