//! Per-surface selection state shared by the editors

use std::collections::BTreeSet;

use crate::event::{EventId, Tick};

/// Selected events on one editor surface plus the rubber-band region, if any
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurfaceSelection {
    pub ids: BTreeSet<EventId>,
    pub region: Option<(Tick, Tick)>,
}

impl SurfaceSelection {
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.region.is_none()
    }

    pub fn contains(&self, id: EventId) -> bool {
        self.ids.contains(&id)
    }

    pub fn select(&mut self, id: EventId) {
        self.ids.insert(id);
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.region = None;
    }
}

/// Which editor surface an id set belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    PianoRoll,
    Control,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    /// Notes selected in the piano roll (also edited by the velocity lane)
    pub piano_roll: SurfaceSelection,
    /// Events selected in the controller/tempo lane
    pub control: SurfaceSelection,
}

impl SelectionState {
    pub fn surface(&self, surface: Surface) -> &SurfaceSelection {
        match surface {
            Surface::PianoRoll => &self.piano_roll,
            Surface::Control => &self.control,
        }
    }

    pub fn clear_all(&mut self) {
        self.piano_roll.clear();
        self.control.clear();
    }

    /// Clear every surface except `keep`
    pub fn clear_except(&mut self, keep: Surface) {
        match keep {
            Surface::PianoRoll => self.control.clear(),
            Surface::Control => self.piano_roll.clear(),
        }
    }
}
