//! Tick-indexed track events

use serde::{Deserialize, Serialize};

/// Position on the musical timeline, `timebase` ticks per quarter note
pub type Tick = u64;

/// Event identifier, unique within its track and never reassigned
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(pub u64);

/// Payload of a track event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// A note with its length; expanded to note-on/note-off for playback
    Note {
        note_number: u8,
        velocity: u8,
        duration: Tick,
    },
    ControlChange {
        controller: u8,
        value: u8,
    },
    ProgramChange {
        program: u8,
    },
    /// 14-bit pitch bend, 8192 = center
    PitchBend {
        value: u16,
    },
    SetTempo {
        microseconds_per_beat: u32,
    },
    TimeSignature {
        numerator: u8,
        denominator: u8,
    },
    EndOfTrack,
}

/// Identity of an event for create-or-update purposes.
///
/// Two events with the same slot at the same tick cannot coexist on a track;
/// the later write replaces the earlier payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventSlot {
    Note(u8),
    Controller(u8),
    Program,
    PitchBend,
    Tempo,
    TimeSignature,
    EndOfTrack,
}

impl EventKind {
    pub fn slot(&self) -> EventSlot {
        match *self {
            Self::Note { note_number, .. } => EventSlot::Note(note_number),
            Self::ControlChange { controller, .. } => EventSlot::Controller(controller),
            Self::ProgramChange { .. } => EventSlot::Program,
            Self::PitchBend { .. } => EventSlot::PitchBend,
            Self::SetTempo { .. } => EventSlot::Tempo,
            Self::TimeSignature { .. } => EventSlot::TimeSignature,
            Self::EndOfTrack => EventSlot::EndOfTrack,
        }
    }

    /// Whether the most recent event of this kind defines playback state
    pub fn is_continuous(&self) -> bool {
        matches!(
            self,
            Self::ControlChange { .. }
                | Self::ProgramChange { .. }
                | Self::PitchBend { .. }
                | Self::SetTempo { .. }
        )
    }

    pub fn is_note(&self) -> bool {
        matches!(self, Self::Note { .. })
    }
}

/// An event stored on a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackEvent {
    pub id: EventId,
    pub tick: Tick,
    pub kind: EventKind,
}

impl TrackEvent {
    /// Length in ticks; 0 for anything but notes
    pub fn duration(&self) -> Tick {
        match self.kind {
            EventKind::Note { duration, .. } => duration,
            _ => 0,
        }
    }

    /// Tick at which the event stops sounding (notes) or its own tick
    pub fn end_tick(&self) -> Tick {
        self.tick.saturating_add(self.duration())
    }
}

/// An event waiting to be placed on a track; the track assigns the id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewEvent {
    pub tick: Tick,
    pub kind: EventKind,
}

impl NewEvent {
    pub fn new(tick: Tick, kind: EventKind) -> Self {
        Self { tick, kind }
    }

    pub fn note(tick: Tick, note_number: u8, velocity: u8, duration: Tick) -> Self {
        Self::new(tick, EventKind::Note { note_number, velocity, duration })
    }

    pub fn control_change(tick: Tick, controller: u8, value: u8) -> Self {
        Self::new(tick, EventKind::ControlChange { controller, value })
    }

    pub fn program_change(tick: Tick, program: u8) -> Self {
        Self::new(tick, EventKind::ProgramChange { program })
    }

    pub fn set_tempo(tick: Tick, microseconds_per_beat: u32) -> Self {
        Self::new(tick, EventKind::SetTempo { microseconds_per_beat })
    }

    pub fn time_signature(tick: Tick, numerator: u8, denominator: u8) -> Self {
        Self::new(tick, EventKind::TimeSignature { numerator, denominator })
    }
}
