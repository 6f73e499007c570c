//! Track: an ordered, tick-indexed event store

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TicklineError};
use crate::event::{EventId, EventKind, EventSlot, NewEvent, Tick, TrackEvent};

/// A track in the song
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "TrackData")]
pub struct Track {
    pub name: String,
    /// MIDI channel (0-15); `None` for the conductor track
    channel: Option<u8>,
    /// Sorted by tick; equal ticks keep insertion order
    events: Vec<TrackEvent>,
    next_event_id: u64,
    /// Never shrinks on removal
    #[serde(skip)]
    longest_note: Tick,
}

#[derive(Deserialize)]
struct TrackData {
    name: String,
    channel: Option<u8>,
    events: Vec<TrackEvent>,
    next_event_id: u64,
}

impl From<TrackData> for Track {
    fn from(data: TrackData) -> Self {
        let longest_note = data.events.iter().map(|e| e.duration()).max().unwrap_or(0);
        Self {
            name: data.name,
            channel: data.channel,
            events: data.events,
            next_event_id: data.next_event_id,
            longest_note,
        }
    }
}

impl Track {
    pub fn new(name: impl Into<String>, channel: u8) -> Result<Self> {
        if channel > 15 {
            return Err(TicklineError::InvalidChannel(channel));
        }
        Ok(Self {
            name: name.into(),
            channel: Some(channel),
            events: Vec::new(),
            next_event_id: 0,
            longest_note: 0,
        })
    }

    /// Track carrying tempo and time signature events only
    pub fn conductor() -> Self {
        Self {
            name: "Conductor".to_string(),
            channel: None,
            events: Vec::new(),
            next_event_id: 0,
            longest_note: 0,
        }
    }

    pub fn is_conductor(&self) -> bool {
        self.channel.is_none()
    }

    pub fn channel(&self) -> Option<u8> {
        self.channel
    }

    pub fn events(&self) -> &[TrackEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get_event(&self, id: EventId) -> Option<&TrackEvent> {
        self.events.iter().find(|e| e.id == id)
    }

    /// Insert after any events already at the same tick
    pub fn add_event(&mut self, event: NewEvent) -> EventId {
        let id = EventId(self.next_event_id);
        self.next_event_id += 1;
        self.insert_sorted(TrackEvent { id, tick: event.tick, kind: event.kind });
        id
    }

    /// Overwrite the event of the same slot at `event.tick`, or insert a new one.
    /// Returns the id of the written event.
    pub fn create_or_update(&mut self, event: NewEvent) -> EventId {
        let slot = event.kind.slot();
        let start = self.events.partition_point(|e| e.tick < event.tick);
        let end = self.events.partition_point(|e| e.tick <= event.tick);
        let existing = self.events[start..end]
            .iter_mut()
            .find(|e| e.kind.slot() == slot);

        match existing {
            Some(existing) => {
                existing.kind = event.kind;
                let id = existing.id;
                self.widen_longest_note(event.kind);
                id
            }
            None => self.add_event(event),
        }
    }

    pub fn remove_event(&mut self, id: EventId) -> Option<TrackEvent> {
        let pos = self.events.iter().position(|e| e.id == id)?;
        Some(self.events.remove(pos))
    }

    /// Remove every listed event, returning how many were present
    pub fn remove_events(&mut self, ids: &[EventId]) -> usize {
        let before = self.events.len();
        self.events.retain(|e| !ids.contains(&e.id));
        before - self.events.len()
    }

    /// Replace the payload of an event in place
    pub fn update_event(&mut self, id: EventId, kind: EventKind) -> bool {
        let Some(event) = self.events.iter_mut().find(|e| e.id == id) else {
            return false;
        };
        event.kind = kind;
        self.widen_longest_note(kind);
        true
    }

    /// Move an event to a new tick, keeping its id and payload
    pub fn move_event(&mut self, id: EventId, tick: Tick) -> bool {
        let Some(mut event) = self.remove_event(id) else {
            return false;
        };
        event.tick = tick;
        self.insert_sorted(event);
        true
    }

    /// Events with `start <= tick < end`, in tick order
    pub fn events_in_range(&self, start: Tick, end: Tick) -> &[TrackEvent] {
        let (from, to) = self.range_bounds(start, end);
        &self.events[from..to]
    }

    /// Events starting in `[start, end)` plus every earlier event that may
    /// still sound there. Callers filter the earlier ones by `end_tick`.
    pub fn events_reaching(&self, start: Tick, end: Tick) -> &[TrackEvent] {
        self.events_in_range(start.saturating_sub(self.longest_note), end)
    }

    /// Latest event of every continuous slot at or before `tick`,
    /// ordered controllers first (by number), then program, pitch bend, tempo
    pub fn status_events(&self, tick: Tick) -> Vec<&TrackEvent> {
        let upto = self.events.partition_point(|e| e.tick <= tick);
        let mut latest: BTreeMap<EventSlot, &TrackEvent> = BTreeMap::new();
        for event in self.events[..upto].iter().filter(|e| e.kind.is_continuous()) {
            latest.insert(event.kind.slot(), event);
        }
        latest.into_values().collect()
    }

    /// Last tick touched by any event (note ends included)
    pub fn end_of_track(&self) -> Tick {
        self.events.iter().map(|e| e.end_tick()).max().unwrap_or(0)
    }

    fn insert_sorted(&mut self, event: TrackEvent) {
        self.widen_longest_note(event.kind);
        let idx = self.events.partition_point(|e| e.tick <= event.tick);
        self.events.insert(idx, event);
    }

    fn widen_longest_note(&mut self, kind: EventKind) {
        if let EventKind::Note { duration, .. } = kind {
            self.longest_note = self.longest_note.max(duration);
        }
    }

    fn range_bounds(&self, start: Tick, end: Tick) -> (usize, usize) {
        if end <= start {
            return (0, 0);
        }
        let from = self.events.partition_point(|e| e.tick < start);
        let to = self.events.partition_point(|e| e.tick < end);
        (from, to)
    }
}
