//! Range mutation: turning drag strokes into event edits on a track.
//!
//! A stroke is a segment between two domain points. Painting a stroke over a
//! continuous curve (CC, pitch bend, tempo) clears the curve's events inside
//! `[min_tick, max_tick)` and anchors both ends with create-or-update writes,
//! so repeated or overlapping strokes never stack duplicate events.

use tracing::debug;

use crate::event::{EventId, EventKind, NewEvent, Tick};
use crate::quantizer::Quantize;
use crate::tempo::{bpm_to_usec_per_beat, usec_per_beat_to_bpm, MIN_BPM};
use crate::track::Track;
use crate::transform::DomainPoint;

/// Capability of an event kind that forms an editable value curve
pub trait ContinuousKind {
    /// Whether a stored event belongs to this curve
    fn matches(&self, kind: &EventKind) -> bool;

    /// Payload for a domain value already within `[min_value, max_value]`
    fn to_event(&self, value: f64) -> EventKind;

    /// Domain value of a stored event of this curve
    fn value_of(&self, kind: &EventKind) -> Option<f64>;

    fn max_value(&self) -> f64;

    fn min_value(&self) -> f64 {
        0.0
    }

    fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min_value(), self.max_value())
    }
}

/// Controller lane value types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueEventType {
    Controller(u8),
    PitchBend,
}

impl ContinuousKind for ValueEventType {
    fn matches(&self, kind: &EventKind) -> bool {
        match (self, kind) {
            (Self::Controller(n), EventKind::ControlChange { controller, .. }) => n == controller,
            (Self::PitchBend, EventKind::PitchBend { .. }) => true,
            _ => false,
        }
    }

    fn to_event(&self, value: f64) -> EventKind {
        let value = self.clamp(value).round();
        match *self {
            Self::Controller(controller) => EventKind::ControlChange { controller, value: value as u8 },
            Self::PitchBend => EventKind::PitchBend { value: value as u16 },
        }
    }

    fn value_of(&self, kind: &EventKind) -> Option<f64> {
        match (self, kind) {
            (Self::Controller(n), EventKind::ControlChange { controller, value }) if n == controller => {
                Some(*value as f64)
            }
            (Self::PitchBend, EventKind::PitchBend { value }) => Some(*value as f64),
            _ => None,
        }
    }

    fn max_value(&self) -> f64 {
        match self {
            Self::Controller(_) => 127.0,
            Self::PitchBend => 16383.0,
        }
    }
}

/// Tempo curve on the conductor track; values are BPM
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoCurve {
    pub max_bpm: f64,
}

impl ContinuousKind for TempoCurve {
    fn matches(&self, kind: &EventKind) -> bool {
        matches!(kind, EventKind::SetTempo { .. })
    }

    fn to_event(&self, bpm: f64) -> EventKind {
        EventKind::SetTempo { microseconds_per_beat: bpm_to_usec_per_beat(self.clamp(bpm)) }
    }

    fn value_of(&self, kind: &EventKind) -> Option<f64> {
        match kind {
            EventKind::SetTempo { microseconds_per_beat } => {
                Some(usec_per_beat_to_bpm(*microseconds_per_beat))
            }
            _ => None,
        }
    }

    fn max_value(&self) -> f64 {
        self.max_bpm
    }

    fn min_value(&self) -> f64 {
        MIN_BPM
    }
}

/// Segment of a drag between two successive pointer samples
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub from: DomainPoint,
    pub to: DomainPoint,
}

impl Stroke {
    pub fn new(last_tick: i64, last_value: f64, tick: i64, value: f64) -> Self {
        Self {
            from: DomainPoint { tick: last_tick, value: last_value },
            to: DomainPoint { tick, value },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.from.tick == self.to.tick
    }

    /// Tick bounds clamped to the timeline, lowest first
    pub fn tick_bounds(&self) -> (Tick, Tick) {
        let a = self.from.tick.max(0) as Tick;
        let b = self.to.tick.max(0) as Tick;
        (a.min(b), a.max(b))
    }

    /// Value of the straight line through both samples at `tick`
    pub fn value_at(&self, tick: Tick) -> f64 {
        if self.is_empty() {
            return self.to.value;
        }
        let span = (self.to.tick - self.from.tick) as f64;
        let t = (tick as i64 - self.from.tick) as f64 / span;
        self.from.value + (self.to.value - self.from.value) * t
    }
}

/// Result of a paint call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaintOutcome {
    pub removed: usize,
    pub written: Vec<EventId>,
}

impl PaintOutcome {
    pub fn is_noop(&self) -> bool {
        self.removed == 0 && self.written.is_empty()
    }
}

/// Write a single curve point at the quantized tick
pub fn write_point<K: ContinuousKind + ?Sized>(
    track: &mut Track,
    quantizer: &dyn Quantize,
    kind: &K,
    point: DomainPoint,
) -> EventId {
    let tick = quantizer.round(point.tick);
    track.create_or_update(NewEvent::new(tick, kind.to_event(point.value)))
}

/// Paint a stroke over a continuous curve.
///
/// Events of the curve with `min_tick <= tick < max_tick` are removed, then
/// the quantized boundary ticks are written with the line's values there.
/// An empty stroke (`from.tick == to.tick`) leaves the track untouched.
pub fn update_events_in_range<K: ContinuousKind + ?Sized>(
    track: &mut Track,
    quantizer: &dyn Quantize,
    kind: &K,
    stroke: Stroke,
) -> PaintOutcome {
    let (start, end) = stroke.tick_bounds();
    if start == end {
        return PaintOutcome::default();
    }

    let start_key = quantizer.round(start as i64);
    let end_key = quantizer.round(end as i64);

    // boundary events are overwritten below, not removed, so their ids survive
    let doomed: Vec<EventId> = track
        .events_in_range(start, end)
        .iter()
        .filter(|e| kind.matches(&e.kind))
        .filter(|e| e.tick != start_key && e.tick != end_key)
        .map(|e| e.id)
        .collect();
    let removed = track.remove_events(&doomed);

    let written = if start_key == end_key {
        vec![track.create_or_update(NewEvent::new(end_key, kind.to_event(stroke.to.value)))]
    } else {
        vec![
            track.create_or_update(NewEvent::new(start_key, kind.to_event(stroke.value_at(start)))),
            track.create_or_update(NewEvent::new(end_key, kind.to_event(stroke.value_at(end)))),
        ]
    };

    debug!(start, end, removed, "painted curve range");
    PaintOutcome { removed, written }
}

/// Set interpolated velocities on every note starting within
/// `[min_tick, max_tick]`. Returns the number of notes changed.
pub fn update_velocities_in_range(track: &mut Track, stroke: Stroke) -> usize {
    if stroke.from.tick < 0 && stroke.to.tick < 0 {
        return 0;
    }
    let (start, end) = stroke.tick_bounds();
    let updates: Vec<(EventId, EventKind)> = track
        .events_in_range(start, end.saturating_add(1))
        .iter()
        .filter_map(|e| match e.kind {
            EventKind::Note { note_number, duration, .. } => {
                let velocity = clamp_velocity(stroke.value_at(e.tick));
                Some((e.id, EventKind::Note { note_number, velocity, duration }))
            }
            _ => None,
        })
        .collect();

    for (id, kind) in &updates {
        track.update_event(*id, *kind);
    }
    updates.len()
}

/// Set the same velocity on every listed note
pub fn change_notes_velocity(track: &mut Track, ids: &[EventId], value: f64) -> usize {
    let velocity = clamp_velocity(value);
    let mut changed = 0;
    for &id in ids {
        let Some(EventKind::Note { note_number, duration, .. }) = track.get_event(id).map(|e| e.kind) else {
            continue;
        };
        track.update_event(id, EventKind::Note { note_number, velocity, duration });
        changed += 1;
    }
    changed
}

/// Set the same value on every listed event that belongs to `kind`'s curve
pub fn change_events_value<K: ContinuousKind + ?Sized>(
    track: &mut Track,
    ids: &[EventId],
    kind: &K,
    value: f64,
) -> usize {
    let payload = kind.to_event(value);
    let mut changed = 0;
    for &id in ids {
        if !track.get_event(id).is_some_and(|e| kind.matches(&e.kind)) {
            continue;
        }
        track.update_event(id, payload);
        changed += 1;
    }
    changed
}

fn clamp_velocity(value: f64) -> u8 {
    value.clamp(0.0, 127.0).round() as u8
}
