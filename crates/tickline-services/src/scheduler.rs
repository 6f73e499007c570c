//! Lookahead scheduling of playback events against wall-clock time

use std::collections::VecDeque;

use tickline_core::tempo::{millis_to_ticks, ticks_to_millis, usec_per_beat_to_bpm, DEFAULT_BPM, MIN_BPM};
use tickline_core::{EventSource, MidiMessage, PlayerEvent, Tick};

/// Loop region `[start, end)` in ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopRegion {
    pub start: Tick,
    pub end: Tick,
}

impl LoopRegion {
    pub fn new(start: Tick, end: Tick) -> Option<Self> {
        (end > start).then_some(Self { start, end })
    }

    pub fn len(&self) -> Tick {
        self.end - self.start
    }
}

/// A playback event with the time it should be sent at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledEvent {
    pub event: PlayerEvent,
    /// Same clock as the timestamps passed to `read_next_events`
    pub timestamp_ms: f64,
}

/// Tempo change handed out but not yet reached by the play head.
/// Ticks past a pending loop wrap are unwrapped (offset by the loop length).
#[derive(Debug, Clone, Copy, PartialEq)]
struct TempoChange {
    tick: f64,
    bpm: f64,
}

/// Advances a play head with elapsed time and hands out every event between
/// the last scheduled tick and `lookahead_ms` past the play head.
#[derive(Debug, Clone)]
pub struct EventScheduler {
    timebase: u32,
    lookahead_ms: f64,
    current_tick: f64,
    scheduled_tick: Tick,
    prev_time: Option<f64>,
    loop_region: Option<LoopRegion>,
    /// Set once the schedule has wrapped but the play head has not yet
    pending_wrap: Option<Tick>,
    /// Tempo at the play head
    bpm: f64,
    tempo_changes: VecDeque<TempoChange>,
}

impl EventScheduler {
    pub fn new(start_tick: Tick, timebase: u32, lookahead_ms: f64) -> Self {
        Self {
            timebase,
            lookahead_ms,
            current_tick: start_tick as f64,
            scheduled_tick: start_tick,
            prev_time: None,
            loop_region: None,
            pending_wrap: None,
            bpm: DEFAULT_BPM,
            tempo_changes: VecDeque::new(),
        }
    }

    pub fn current_tick(&self) -> Tick {
        self.current_tick as Tick
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn loop_region(&self) -> Option<LoopRegion> {
        self.loop_region
    }

    /// Change the loop without rescheduling what was already handed out.
    /// The schedule only moves back when it ran past the new loop end.
    pub fn set_loop_region(&mut self, region: Option<LoopRegion>) {
        if let (Some(old), Some(_)) = (self.loop_region, self.pending_wrap.take()) {
            self.scheduled_tick = old.end;
            self.drop_tempo_changes_from(old.end);
        }
        if let Some(region) = region {
            if self.scheduled_tick > region.end && self.current_tick < region.end as f64 {
                self.scheduled_tick = region.end;
                self.drop_tempo_changes_from(region.end);
            }
        }
        self.loop_region = region;
    }

    /// Jump the play head to `tick` playing at `bpm`; the next read starts
    /// scheduling from `tick`
    pub fn seek(&mut self, tick: Tick, bpm: f64) {
        self.current_tick = tick as f64;
        self.scheduled_tick = tick;
        self.prev_time = None;
        self.pending_wrap = None;
        self.bpm = bpm.max(MIN_BPM);
        self.tempo_changes.clear();
    }

    pub fn read_next_events(&mut self, source: &dyn EventSource, timestamp_ms: f64) -> Vec<ScheduledEvent> {
        let elapsed = (timestamp_ms - self.prev_time.unwrap_or(timestamp_ms)).max(0.0);
        self.prev_time = Some(timestamp_ms);
        self.advance(elapsed);

        if let (Some(len), Some(region)) = (self.pending_wrap, self.loop_region) {
            if self.current_tick >= region.end as f64 {
                self.current_tick -= len as f64;
                for change in &mut self.tempo_changes {
                    change.tick -= len as f64;
                }
                self.pending_wrap = None;
            }
        }

        let horizon = self.tick_after(self.lookahead_ms).floor() as Tick;
        let end = horizon.saturating_sub(self.pending_wrap.unwrap_or(0));
        let start = self.scheduled_tick;
        if end <= start {
            return Vec::new();
        }

        match self.loop_region {
            Some(region) if self.pending_wrap.is_none() && start <= region.end && end >= region.end => {
                let wrapped_end = region.start + (end - region.end);
                let mut scheduled = self.stamp(source.get_events(start, region.end), 0, timestamp_ms);
                // the replay starts at the tempo in effect at the loop start
                self.push_tempo(region.end as f64, source.tempo_at(region.start));
                scheduled.extend(self.stamp(
                    source.get_events(region.start, wrapped_end),
                    region.len(),
                    timestamp_ms,
                ));
                self.pending_wrap = Some(region.len());
                self.scheduled_tick = wrapped_end;
                scheduled
            }
            _ => {
                let offset = self.pending_wrap.unwrap_or(0);
                self.scheduled_tick = end;
                self.stamp(source.get_events(start, end), offset, timestamp_ms)
            }
        }
    }

    /// Move the play head by `millis`, crossing any tempo changes on the way
    fn advance(&mut self, mut millis: f64) {
        while let Some(change) = self.tempo_changes.front().copied() {
            let ahead = (change.tick - self.current_tick).max(0.0);
            let until_change = ticks_to_millis(ahead, self.bpm, self.timebase);
            if until_change > millis {
                break;
            }
            millis -= until_change;
            self.current_tick += ahead;
            self.bpm = change.bpm;
            self.tempo_changes.pop_front();
        }
        self.current_tick += millis_to_ticks(millis, self.bpm, self.timebase);
    }

    /// Time from the play head to `tick`; a change at `tick` itself does not apply
    fn millis_until(&self, tick: f64) -> f64 {
        let mut from = self.current_tick;
        let mut bpm = self.bpm;
        let mut millis = 0.0;
        for change in self.tempo_changes.iter().take_while(|c| c.tick < tick) {
            millis += ticks_to_millis((change.tick - from).max(0.0), bpm, self.timebase);
            from = from.max(change.tick);
            bpm = change.bpm;
        }
        millis + ticks_to_millis((tick - from).max(0.0), bpm, self.timebase)
    }

    /// Tick the play head will be at `millis` from now
    fn tick_after(&self, millis: f64) -> f64 {
        let mut tick = self.current_tick;
        let mut bpm = self.bpm;
        let mut left = millis;
        for change in &self.tempo_changes {
            let span = ticks_to_millis((change.tick - tick).max(0.0), bpm, self.timebase);
            if span > left {
                break;
            }
            left -= span;
            tick = tick.max(change.tick);
            bpm = change.bpm;
        }
        tick + millis_to_ticks(left, bpm, self.timebase)
    }

    fn stamp(&mut self, events: Vec<PlayerEvent>, offset: Tick, timestamp_ms: f64) -> Vec<ScheduledEvent> {
        events
            .into_iter()
            .map(|event| {
                let tick = event.tick.saturating_add(offset) as f64;
                let scheduled = ScheduledEvent {
                    event,
                    timestamp_ms: timestamp_ms + self.millis_until(tick),
                };
                if let MidiMessage::SetTempo { microseconds_per_beat } = event.message {
                    self.push_tempo(tick, usec_per_beat_to_bpm(microseconds_per_beat));
                }
                scheduled
            })
            .collect()
    }

    fn push_tempo(&mut self, tick: f64, bpm: f64) {
        let current = self.tempo_changes.back().map_or(self.bpm, |c| c.bpm);
        if bpm != current {
            self.tempo_changes.push_back(TempoChange { tick, bpm });
        }
    }

    fn drop_tempo_changes_from(&mut self, tick: Tick) {
        self.tempo_changes.retain(|c| c.tick < tick as f64);
    }
}
