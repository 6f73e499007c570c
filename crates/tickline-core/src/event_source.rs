//! Playback view of a song: tick-ordered playable events and seek state

use crate::event::{EventKind, Tick};
use crate::measure::{beats_in_range, Beat};
use crate::song::Song;

/// Track id carried by synthesized metronome clicks
pub const METRONOME_TRACK_ID: usize = 99999;

/// General MIDI percussion channel
pub const METRONOME_CHANNEL: u8 = 9;

const ALL_NOTES_OFF: u8 = 123;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8, velocity: u8 },
    ControlChange { controller: u8, value: u8 },
    ProgramChange { program: u8 },
    PitchBend { value: u16 },
    /// Meta message for the scheduler; never sent to an instrument
    SetTempo { microseconds_per_beat: u32 },
}

impl MidiMessage {
    pub fn all_notes_off() -> Self {
        Self::ControlChange { controller: ALL_NOTES_OFF, value: 0 }
    }

    pub fn is_meta(&self) -> bool {
        matches!(self, Self::SetTempo { .. })
    }

    /// Wire bytes on `channel`, or `None` for meta messages
    pub fn to_bytes(&self, channel: u8) -> Option<Vec<u8>> {
        let ch = channel & 0x0f;
        let bytes = match *self {
            Self::NoteOn { note, velocity } => vec![0x90 | ch, note & 0x7f, velocity & 0x7f],
            Self::NoteOff { note, velocity } => vec![0x80 | ch, note & 0x7f, velocity & 0x7f],
            Self::ControlChange { controller, value } => vec![0xb0 | ch, controller & 0x7f, value & 0x7f],
            Self::ProgramChange { program } => vec![0xc0 | ch, program & 0x7f],
            Self::PitchBend { value } => vec![0xe0 | ch, (value & 0x7f) as u8, ((value >> 7) & 0x7f) as u8],
            Self::SetTempo { .. } => return None,
        };
        Some(bytes)
    }
}

/// An event scheduled at a tick. Meta messages carry the track's channel
/// (0 on the conductor) which receivers ignore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerEvent {
    pub tick: Tick,
    pub track_id: usize,
    pub channel: u8,
    pub message: MidiMessage,
}

/// An event to send right away, with no position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendableEvent {
    pub track_id: usize,
    pub channel: u8,
    pub message: MidiMessage,
}

pub trait EventSource {
    fn timebase(&self) -> u32;

    fn end_of_song(&self) -> Tick;

    /// Tempo in BPM at `tick`
    fn tempo_at(&self, tick: Tick) -> f64;

    /// Playable events with `start <= tick < end`, metronome included
    fn get_events(&self, start: Tick, end: Tick) -> Vec<PlayerEvent>;

    /// Continuous state (controllers, program, pitch bend) in effect at `tick`
    fn get_current_state_events(&self, tick: Tick) -> Vec<SendableEvent>;
}

/// Sort key: tick, then track, then note-offs of earlier notes, then track order
type OrderKey = (Tick, usize, u8, usize);

impl EventSource for Song {
    fn timebase(&self) -> u32 {
        Song::timebase(self)
    }

    fn end_of_song(&self) -> Tick {
        Song::end_of_song(self)
    }

    fn tempo_at(&self, tick: Tick) -> f64 {
        Song::tempo_at(self, tick)
    }

    fn get_events(&self, start: Tick, end: Tick) -> Vec<PlayerEvent> {
        if end <= start {
            return Vec::new();
        }

        let mut keyed: Vec<(OrderKey, PlayerEvent)> = Vec::new();
        let in_range = |tick: Tick| start <= tick && tick < end;

        for (track_id, track) in self.tracks().iter().enumerate() {
            let channel = track.channel().unwrap_or(0);
            // notes starting before `start` may still end inside the range
            let candidates = track.events_reaching(start, end);

            for (idx, event) in candidates.iter().enumerate() {
                let seq = idx * 2;
                let mut push = |tick: Tick, phase: u8, seq: usize, message: MidiMessage| {
                    keyed.push(((tick, track_id, phase, seq), PlayerEvent { tick, track_id, channel, message }));
                };

                match event.kind {
                    EventKind::Note { note_number, velocity, duration } => {
                        if in_range(event.tick) {
                            push(event.tick, 1, seq, MidiMessage::NoteOn { note: note_number, velocity });
                        }
                        let off = event.end_tick();
                        if in_range(off) {
                            let phase = if duration > 0 { 0 } else { 1 };
                            push(off, phase, seq + 1, MidiMessage::NoteOff { note: note_number, velocity: 0 });
                        }
                    }
                    _ if !in_range(event.tick) => {}
                    EventKind::ControlChange { controller, value } => {
                        push(event.tick, 1, seq, MidiMessage::ControlChange { controller, value });
                    }
                    EventKind::ProgramChange { program } => {
                        push(event.tick, 1, seq, MidiMessage::ProgramChange { program });
                    }
                    EventKind::PitchBend { value } => {
                        push(event.tick, 1, seq, MidiMessage::PitchBend { value });
                    }
                    EventKind::SetTempo { microseconds_per_beat } => {
                        push(event.tick, 1, seq, MidiMessage::SetTempo { microseconds_per_beat });
                    }
                    EventKind::TimeSignature { .. } | EventKind::EndOfTrack => {}
                }
            }
        }

        let beats = beats_in_range(&self.measures(), Song::timebase(self), start, end);
        for (seq, beat) in beats.iter().enumerate() {
            let event = metronome_event(beat);
            keyed.push(((event.tick, METRONOME_TRACK_ID, 1, seq), event));
        }

        keyed.sort_by_key(|(key, _)| *key);
        keyed.into_iter().map(|(_, event)| event).collect()
    }

    fn get_current_state_events(&self, tick: Tick) -> Vec<SendableEvent> {
        self.tracks()
            .iter()
            .enumerate()
            .filter_map(|(track_id, track)| track.channel().map(|channel| (track_id, track, channel)))
            .flat_map(|(track_id, track, channel)| {
                track.status_events(tick).into_iter().filter_map(move |event| {
                    let message = match event.kind {
                        EventKind::ControlChange { controller, value } => {
                            MidiMessage::ControlChange { controller, value }
                        }
                        EventKind::ProgramChange { program } => MidiMessage::ProgramChange { program },
                        EventKind::PitchBend { value } => MidiMessage::PitchBend { value },
                        _ => return None,
                    };
                    Some(SendableEvent { track_id, channel, message })
                })
            })
            .collect()
    }
}

/// Accented click on the downbeat, softer click on the other beats
fn metronome_event(beat: &Beat) -> PlayerEvent {
    let (note, velocity) = if beat.is_downbeat() { (76, 100) } else { (77, 70) };
    PlayerEvent {
        tick: beat.tick,
        track_id: METRONOME_TRACK_ID,
        channel: METRONOME_CHANNEL,
        message: MidiMessage::NoteOn { note, velocity },
    }
}
