//! Song: tracks plus the conductor track and a fixed timebase

use serde::{Deserialize, Serialize};

use crate::error::{Result, TicklineError};
use crate::event::{EventKind, NewEvent, Tick};
use crate::measure::{create_measures, Measure};
use crate::tempo::{bpm_to_usec_per_beat, ticks_to_millis, usec_per_beat_to_bpm, DEFAULT_BPM};
use crate::track::Track;

/// Ticks per quarter note used when nothing else is configured
pub const DEFAULT_TIMEBASE: u32 = 480;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Song {
    /// Ticks per quarter note; fixed for the song's lifetime
    timebase: u32,
    tracks: Vec<Track>,
}

impl Song {
    /// New song with a conductor track holding 120 BPM and 4/4 at tick 0
    pub fn new(timebase: u32) -> Result<Self> {
        let mut song = Self::empty(timebase)?;
        let mut conductor = Track::conductor();
        conductor.add_event(NewEvent::set_tempo(0, bpm_to_usec_per_beat(DEFAULT_BPM)));
        conductor.add_event(NewEvent::time_signature(0, 4, 4));
        song.tracks.push(conductor);
        Ok(song)
    }

    /// Song without any track, not even a conductor
    pub fn empty(timebase: u32) -> Result<Self> {
        if timebase == 0 {
            return Err(TicklineError::InvalidTimebase(timebase));
        }
        Ok(Self { timebase, tracks: Vec::new() })
    }

    pub fn timebase(&self) -> u32 {
        self.timebase
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn track_mut(&mut self, index: usize) -> Option<&mut Track> {
        self.tracks.get_mut(index)
    }

    /// Append a track, returning its index
    pub fn add_track(&mut self, track: Track) -> usize {
        self.tracks.push(track);
        self.tracks.len() - 1
    }

    pub fn remove_track(&mut self, index: usize) -> Result<Track> {
        if index >= self.tracks.len() {
            return Err(TicklineError::TrackNotFound(index));
        }
        Ok(self.tracks.remove(index))
    }

    pub fn conductor_track(&self) -> Option<&Track> {
        self.tracks.iter().find(|t| t.is_conductor())
    }

    pub fn conductor_track_mut(&mut self) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.is_conductor())
    }

    /// Last tick used by any track
    pub fn end_of_song(&self) -> Tick {
        self.tracks.iter().map(|t| t.end_of_track()).max().unwrap_or(0)
    }

    pub fn measures(&self) -> Vec<Measure> {
        let events = self.conductor_track().map(|t| t.events()).unwrap_or_default();
        create_measures(events, self.timebase)
    }

    /// Tempo in effect at `tick`
    pub fn tempo_at(&self, tick: Tick) -> f64 {
        self.conductor_track()
            .and_then(|t| {
                t.status_events(tick).into_iter().find_map(|e| match e.kind {
                    EventKind::SetTempo { microseconds_per_beat } => {
                        Some(usec_per_beat_to_bpm(microseconds_per_beat))
                    }
                    _ => None,
                })
            })
            .unwrap_or(DEFAULT_BPM)
    }

    /// Real time at `tick`, following every tempo change before it
    pub fn tick_to_millis(&self, tick: Tick) -> f64 {
        let changes: Vec<(Tick, f64)> = self
            .conductor_track()
            .map(|t| {
                t.events_in_range(0, tick)
                    .iter()
                    .filter_map(|e| match e.kind {
                        EventKind::SetTempo { microseconds_per_beat } => {
                            Some((e.tick, usec_per_beat_to_bpm(microseconds_per_beat)))
                        }
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut millis = 0.0;
        let mut cursor = 0;
        let mut bpm = DEFAULT_BPM;
        for (change_tick, change_bpm) in changes {
            millis += ticks_to_millis((change_tick - cursor) as f64, bpm, self.timebase);
            cursor = change_tick;
            bpm = change_bpm;
        }
        millis + ticks_to_millis((tick - cursor) as f64, bpm, self.timebase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_timebase_rejected() {
        assert_eq!(Song::new(0).unwrap_err(), TicklineError::InvalidTimebase(0));
    }

    #[test]
    fn test_new_song_has_conductor() {
        let song = Song::new(480).unwrap();
        let conductor = song.conductor_track().unwrap();
        assert_eq!(conductor.len(), 2);
        assert_eq!(song.tempo_at(0), 120.0);
        assert_eq!(song.measures().len(), 1);
    }

    #[test]
    fn test_empty_song_defaults() {
        let song = Song::empty(480).unwrap();
        assert!(song.conductor_track().is_none());
        assert_eq!(song.tempo_at(1000), DEFAULT_BPM);
        assert_eq!(song.end_of_song(), 0);
        assert_eq!(song.measures()[0].numerator, 4);
    }

    #[test]
    fn test_end_of_song_is_max_over_tracks() {
        let mut song = Song::new(480).unwrap();
        let mut a = Track::new("a", 0).unwrap();
        a.add_event(NewEvent::note(0, 60, 100, 480));
        let mut b = Track::new("b", 1).unwrap();
        b.add_event(NewEvent::control_change(2000, 7, 100));
        song.add_track(a);
        song.add_track(b);
        assert_eq!(song.end_of_song(), 2000);
    }

    #[test]
    fn test_tick_to_millis_follows_tempo_changes() {
        let mut song = Song::new(480).unwrap();
        song.conductor_track_mut()
            .unwrap()
            .create_or_update(NewEvent::set_tempo(960, bpm_to_usec_per_beat(60.0)));

        // two beats at 120 then one beat at 60
        assert!((song.tick_to_millis(1440) - 2000.0).abs() < 1e-6);
        assert_eq!(song.tempo_at(959), 120.0);
        assert_eq!(song.tempo_at(960), 60.0);
    }

    #[test]
    fn test_remove_missing_track() {
        let mut song = Song::empty(480).unwrap();
        assert_eq!(song.remove_track(2).unwrap_err(), TicklineError::TrackNotFound(2));
    }
}
