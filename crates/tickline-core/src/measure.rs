//! Measures derived from time signature events, and the beats inside them

use crate::event::{EventKind, Tick, TrackEvent};

/// A run of bars sharing one time signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measure {
    pub start_tick: Tick,
    /// Index of the first bar of this run
    pub measure: u32,
    pub numerator: u8,
    pub denominator: u8,
}

impl Measure {
    pub fn ticks_per_beat(&self, timebase: u32) -> Tick {
        timebase as Tick * 4 / self.denominator as Tick
    }

    pub fn ticks_per_bar(&self, timebase: u32) -> Tick {
        self.ticks_per_beat(timebase) * self.numerator as Tick
    }
}

/// A bar or beat boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Beat {
    pub measure: u32,
    /// Position within the bar; 0 is the downbeat
    pub beat: u32,
    pub tick: Tick,
}

impl Beat {
    pub fn is_downbeat(&self) -> bool {
        self.beat == 0
    }
}

/// Build measures from the time signature events of a (conductor) track.
/// With no usable time signature the song is 4/4 from tick 0.
pub fn create_measures(events: &[TrackEvent], timebase: u32) -> Vec<Measure> {
    let signatures = events.iter().filter_map(|e| match e.kind {
        EventKind::TimeSignature { numerator, denominator } if numerator > 0 && denominator > 0 => {
            Some((e.tick, numerator, denominator))
        }
        _ => None,
    });

    let mut measures: Vec<Measure> = Vec::new();
    for (tick, numerator, denominator) in signatures {
        let measure = match measures.last() {
            Some(prev) => {
                // bars shorter than a tick cannot be counted
                let bars = (tick - prev.start_tick)
                    .checked_div(prev.ticks_per_bar(timebase))
                    .unwrap_or(0);
                prev.measure + bars as u32
            }
            None => 0,
        };
        measures.push(Measure { start_tick: tick, measure, numerator, denominator });
    }

    if measures.is_empty() {
        measures.push(Measure { start_tick: 0, measure: 0, numerator: 4, denominator: 4 });
    }
    measures
}

/// Measures overlapping `[start, end]`
pub fn measures_in_range(measures: &[Measure], start: Tick, end: Tick) -> Vec<Measure> {
    let mut result = Vec::new();
    for (i, measure) in measures.iter().enumerate() {
        if measures.get(i + 1).is_some_and(|next| next.start_tick <= start) {
            continue;
        }
        if measure.start_tick > end {
            break;
        }
        result.push(*measure);
    }
    result
}

/// Beat boundaries in `[start, end)`
pub fn beats_in_range(measures: &[Measure], timebase: u32, start: Tick, end: Tick) -> Vec<Beat> {
    if end <= start {
        return Vec::new();
    }

    let in_range = measures_in_range(measures, start, end);
    let mut beats = Vec::new();

    for (i, measure) in in_range.iter().enumerate() {
        let ticks_per_beat = measure.ticks_per_beat(timebase);
        if ticks_per_beat == 0 {
            continue;
        }
        let last_tick = in_range.get(i + 1).map_or(end, |next| next.start_tick.min(end));
        let first_beat = start.saturating_sub(measure.start_tick).div_ceil(ticks_per_beat);

        let mut beat = first_beat;
        loop {
            let tick = measure.start_tick.saturating_add(ticks_per_beat.saturating_mul(beat));
            if tick >= last_tick {
                break;
            }
            let numerator = measure.numerator as Tick;
            beats.push(Beat {
                measure: measure.measure + (beat / numerator) as u32,
                beat: (beat % numerator) as u32,
                tick,
            });
            beat += 1;
        }
    }
    beats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventId;

    fn signature(id: u64, tick: Tick, numerator: u8, denominator: u8) -> TrackEvent {
        TrackEvent {
            id: EventId(id),
            tick,
            kind: EventKind::TimeSignature { numerator, denominator },
        }
    }

    #[test]
    fn test_default_measure() {
        let measures = create_measures(&[], 480);
        assert_eq!(measures, vec![Measure { start_tick: 0, measure: 0, numerator: 4, denominator: 4 }]);
    }

    #[test]
    fn test_measure_index_accumulates() {
        // two bars of 4/4 then 3/4
        let events = [signature(0, 0, 4, 4), signature(1, 3840, 3, 4)];
        let measures = create_measures(&events, 480);
        assert_eq!(measures[1].measure, 2);
        assert_eq!(measures[1].ticks_per_bar(480), 1440);
    }

    #[test]
    fn test_beats_in_range_four_four() {
        let measures = create_measures(&[], 480);
        let beats = beats_in_range(&measures, 480, 0, 1920 * 2);
        assert_eq!(beats.len(), 8);
        assert_eq!(beats[0], Beat { measure: 0, beat: 0, tick: 0 });
        assert_eq!(beats[4], Beat { measure: 1, beat: 0, tick: 1920 });
        assert_eq!(beats[5].beat, 1);
    }

    #[test]
    fn test_beats_start_mid_bar() {
        let measures = create_measures(&[], 480);
        let ticks: Vec<_> = beats_in_range(&measures, 480, 500, 1500).iter().map(|b| b.tick).collect();
        assert_eq!(ticks, vec![960, 1440]);
    }

    #[test]
    fn test_beats_across_signature_change() {
        let events = [signature(0, 0, 2, 4), signature(1, 960, 3, 8)];
        let measures = create_measures(&events, 480);
        let beats = beats_in_range(&measures, 480, 0, 960 + 720);
        let ticks: Vec<_> = beats.iter().map(|b| b.tick).collect();
        assert_eq!(ticks, vec![0, 480, 960, 1200, 1440]);
        assert!(beats[2].is_downbeat());
        assert_eq!(beats[2].measure, 1);
    }

    #[test]
    fn test_beat_shorter_than_a_tick() {
        // at timebase 1 an eighth-note beat is 0 ticks long
        let events = [signature(0, 0, 4, 8), signature(1, 8, 3, 4)];
        let measures = create_measures(&events, 1);
        assert_eq!(measures[1].measure, 0);

        let beats = beats_in_range(&measures, 1, 0, 20);
        assert_eq!(beats.len(), 12);
        assert_eq!(beats[0], Beat { measure: 0, beat: 0, tick: 8 });
        assert_eq!(beats[3], Beat { measure: 1, beat: 0, tick: 11 });
    }

    #[test]
    fn test_empty_range() {
        let measures = create_measures(&[], 480);
        assert!(beats_in_range(&measures, 480, 100, 100).is_empty());
    }
}
