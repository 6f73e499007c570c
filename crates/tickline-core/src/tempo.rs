//! Tempo conversions between BPM, microseconds per beat, ticks and milliseconds

use crate::event::Tick;

pub const MICROSECONDS_PER_MINUTE: f64 = 60_000_000.0;

/// Tempo used when a song has no tempo event
pub const DEFAULT_BPM: f64 = 120.0;

/// Lowest BPM the tempo editor will write; 0 BPM has no µs/beat form
pub const MIN_BPM: f64 = 1.0;

/// Stored tempo representation, rounded to the nearest microsecond
pub fn bpm_to_usec_per_beat(bpm: f64) -> u32 {
    (MICROSECONDS_PER_MINUTE / bpm.max(MIN_BPM)).round() as u32
}

pub fn usec_per_beat_to_bpm(microseconds_per_beat: u32) -> f64 {
    MICROSECONDS_PER_MINUTE / microseconds_per_beat.max(1) as f64
}

/// Fractional ticks elapsed in `millis` at a fixed tempo
pub fn millis_to_ticks(millis: f64, bpm: f64, timebase: u32) -> f64 {
    millis * bpm * timebase as f64 / 60_000.0
}

pub fn ticks_to_millis(ticks: f64, bpm: f64, timebase: u32) -> f64 {
    ticks * 60_000.0 / (timebase as f64 * bpm)
}

/// Length of `ticks` in seconds at a fixed tempo
pub fn ticks_to_secs(ticks: Tick, bpm: f64, timebase: u32) -> f64 {
    ticks_to_millis(ticks as f64, bpm, timebase) / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bpm_round_trip() {
        for bpm in 20..=300u32 {
            let usec = bpm_to_usec_per_beat(bpm as f64);
            assert_eq!(usec_per_beat_to_bpm(usec).round() as u32, bpm, "bpm {bpm}");
        }
    }

    #[test]
    fn test_known_tempos() {
        assert_eq!(bpm_to_usec_per_beat(120.0), 500_000);
        assert_eq!(bpm_to_usec_per_beat(140.0), 428_571);
        assert_eq!(usec_per_beat_to_bpm(500_000), 120.0);
    }

    #[test]
    fn test_zero_bpm_is_bounded() {
        assert_eq!(bpm_to_usec_per_beat(0.0), 60_000_000);
    }

    #[test]
    fn test_tick_millis_conversion() {
        // one quarter note at 120 BPM is 500ms
        assert!((ticks_to_millis(480.0, 120.0, 480) - 500.0).abs() < 1e-9);
        assert!((millis_to_ticks(500.0, 120.0, 480) - 480.0).abs() < 1e-9);
        assert!((ticks_to_secs(960, 60.0, 480) - 2.0).abs() < 1e-9);
    }
}
