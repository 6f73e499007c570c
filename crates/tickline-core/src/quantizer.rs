//! Snap-to-grid for tick positions

use serde::{Deserialize, Serialize};

use crate::event::Tick;

/// Snaps raw (possibly negative) ticks onto the editor grid
pub trait Quantize {
    fn round(&self, tick: i64) -> Tick;
}

/// Grid of `timebase * 4 / denominator` ticks (denominator 4 = quarter notes,
/// 16 = sixteenths). A disabled grid only clamps to tick 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridQuantizer {
    pub timebase: u32,
    pub denominator: u32,
    pub enabled: bool,
}

impl GridQuantizer {
    pub fn new(timebase: u32, denominator: u32) -> Self {
        Self { timebase, denominator, enabled: true }
    }

    pub fn disabled(timebase: u32) -> Self {
        Self { timebase, denominator: 4, enabled: false }
    }

    /// Grid size in ticks
    pub fn unit(&self) -> Tick {
        (self.timebase as Tick * 4 / self.denominator.max(1) as Tick).max(1)
    }

    pub fn floor(&self, tick: i64) -> Tick {
        self.snap(tick, f64::floor)
    }

    pub fn ceil(&self, tick: i64) -> Tick {
        self.snap(tick, f64::ceil)
    }

    fn snap(&self, tick: i64, op: fn(f64) -> f64) -> Tick {
        let tick = tick.max(0) as Tick;
        if !self.enabled {
            return tick;
        }
        let unit = self.unit();
        op(tick as f64 / unit as f64) as Tick * unit
    }
}

impl Quantize for GridQuantizer {
    fn round(&self, tick: i64) -> Tick {
        self.snap(tick, f64::round)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit() {
        assert_eq!(GridQuantizer::new(480, 4).unit(), 480);
        assert_eq!(GridQuantizer::new(480, 16).unit(), 120);
        assert_eq!(GridQuantizer::new(480, 0).unit(), 1920);
    }

    #[test]
    fn test_round_floor_ceil() {
        let q = GridQuantizer::new(480, 16);
        assert_eq!(q.round(59), 0);
        assert_eq!(q.round(61), 120);
        assert_eq!(q.floor(239), 120);
        assert_eq!(q.ceil(121), 240);
    }

    #[test]
    fn test_negative_ticks_clamp_to_zero() {
        let q = GridQuantizer::new(480, 4);
        assert_eq!(q.round(-300), 0);
        assert_eq!(GridQuantizer::disabled(480).round(-1), 0);
    }

    #[test]
    fn test_disabled_passthrough() {
        assert_eq!(GridQuantizer::disabled(480).round(333), 333);
    }
}
