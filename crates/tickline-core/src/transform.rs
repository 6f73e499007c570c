//! Coordinate transforms between editor pixels and (tick, value) space.
//!
//! Transforms never clamp: a point above the lane yields a value above
//! `max_value` and a point left of the origin yields a negative tick.
//! Callers bound the result before writing it.

use std::ops::{Add, Sub};

/// A point in editor pixel space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// A point in musical space. `tick` is raw and may be negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DomainPoint {
    pub tick: i64,
    pub value: f64,
}

pub trait DomainTransform {
    fn get_x(&self, tick: f64) -> f64;
    fn get_ticks(&self, x: f64) -> i64;
    fn get_y(&self, value: f64) -> f64;
    fn get_value(&self, y: f64) -> f64;
    /// Upper bound of the value axis
    fn max_value(&self) -> f64;

    fn from_position(&self, point: Point) -> DomainPoint {
        DomainPoint {
            tick: self.get_ticks(point.x),
            value: self.get_value(point.y),
        }
    }

    fn to_position(&self, tick: f64, value: f64) -> Point {
        Point::new(self.get_x(tick), self.get_y(value))
    }
}

/// Controller lane (CC, pitch bend), inset by the stroke width at top and bottom
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlTransform {
    pub pixels_per_tick: f64,
    pub max_value: f64,
    pub height: f64,
    pub line_width: f64,
}

impl ControlTransform {
    pub fn new(pixels_per_tick: f64, max_value: f64, height: f64, line_width: f64) -> Self {
        Self { pixels_per_tick, max_value, height, line_width }
    }

    fn inner_height(&self) -> f64 {
        self.height - self.line_width * 2.0
    }
}

impl DomainTransform for ControlTransform {
    fn get_x(&self, tick: f64) -> f64 {
        tick * self.pixels_per_tick
    }

    fn get_ticks(&self, x: f64) -> i64 {
        (x / self.pixels_per_tick).floor() as i64
    }

    fn get_y(&self, value: f64) -> f64 {
        (1.0 - value / self.max_value) * self.inner_height() + self.line_width
    }

    fn get_value(&self, y: f64) -> f64 {
        (1.0 - (y - self.line_width) / self.inner_height()) * self.max_value
    }

    fn max_value(&self) -> f64 {
        self.max_value
    }
}

/// Tempo lane; values are BPM
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoTransform {
    pub pixels_per_tick: f64,
    pub height: f64,
    pub max_bpm: f64,
}

impl TempoTransform {
    pub fn new(pixels_per_tick: f64, height: f64, max_bpm: f64) -> Self {
        Self { pixels_per_tick, height, max_bpm }
    }
}

impl DomainTransform for TempoTransform {
    fn get_x(&self, tick: f64) -> f64 {
        tick * self.pixels_per_tick
    }

    fn get_ticks(&self, x: f64) -> i64 {
        (x / self.pixels_per_tick).floor() as i64
    }

    fn get_y(&self, bpm: f64) -> f64 {
        (1.0 - bpm / self.max_bpm) * self.height
    }

    fn get_value(&self, y: f64) -> f64 {
        (1.0 - y / self.height) * self.max_bpm
    }

    fn max_value(&self) -> f64 {
        self.max_bpm
    }
}

/// Velocity lane under the piano roll, 0..=127 over the lane height
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityTransform {
    pub pixels_per_tick: f64,
    pub height: f64,
}

impl VelocityTransform {
    pub const MAX_VELOCITY: f64 = 127.0;

    pub fn new(pixels_per_tick: f64, height: f64) -> Self {
        Self { pixels_per_tick, height }
    }
}

impl DomainTransform for VelocityTransform {
    fn get_x(&self, tick: f64) -> f64 {
        tick * self.pixels_per_tick
    }

    fn get_ticks(&self, x: f64) -> i64 {
        (x / self.pixels_per_tick).floor() as i64
    }

    fn get_y(&self, velocity: f64) -> f64 {
        (1.0 - velocity / Self::MAX_VELOCITY) * self.height
    }

    fn get_value(&self, y: f64) -> f64 {
        (1.0 - y / self.height) * Self::MAX_VELOCITY
    }

    fn max_value(&self) -> f64 {
        Self::MAX_VELOCITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_transform_round_trip() {
        let t = ControlTransform::new(0.25, 127.0, 100.0, 2.0);
        let p = t.to_position(960.0, 64.0);
        let d = t.from_position(p);
        assert_eq!(d.tick, 960);
        assert!((d.value - 64.0).abs() < 1e-9);
    }

    #[test]
    fn test_control_transform_line_width_inset() {
        let t = ControlTransform::new(1.0, 127.0, 100.0, 2.0);
        assert_eq!(t.get_y(127.0), 2.0);
        assert_eq!(t.get_y(0.0), 98.0);
    }

    #[test]
    fn test_transform_does_not_clamp() {
        let t = ControlTransform::new(1.0, 127.0, 100.0, 0.0);
        let above = t.from_position(Point::new(-5.0, -50.0));
        assert!(above.value > 127.0);
        assert_eq!(above.tick, -5);

        let below = t.get_value(150.0);
        assert!(below < 0.0);
    }

    #[test]
    fn test_tempo_transform() {
        let t = TempoTransform::new(0.5, 300.0, 300.0);
        assert_eq!(t.get_value(150.0), 150.0);
        assert_eq!(t.get_ticks(480.0), 960);
        assert_eq!(t.to_position(960.0, 150.0), Point::new(480.0, 150.0));
    }

    #[test]
    fn test_velocity_transform() {
        let t = VelocityTransform::new(1.0, 127.0);
        assert_eq!(t.get_value(0.0), 127.0);
        assert_eq!(t.get_value(127.0), 0.0);
        assert_eq!(t.max_value(), 127.0);
    }

    #[test]
    fn test_point_arithmetic() {
        let start = Point::new(10.0, 20.0);
        let delta = Point::new(15.0, 5.0) - Point::new(5.0, 10.0);
        assert_eq!(start + delta, Point::new(20.0, 15.0));
    }
}
