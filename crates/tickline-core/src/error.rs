//! Error types for tickline

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TicklineError {
    #[error("Invalid timebase: {0} (must be positive)")]
    InvalidTimebase(u32),
    #[error("Invalid time signature: {numerator}/{denominator}")]
    InvalidTimeSignature { numerator: u8, denominator: u8 },
    #[error("Invalid MIDI channel: {0} (must be 0-15)")]
    InvalidChannel(u8),
    #[error("Track not found: {0}")]
    TrackNotFound(usize),
}

pub type Result<T> = std::result::Result<T, TicklineError>;
