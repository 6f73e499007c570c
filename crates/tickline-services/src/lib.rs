//! tickline-services: playback scheduling on top of tickline-core

pub mod player;
pub mod scheduler;

pub use player::{Player, PlayerConfig, PlayerError, PlayerOutput, PlayerState};
pub use scheduler::{EventScheduler, LoopRegion, ScheduledEvent};
