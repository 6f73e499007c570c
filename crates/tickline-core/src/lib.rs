//! tickline-core: event timeline, curve editing and playback model

pub mod drag;
mod error;
mod event;
pub mod event_source;
mod history;
pub mod measure;
pub mod paint;
mod quantizer;
mod selection;
mod song;
pub mod tempo;
mod track;
pub mod transform;

pub use drag::{DragController, DragState, EditContext, EditTarget, GestureMode, PointerEvent};
pub use error::{Result, TicklineError};
pub use event::{EventId, EventKind, EventSlot, NewEvent, Tick, TrackEvent};
pub use event_source::{
    EventSource, MidiMessage, PlayerEvent, SendableEvent, METRONOME_CHANNEL, METRONOME_TRACK_ID,
};
pub use history::History;
pub use measure::{Beat, Measure};
pub use paint::{ContinuousKind, PaintOutcome, Stroke, TempoCurve, ValueEventType};
pub use quantizer::{GridQuantizer, Quantize};
pub use selection::{SelectionState, Surface, SurfaceSelection};
pub use song::{Song, DEFAULT_TIMEBASE};
pub use track::Track;
pub use transform::{ControlTransform, DomainPoint, DomainTransform, Point, TempoTransform, VelocityTransform};
