//! Drag session controller for the value lanes (velocity, controller, tempo).
//!
//! One pointer gesture is one undo step: the song is snapshotted on
//! pointer-down, every move mutates the song directly, pointer-up only ends
//! the session.

use tracing::{debug, warn};

use crate::event::EventId;
use crate::history::History;
use crate::paint::{
    change_events_value, change_notes_velocity, update_events_in_range, update_velocities_in_range,
    write_point, ContinuousKind, Stroke, TempoCurve, ValueEventType,
};
use crate::quantizer::Quantize;
use crate::selection::{SelectionState, Surface};
use crate::song::Song;
use crate::track::Track;
use crate::transform::{DomainPoint, DomainTransform, Point};

/// What a drag edits
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditTarget {
    /// Note velocities of the edited track
    Velocity,
    /// A controller curve of the edited track
    Control(ValueEventType),
    /// The tempo curve of the conductor track
    Tempo(TempoCurve),
}

impl EditTarget {
    fn surface(&self) -> Surface {
        match self {
            Self::Velocity => Surface::PianoRoll,
            Self::Control(_) | Self::Tempo(_) => Surface::Control,
        }
    }
}

/// Editor state an edit operates on
pub struct EditContext<'a> {
    pub song: &'a mut Song,
    pub selection: &'a mut SelectionState,
    pub quantizer: &'a dyn Quantize,
    pub history: &'a mut dyn History,
}

/// Pointer input delivered by the UI layer
#[derive(Debug, Clone, PartialEq)]
pub enum PointerEvent {
    /// `local` is the position in lane coordinates (scroll applied),
    /// `client` the raw pointer position, `hits` the items under the pointer
    Down { local: Point, client: Point, hits: Vec<EventId> },
    Move { client: Point },
    Up,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GestureMode {
    /// Draw a new curve along the pointer path
    Paint,
    /// Set every grabbed item to the pointer's value
    Selection(Vec<EventId>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveDrag {
    pub track_index: usize,
    pub start_local: Point,
    pub start_client: Point,
    pub last: DomainPoint,
    pub mode: GestureMode,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Active(ActiveDrag),
    Committed,
}

pub struct DragController<T: DomainTransform> {
    transform: T,
    target: EditTarget,
    /// Edited track for velocity and controller lanes
    track_index: usize,
    state: DragState,
}

impl<T: DomainTransform> DragController<T> {
    pub fn new(transform: T, target: EditTarget, track_index: usize) -> Self {
        Self {
            transform,
            target,
            track_index,
            state: DragState::Idle,
        }
    }

    pub fn transform(&self) -> &T {
        &self.transform
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, DragState::Active(_))
    }

    pub fn handle(&mut self, ctx: &mut EditContext<'_>, event: PointerEvent) {
        match event {
            PointerEvent::Down { local, client, hits } => self.begin(ctx, local, client, hits),
            PointerEvent::Move { client } => self.drag(ctx, client),
            PointerEvent::Up => self.release(),
        }
    }

    fn begin(&mut self, ctx: &mut EditContext<'_>, local: Point, client: Point, hits: Vec<EventId>) {
        if self.is_active() {
            warn!("pointer down during an active drag ignored");
            return;
        }

        let track_index = match self.target {
            EditTarget::Tempo(_) => ctx.song.tracks().iter().position(|t| t.is_conductor()),
            _ => Some(self.track_index).filter(|&i| ctx.song.track(i).is_some()),
        };
        let Some(track_index) = track_index else {
            debug!(edit = ?self.target, "no track to edit, drag skipped");
            return;
        };

        ctx.history.push_snapshot(ctx.song);

        let surface = self.target.surface();
        let selected = ctx.selection.surface(surface);
        let grabbed: Vec<EventId> = if selected.ids.is_empty() {
            hits
        } else {
            hits.into_iter().filter(|id| selected.contains(*id)).collect()
        };

        let mode = if grabbed.is_empty() {
            ctx.selection.clear_all();
            GestureMode::Paint
        } else {
            ctx.selection.clear_except(surface);
            GestureMode::Selection(grabbed)
        };

        let point = self.domain_point(local);
        if let Some(track) = ctx.song.track_mut(track_index) {
            apply_point(track, ctx.quantizer, self.target, &mode, point);
        }
        debug!(track_index, tick = point.tick, value = point.value, ?mode, "drag started");

        self.state = DragState::Active(ActiveDrag {
            track_index,
            start_local: local,
            start_client: client,
            last: point,
            mode,
        });
    }

    fn drag(&mut self, ctx: &mut EditContext<'_>, client: Point) {
        let DragState::Active(active) = &mut self.state else {
            return;
        };

        let local = active.start_local + (client - active.start_client);
        let point = domain_point(&self.transform, local);

        if let Some(track) = ctx.song.track_mut(active.track_index) {
            match &active.mode {
                GestureMode::Paint => {
                    let stroke = Stroke { from: active.last, to: point };
                    apply_stroke(track, ctx.quantizer, self.target, stroke);
                }
                mode @ GestureMode::Selection(_) => {
                    apply_point(track, ctx.quantizer, self.target, mode, point);
                }
            }
        }
        active.last = point;
    }

    fn release(&mut self) {
        if self.is_active() {
            debug!("drag committed");
            self.state = DragState::Committed;
        }
    }

    fn domain_point(&self, local: Point) -> DomainPoint {
        domain_point(&self.transform, local)
    }
}

/// Domain point under `local`, with the value bounded to the lane
fn domain_point<T: DomainTransform>(transform: &T, local: Point) -> DomainPoint {
    let point = transform.from_position(local);
    DomainPoint {
        tick: point.tick,
        value: point.value.clamp(0.0, transform.max_value()),
    }
}

fn apply_point(
    track: &mut Track,
    quantizer: &dyn Quantize,
    target: EditTarget,
    mode: &GestureMode,
    point: DomainPoint,
) {
    match (mode, target) {
        (GestureMode::Selection(ids), EditTarget::Velocity) => {
            change_notes_velocity(track, ids, point.value);
        }
        (GestureMode::Selection(ids), EditTarget::Control(kind)) => {
            change_events_value(track, ids, &kind, point.value);
        }
        (GestureMode::Selection(ids), EditTarget::Tempo(kind)) => {
            change_events_value(track, ids, &kind, point.value);
        }
        (GestureMode::Paint, EditTarget::Velocity) => {
            update_velocities_in_range(track, Stroke { from: point, to: point });
        }
        (GestureMode::Paint, EditTarget::Control(kind)) => {
            write_point(track, quantizer, &kind, point);
        }
        (GestureMode::Paint, EditTarget::Tempo(kind)) => {
            write_point(track, quantizer, &kind, point);
        }
    }
}

fn apply_stroke(track: &mut Track, quantizer: &dyn Quantize, target: EditTarget, stroke: Stroke) {
    let kind: &dyn ContinuousKind = match &target {
        EditTarget::Velocity => {
            update_velocities_in_range(track, stroke);
            return;
        }
        EditTarget::Control(kind) => kind,
        EditTarget::Tempo(kind) => kind,
    };
    update_events_in_range(track, quantizer, kind, stroke);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventKind, NewEvent};
    use crate::quantizer::GridQuantizer;
    use crate::transform::{ControlTransform, TempoTransform, VelocityTransform};

    struct Editor {
        song: Song,
        selection: SelectionState,
        quantizer: GridQuantizer,
        history: Vec<Song>,
    }

    impl Editor {
        fn new(song: Song) -> Self {
            Self {
                song,
                selection: SelectionState::default(),
                quantizer: GridQuantizer::disabled(480),
                history: Vec::new(),
            }
        }

        fn send<T: DomainTransform>(&mut self, drag: &mut DragController<T>, event: PointerEvent) {
            let mut ctx = EditContext {
                song: &mut self.song,
                selection: &mut self.selection,
                quantizer: &self.quantizer,
                history: &mut self.history,
            };
            drag.handle(&mut ctx, event);
        }
    }

    fn down(x: f64, y: f64) -> PointerEvent {
        PointerEvent::Down {
            local: Point::new(x, y),
            client: Point::new(x + 100.0, y + 200.0),
            hits: Vec::new(),
        }
    }

    fn move_to(x: f64, y: f64) -> PointerEvent {
        PointerEvent::Move { client: Point::new(x + 100.0, y + 200.0) }
    }

    fn tempo_events(song: &Song) -> Vec<(u64, EventKind)> {
        song.conductor_track()
            .unwrap()
            .events()
            .iter()
            .filter(|e| matches!(e.kind, EventKind::SetTempo { .. }))
            .map(|e| (e.tick, e.kind))
            .collect()
    }

    fn song_with_track() -> Song {
        let mut song = Song::new(480).unwrap();
        song.add_track(Track::new("Lead", 0).unwrap());
        song
    }

    #[test]
    fn test_tempo_drag_scenario() {
        let mut editor = Editor::new(Song::new(480).unwrap());
        let transform = TempoTransform::new(0.5, 300.0, 300.0);
        let mut drag = DragController::new(transform, EditTarget::Tempo(TempoCurve { max_bpm: 300.0 }), 0);

        // 120 BPM at tick 0, then 140 BPM at tick 960
        editor.send(&mut drag, down(0.0, 180.0));
        editor.send(&mut drag, move_to(480.0, 160.0));
        editor.send(&mut drag, PointerEvent::Up);

        assert_eq!(
            tempo_events(&editor.song),
            vec![
                (0, EventKind::SetTempo { microseconds_per_beat: 500_000 }),
                (960, EventKind::SetTempo { microseconds_per_beat: 428_571 }),
            ]
        );
        assert_eq!(*drag.state(), DragState::Committed);
    }

    #[test]
    fn test_missing_conductor_is_noop() {
        let mut song = Song::empty(480).unwrap();
        song.add_track(Track::new("Lead", 0).unwrap());
        let mut editor = Editor::new(song);
        let mut drag = DragController::new(
            TempoTransform::new(1.0, 300.0, 300.0),
            EditTarget::Tempo(TempoCurve { max_bpm: 300.0 }),
            0,
        );

        editor.send(&mut drag, down(10.0, 10.0));
        editor.send(&mut drag, move_to(50.0, 10.0));

        assert!(editor.history.is_empty());
        assert_eq!(*drag.state(), DragState::Idle);
        assert!(editor.song.track(0).unwrap().is_empty());
    }

    #[test]
    fn test_one_snapshot_per_gesture() {
        let mut editor = Editor::new(song_with_track());
        let transform = ControlTransform::new(1.0, 127.0, 127.0, 0.0);
        let mut drag = DragController::new(transform, EditTarget::Control(ValueEventType::Controller(7)), 1);

        editor.send(&mut drag, down(0.0, 27.0));
        for x in [10.0, 20.0, 30.0] {
            editor.send(&mut drag, move_to(x, 27.0));
        }
        editor.send(&mut drag, PointerEvent::Up);

        assert_eq!(editor.history.len(), 1);
        assert!(editor.history[0].track(1).unwrap().is_empty());
    }

    #[test]
    fn test_click_without_move_writes_point() {
        let mut editor = Editor::new(song_with_track());
        editor.quantizer = GridQuantizer::new(480, 4);
        let transform = ControlTransform::new(1.0, 127.0, 127.0, 0.0);
        let mut drag = DragController::new(transform, EditTarget::Control(ValueEventType::Controller(1)), 1);

        editor.send(&mut drag, down(500.0, 27.0));
        editor.send(&mut drag, PointerEvent::Up);

        let events = editor.song.track(1).unwrap().events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].tick, 480);
        assert_eq!(events[0].kind, EventKind::ControlChange { controller: 1, value: 100 });
    }

    #[test]
    fn test_move_uses_cumulative_delta_and_clamps() {
        let mut editor = Editor::new(song_with_track());
        let transform = ControlTransform::new(1.0, 127.0, 127.0, 0.0);
        let mut drag = DragController::new(transform, EditTarget::Control(ValueEventType::Controller(7)), 1);

        editor.send(&mut drag, down(0.0, 127.0));
        // far above the lane top
        editor.send(&mut drag, move_to(100.0, -500.0));

        let DragState::Active(active) = drag.state() else {
            panic!("drag should be active");
        };
        assert_eq!(active.last, DomainPoint { tick: 100, value: 127.0 });

        let values: Vec<_> = editor.song.track(1).unwrap().events().iter().map(|e| (e.tick, e.kind)).collect();
        assert_eq!(
            values,
            vec![
                (0, EventKind::ControlChange { controller: 7, value: 0 }),
                (100, EventKind::ControlChange { controller: 7, value: 127 }),
            ]
        );
    }

    #[test]
    fn test_down_while_active_ignored() {
        let mut editor = Editor::new(song_with_track());
        let transform = ControlTransform::new(1.0, 127.0, 127.0, 0.0);
        let mut drag = DragController::new(transform, EditTarget::Control(ValueEventType::Controller(7)), 1);

        editor.send(&mut drag, down(0.0, 0.0));
        editor.send(&mut drag, down(300.0, 0.0));

        assert_eq!(editor.history.len(), 1);
        assert_eq!(editor.song.track(1).unwrap().len(), 1);
    }

    #[test]
    fn test_velocity_selection_drag() {
        let mut song = song_with_track();
        let track = song.track_mut(1).unwrap();
        let a = track.add_event(NewEvent::note(0, 60, 10, 240));
        let b = track.add_event(NewEvent::note(0, 64, 10, 240));
        let c = track.add_event(NewEvent::note(960, 67, 10, 240));

        let mut editor = Editor::new(song);
        editor.selection.piano_roll.select(a);
        editor.selection.piano_roll.select(c);
        editor.selection.control.select(EventId(42));

        let transform = VelocityTransform::new(1.0, 127.0);
        let mut drag = DragController::new(transform, EditTarget::Velocity, 1);
        editor.send(
            &mut drag,
            PointerEvent::Down {
                local: Point::new(0.0, 100.0),
                client: Point::new(0.0, 100.0),
                hits: vec![a, b],
            },
        );
        editor.send(&mut drag, PointerEvent::Move { client: Point::new(0.0, 27.0) });

        let DragState::Active(active) = drag.state() else {
            panic!("drag should be active");
        };
        assert_eq!(active.track_index, 1);
        assert_eq!(active.mode, GestureMode::Selection(vec![a]));
        assert!((active.last.value - 100.0).abs() < 1e-9);

        let velocity = |id| match editor.song.track(1).unwrap().get_event(id).unwrap().kind {
            EventKind::Note { velocity, .. } => velocity,
            _ => unreachable!(),
        };
        assert_eq!(velocity(a), 100);
        assert_eq!(velocity(b), 10);
        assert_eq!(velocity(c), 10);
        assert!(editor.selection.control.is_empty());
        assert!(editor.selection.piano_roll.contains(a));
    }

    #[test]
    fn test_velocity_paint_clears_selection() {
        let mut song = song_with_track();
        let track = song.track_mut(1).unwrap();
        let a = track.add_event(NewEvent::note(0, 60, 10, 240));
        let b = track.add_event(NewEvent::note(120, 64, 10, 240));

        let mut editor = Editor::new(song);
        editor.selection.piano_roll.select(EventId(99));

        let transform = VelocityTransform::new(1.0, 127.0);
        let mut drag = DragController::new(transform, EditTarget::Velocity, 1);
        editor.send(&mut drag, down(0.0, 127.0));
        editor.send(&mut drag, move_to(120.0, 0.0));

        let velocity = |id| match editor.song.track(1).unwrap().get_event(id).unwrap().kind {
            EventKind::Note { velocity, .. } => velocity,
            _ => unreachable!(),
        };
        assert_eq!(velocity(a), 0);
        assert_eq!(velocity(b), 127);
        assert!(editor.selection.piano_roll.is_empty());
    }

    #[test]
    fn test_velocity_press_left_of_origin_leaves_notes() {
        let mut song = song_with_track();
        let note = song.track_mut(1).unwrap().add_event(NewEvent::note(0, 60, 10, 240));

        let mut editor = Editor::new(song);
        let transform = VelocityTransform::new(1.0, 127.0);
        let mut drag = DragController::new(transform, EditTarget::Velocity, 1);
        editor.send(&mut drag, down(-8.0, 0.0));
        editor.send(&mut drag, move_to(-3.0, 0.0));

        assert!(drag.is_active());
        assert_eq!(
            editor.song.track(1).unwrap().get_event(note).unwrap().kind,
            EventKind::Note { note_number: 60, velocity: 10, duration: 240 }
        );
    }
}
