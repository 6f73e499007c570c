//! Scripted pointer gestures standing in for a UI event loop

use tickline_core::paint::ContinuousKind;
use tickline_core::{
    ControlTransform, DomainTransform, DragController, EditContext, EditTarget, History, Point,
    PointerEvent, Quantize, SelectionState, Song, TempoCurve, TempoTransform, ValueEventType,
    VelocityTransform,
};
use tracing::debug;

use crate::config::EditorConfig;

const LANE_HEIGHT: f64 = 128.0;
const PIXELS_PER_TICK: f64 = 0.1;

/// Lead track index in the demo song (0 is the conductor)
const LEAD: usize = 1;

pub(crate) fn run_demo(
    song: &mut Song,
    selection: &mut SelectionState,
    quantizer: &dyn Quantize,
    history: &mut dyn History,
    editor: &EditorConfig,
) {
    let bar = song.timebase() as f64 * 4.0;
    let mut ctx = EditContext { song, selection, quantizer, history };

    // tempo ramp 120 -> 140 BPM over the first two bars
    let tempo = TempoTransform::new(PIXELS_PER_TICK, LANE_HEIGHT, editor.max_bpm);
    let path = [(0.0, 120.0), (bar, 130.0), (bar * 2.0, 140.0)];
    drag_along(&mut ctx, DragController::new(tempo, EditTarget::Tempo(TempoCurve { max_bpm: editor.max_bpm }), 0), &path);

    // volume swell on the lead
    let volume = ValueEventType::Controller(7);
    let control = ControlTransform::new(PIXELS_PER_TICK, volume.max_value(), LANE_HEIGHT, 1.0);
    let path = [(0.0, 40.0), (bar / 2.0, 80.0), (bar, 110.0)];
    drag_along(&mut ctx, DragController::new(control, EditTarget::Control(volume), LEAD), &path);

    // velocity crescendo across the lead notes
    let velocity = VelocityTransform::new(PIXELS_PER_TICK, LANE_HEIGHT);
    let path = [(0.0, 50.0), (bar * 2.0, 127.0)];
    drag_along(&mut ctx, DragController::new(velocity, EditTarget::Velocity, LEAD), &path);
}

/// Press at the first `(tick, value)`, move through the rest, release
fn drag_along<T: DomainTransform>(
    ctx: &mut EditContext<'_>,
    mut drag: DragController<T>,
    path: &[(f64, f64)],
) {
    let Some((&(tick, value), rest)) = path.split_first() else {
        return;
    };
    let start = drag_position(&drag, tick, value);
    drag.handle(ctx, PointerEvent::Down { local: start, client: start, hits: Vec::new() });
    for &(tick, value) in rest {
        let client = drag_position(&drag, tick, value);
        drag.handle(ctx, PointerEvent::Move { client });
    }
    drag.handle(ctx, PointerEvent::Up);
    debug!(state = ?drag.state(), "gesture finished");
}

fn drag_position<T: DomainTransform>(drag: &DragController<T>, tick: f64, value: f64) -> Point {
    drag.transform().to_position(tick, value)
}
