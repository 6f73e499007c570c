//! tickline: drives the timeline engine from the command line.
//!
//! Builds a small song, replays scripted lane gestures through the drag
//! controller, prints the resulting playback stream and optionally plays it.
//!
//! Usage: `tickline [--dump] [--play <millis>]`

mod config;
mod gestures;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use tickline_core::{EventSource, GridQuantizer, NewEvent, SelectionState, Song, Track};
use tickline_services::{Player, PlayerOutput};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Default)]
struct Args {
    dump: bool,
    play_ms: Option<u64>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args::default();
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--dump" => args.dump = true,
            "--play" => {
                let value = iter.next().context("--play needs a duration in milliseconds")?;
                args.play_ms = Some(value.parse().with_context(|| format!("invalid duration: {value}"))?);
            }
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(args)
}

fn main() -> anyhow::Result<()> {
    let config = config::load_config();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter)),
        )
        .init();

    let args = parse_args()?;
    tracing::info!(path = %config::config_path().display(), "Starting tickline");

    let mut song = demo_song(config.editor.timebase)?;
    let quantizer = if config.editor.quantize == 0 {
        GridQuantizer::disabled(song.timebase())
    } else {
        GridQuantizer::new(song.timebase(), config.editor.quantize)
    };
    let mut selection = SelectionState::default();
    let mut history: Vec<Song> = Vec::new();

    gestures::run_demo(&mut song, &mut selection, &quantizer, &mut history, &config.editor);
    tracing::info!(undo_steps = history.len(), "Gestures applied");

    let end = song.end_of_song();
    for event in song.get_events(0, end) {
        println!("{:>6}  track {:>5}  ch {:>2}  {:?}", event.tick, event.track_id, event.channel, event.message);
    }
    let seek_tick = end / 2;
    for event in song.get_current_state_events(seek_tick) {
        println!("state@{seek_tick}  track {}  ch {}  {:?}", event.track_id, event.channel, event.message);
    }

    if args.dump {
        println!("{}", serde_json::to_string_pretty(&song)?);
    }

    if let Some(millis) = args.play_ms {
        play(song, &config, Duration::from_millis(millis))?;
    }
    Ok(())
}

fn demo_song(timebase: u32) -> anyhow::Result<Song> {
    let mut song = Song::new(timebase)?;
    let bar = timebase as u64 * 4;

    let mut lead = Track::new("Lead", 0)?;
    lead.add_event(NewEvent::program_change(0, 80));
    for (i, note) in [60u8, 64, 67, 72, 67, 64, 60, 55].into_iter().enumerate() {
        lead.add_event(NewEvent::note(i as u64 * bar / 4, note, 90, bar / 4));
    }

    let mut pad = Track::new("Pad", 1)?;
    pad.add_event(NewEvent::program_change(bar / 2, 89));
    pad.add_event(NewEvent::note(0, 48, 70, bar * 2));

    song.add_track(lead);
    song.add_track(pad);
    Ok(song)
}

fn play(song: Song, config: &config::AppConfig, duration: Duration) -> anyhow::Result<()> {
    let song = Arc::new(Mutex::new(song));
    let (tx, rx) = crossbeam_channel::unbounded();
    let mut player = Player::new(song, tx, (&config.player).into());
    player.start()?;
    player.play()?;

    let started = Instant::now();
    let mut sent = 0usize;
    while let Some(remaining) = duration.checked_sub(started.elapsed()) {
        let Ok(output) = rx.recv_timeout(remaining) else {
            break;
        };
        let (channel, message) = match output {
            PlayerOutput::Scheduled(scheduled) => (scheduled.event.channel, scheduled.event.message),
            PlayerOutput::Immediate(event) => (event.channel, event.message),
        };
        if let Some(bytes) = message.to_bytes(channel) {
            println!("midi {bytes:02x?}");
            sent += 1;
        }
    }

    player.stop()?;
    player.shutdown()?;
    tracing::info!(sent, position = player.position(), "Playback finished");
    Ok(())
}
