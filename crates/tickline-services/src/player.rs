//! Playback thread: drives the event scheduler from a periodic ticker

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{select, Receiver, Sender};
use thiserror::Error;
use tickline_core::tempo::DEFAULT_BPM;
use tickline_core::{EventSource, MidiMessage, SendableEvent, Song, Tick, METRONOME_TRACK_ID};
use tracing::{debug, info, warn};

use crate::scheduler::{EventScheduler, LoopRegion, ScheduledEvent};

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Player already running")]
    AlreadyRunning,
    #[error("Player not running")]
    NotRunning,
    #[error("Failed to spawn player thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("Player thread disconnected")]
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerConfig {
    /// How far past the play head events are handed out
    pub lookahead_ms: f64,
    /// Scheduler wake-up period
    pub interval_ms: u64,
    pub metronome: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            lookahead_ms: 100.0,
            interval_ms: 20,
            metronome: true,
        }
    }
}

/// What the player emits towards instruments
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerOutput {
    /// Send at `timestamp_ms` on the player clock
    Scheduled(ScheduledEvent),
    /// Send now (seek state, all-notes-off)
    Immediate(SendableEvent),
}

#[derive(Debug, Clone, Copy)]
enum PlayerCommand {
    Play,
    Stop,
    Seek(Tick),
    SetLoop(Option<LoopRegion>),
    SetMetronome(bool),
    Shutdown,
}

/// Shared state readable from the UI thread
#[derive(Debug, Default)]
pub struct PlayerState {
    pub position: AtomicU64,
    pub playing: AtomicBool,
}

pub struct Player {
    song: Arc<Mutex<Song>>,
    output: Sender<PlayerOutput>,
    config: PlayerConfig,
    state: Arc<PlayerState>,
    commands: Option<Sender<PlayerCommand>>,
    handle: Option<JoinHandle<()>>,
}

impl Player {
    pub fn new(song: Arc<Mutex<Song>>, output: Sender<PlayerOutput>, config: PlayerConfig) -> Self {
        Self {
            song,
            output,
            config,
            state: Arc::new(PlayerState::default()),
            commands: None,
            handle: None,
        }
    }

    pub fn state(&self) -> Arc<PlayerState> {
        self.state.clone()
    }

    /// Spawn the scheduling thread
    pub fn start(&mut self) -> Result<(), PlayerError> {
        if self.handle.is_some() {
            return Err(PlayerError::AlreadyRunning);
        }

        let timebase = self.song.lock().map(|s| s.timebase()).map_err(|_| PlayerError::Disconnected)?;
        let (tx, rx) = crossbeam_channel::unbounded();
        let worker = Worker {
            song: self.song.clone(),
            output: self.output.clone(),
            state: self.state.clone(),
            scheduler: EventScheduler::new(0, timebase, self.config.lookahead_ms),
            metronome: self.config.metronome,
            epoch: Instant::now(),
        };
        let interval = Duration::from_millis(self.config.interval_ms.max(1));

        let handle = std::thread::Builder::new()
            .name("tickline-player".into())
            .spawn(move || worker.run(rx, interval))?;

        self.commands = Some(tx);
        self.handle = Some(handle);
        info!("Player started");
        Ok(())
    }

    /// Stop the scheduling thread and wait for it to exit
    pub fn shutdown(&mut self) -> Result<(), PlayerError> {
        let handle = self.handle.take().ok_or(PlayerError::NotRunning)?;
        if let Some(tx) = self.commands.take() {
            let _ = tx.send(PlayerCommand::Shutdown);
        }
        handle.join().map_err(|_| PlayerError::Disconnected)?;
        info!("Player stopped");
        Ok(())
    }

    pub fn play(&self) -> Result<(), PlayerError> {
        self.send(PlayerCommand::Play)
    }

    pub fn stop(&self) -> Result<(), PlayerError> {
        self.send(PlayerCommand::Stop)
    }

    pub fn seek(&self, tick: Tick) -> Result<(), PlayerError> {
        self.send(PlayerCommand::Seek(tick))
    }

    pub fn set_loop(&self, region: Option<LoopRegion>) -> Result<(), PlayerError> {
        self.send(PlayerCommand::SetLoop(region))
    }

    pub fn set_metronome(&self, enabled: bool) -> Result<(), PlayerError> {
        self.send(PlayerCommand::SetMetronome(enabled))
    }

    pub fn position(&self) -> Tick {
        self.state.position.load(Ordering::SeqCst)
    }

    pub fn is_playing(&self) -> bool {
        self.state.playing.load(Ordering::SeqCst)
    }

    fn send(&self, command: PlayerCommand) -> Result<(), PlayerError> {
        let tx = self.commands.as_ref().ok_or(PlayerError::NotRunning)?;
        tx.send(command).map_err(|_| PlayerError::Disconnected)
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.shutdown();
        }
    }
}

struct Worker {
    song: Arc<Mutex<Song>>,
    output: Sender<PlayerOutput>,
    state: Arc<PlayerState>,
    scheduler: EventScheduler,
    metronome: bool,
    epoch: Instant,
}

impl Worker {
    fn run(mut self, commands: Receiver<PlayerCommand>, interval: Duration) {
        let ticker = crossbeam_channel::tick(interval);
        loop {
            let alive = select! {
                recv(commands) -> command => match command {
                    Ok(command) => self.handle_command(command),
                    Err(_) => false,
                },
                recv(ticker) -> _ => self.process(),
            };
            if !alive {
                break;
            }
        }
        self.state.playing.store(false, Ordering::SeqCst);
        debug!("Player thread exiting");
    }

    /// Returns false once the thread should exit
    fn handle_command(&mut self, command: PlayerCommand) -> bool {
        match command {
            PlayerCommand::Play => {
                let tick = self.scheduler.current_tick();
                let bpm = self.tempo_at(tick);
                self.scheduler.seek(tick, bpm);
                self.state.playing.store(true, Ordering::SeqCst);
                info!(tick, "Playback started");
                self.send_current_state(tick)
            }
            PlayerCommand::Stop => {
                self.state.playing.store(false, Ordering::SeqCst);
                info!(tick = self.scheduler.current_tick(), "Playback stopped");
                self.silence()
            }
            PlayerCommand::Seek(tick) => {
                let bpm = self.tempo_at(tick);
                self.scheduler.seek(tick, bpm);
                self.state.position.store(tick, Ordering::SeqCst);
                if self.state.playing.load(Ordering::SeqCst) {
                    return self.silence() && self.send_current_state(tick);
                }
                true
            }
            PlayerCommand::SetLoop(region) => {
                self.scheduler.set_loop_region(region);
                true
            }
            PlayerCommand::SetMetronome(enabled) => {
                self.metronome = enabled;
                true
            }
            PlayerCommand::Shutdown => false,
        }
    }

    /// Schedule the next window; returns false if the output is gone
    fn process(&mut self) -> bool {
        if !self.state.playing.load(Ordering::SeqCst) {
            return true;
        }

        let now = self.epoch.elapsed().as_secs_f64() * 1000.0;
        let (events, end_of_song) = {
            let Ok(song) = self.song.lock() else {
                warn!("Song lock poisoned, skipping window");
                return true;
            };
            let events = self.scheduler.read_next_events(&*song, now);
            (events, song.end_of_song())
        };

        for scheduled in events {
            if scheduled.event.message.is_meta() {
                continue;
            }
            if scheduled.event.track_id == METRONOME_TRACK_ID && !self.metronome {
                continue;
            }
            if self.output.send(PlayerOutput::Scheduled(scheduled)).is_err() {
                warn!("Player output closed");
                return false;
            }
        }

        let position = self.scheduler.current_tick();
        self.state.position.store(position, Ordering::SeqCst);

        if self.scheduler.loop_region().is_none() && position >= end_of_song {
            debug!(position, "Reached end of song");
            self.state.playing.store(false, Ordering::SeqCst);
            return self.silence();
        }
        true
    }

    fn tempo_at(&self, tick: Tick) -> f64 {
        self.song.lock().map_or(DEFAULT_BPM, |song| song.tempo_at(tick))
    }

    fn send_current_state(&self, tick: Tick) -> bool {
        let Ok(state) = self.song.lock().map(|song| song.get_current_state_events(tick)) else {
            return true;
        };
        state
            .into_iter()
            .all(|event| self.output.send(PlayerOutput::Immediate(event)).is_ok())
    }

    /// All notes off on every channel
    fn silence(&self) -> bool {
        (0..16u8).all(|channel| {
            let event = SendableEvent {
                track_id: 0,
                channel,
                message: MidiMessage::all_notes_off(),
            };
            self.output.send(PlayerOutput::Immediate(event)).is_ok()
        })
    }
}
