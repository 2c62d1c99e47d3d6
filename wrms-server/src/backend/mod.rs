//! Music backends and the player task
//!
//! A backend contributes search results and knows how to play the songs it
//! produced. The scheduler never calls a backend directly: it sends
//! [`PlayerCommand`]s to [`run_player`], which routes each one to the backend
//! named by the song's `source` and feeds track-end notifications back.

pub mod clock;
pub mod dummy;
pub mod local;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use wrms_common::Song;

use crate::error::{Error, Result};
use crate::scheduler::Scheduler;
use clock::TrackClock;
use dummy::DummyBackend;
use local::LocalBackend;

/// A source of songs that can also play them
pub trait Backend: Send + Sync {
    fn name(&self) -> &str;

    /// Songs whose title or artist contain `pattern` (case-insensitive)
    fn search(&self, pattern: &str) -> Vec<Song>;

    /// Start `song` from the beginning
    fn play(&self, song: &Song) -> Result<()>;

    /// Continue a paused `song`
    fn resume(&self, song: &Song) -> Result<()> {
        self.play(song)
    }

    fn pause(&self) -> Result<()>;
}

/// Instruction from the scheduler to whatever is producing audio
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerCommand {
    /// Start a new song
    Play(Song),
    /// Continue the paused current song
    Resume(Song),
    Pause,
    Shutdown,
}

/// Notification from a backend to the scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    Finished { uri: String },
}

/// The enabled backends, in configuration order
#[derive(Default)]
pub struct Backends {
    backends: Vec<Box<dyn Backend>>,
}

impl Backends {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, backend: Box<dyn Backend>) {
        self.backends.push(backend);
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Backend> {
        self.backends
            .iter()
            .find(|b| b.name() == name)
            .map(|b| b.as_ref())
    }

    /// Search every backend; results keep backend order
    pub fn search(&self, pattern: &str) -> Vec<Song> {
        self.backends
            .iter()
            .flat_map(|backend| {
                let hits = backend.search(pattern);
                debug!("{} found {} songs for {:?}", backend.name(), hits.len(), pattern);
                hits
            })
            .collect()
    }
}

/// Build the backends named in the configuration
///
/// Local backends scan their directory here, so call this off the async runtime.
pub fn from_config(
    names: &[String],
    music_dir: Option<&Path>,
    dummy_track_secs: Option<u64>,
    events: mpsc::UnboundedSender<PlayerEvent>,
) -> Result<Backends> {
    let mut backends = Backends::new();

    for name in names {
        if backends.get(name).is_some() {
            warn!("Backend {} listed twice, ignoring the duplicate", name);
            continue;
        }

        match name.as_str() {
            dummy::NAME => {
                let track_length = dummy_track_secs
                    .filter(|secs| *secs > 0)
                    .map(|secs| (TrackClock::new(events.clone()), Duration::from_secs(secs)));
                backends.push(Box::new(DummyBackend::new(track_length)));
            }
            local::NAME => {
                let dir = music_dir.ok_or_else(|| {
                    Error::Config("the local backend needs a music directory".to_string())
                })?;
                let backend = LocalBackend::scan(dir, TrackClock::new(events.clone()))?;
                backends.push(Box::new(backend));
            }
            other => {
                return Err(Error::Config(format!("unknown backend: {}", other)));
            }
        }
    }

    if backends.is_empty() {
        return Err(Error::Config("no backends enabled".to_string()));
    }

    info!("Enabled backends: {}", backends.names().join(", "));
    Ok(backends)
}

/// Drive the backends until the scheduler shuts down
pub async fn run_player(
    backends: Arc<Backends>,
    mut commands: mpsc::UnboundedReceiver<PlayerCommand>,
    mut events: mpsc::UnboundedReceiver<PlayerEvent>,
    scheduler: Scheduler,
) {
    // Name of the backend that last received a play command
    let mut active: Option<String> = None;

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(PlayerCommand::Play(song)) => {
                    play_on(&backends, &mut active, &song, false);
                }
                Some(PlayerCommand::Resume(song)) => {
                    play_on(&backends, &mut active, &song, true);
                }
                Some(PlayerCommand::Pause) => {
                    if let Some(name) = active.as_deref() {
                        pause_backend(&backends, name);
                    }
                }
                Some(PlayerCommand::Shutdown) | None => {
                    if let Some(name) = active.take() {
                        pause_backend(&backends, &name);
                    }
                    info!("Player stopped");
                    break;
                }
            },
            Some(event) = events.recv() => match event {
                PlayerEvent::Finished { uri } => {
                    debug!("Backend reports {} finished", uri);
                    scheduler.finished(Some(&uri)).await;
                }
            },
        }
    }
}

/// Route a play or resume to the song's backend, pausing a different active one
fn play_on(backends: &Backends, active: &mut Option<String>, song: &Song, resume: bool) {
    if let Some(prev) = active.take().filter(|prev| *prev != song.source) {
        pause_backend(backends, &prev);
    }
    match backends.get(&song.source) {
        Some(backend) => {
            let result = if resume {
                backend.resume(song)
            } else {
                backend.play(song)
            };
            if let Err(e) = result {
                error!("{} failed to play {}: {}", backend.name(), song.uri, e);
            }
            *active = Some(song.source.clone());
        }
        None => warn!("No backend {} for {}", song.source, song.uri),
    }
}

fn pause_backend(backends: &Backends, name: &str) {
    if let Some(backend) = backends.get(name) {
        if let Err(e) = backend.pause() {
            error!("{} failed to pause: {}", name, e);
        }
    }
}
