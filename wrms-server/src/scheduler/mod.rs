//! Weighted scheduling engine
//!
//! [`Scheduler`] owns the pending queue, the now-playing slot and the
//! broadcast hub behind one mutex. Every mutating operation runs start to
//! finish inside that critical section, including publishing the events it
//! produces, so:
//! - votes on any items are totally ordered and can never double-count
//! - every session sees events in that same order
//! - a joining session's replay and its first live event never overlap or gap
//!
//! Nothing under the lock waits on I/O. Commands for the playback backend are
//! handed to the player task over an unbounded channel.

pub mod item;
pub mod playback;
pub mod queue;
pub mod votes;

pub use item::{Item, ItemId};
pub use playback::{AdvanceOutcome, PauseOutcome, PlayOutcome, PlaybackState, ToggleOutcome};
pub use queue::WeightedQueue;
pub use votes::{VoteLedger, VoteOutcome, VoteRejection, VoteState, VoterId};

use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};
use wrms_common::{Song, VoteAction, WrmsEvent};

use crate::backend::PlayerCommand;
use crate::error::{Error, Result};
use crate::hub::{self, BroadcastHub, EventSink, Session, SessionKey, WriterExit};

/// Everything guarded by the scheduler's critical section
#[derive(Debug, Default)]
struct SchedulerState {
    queue: WeightedQueue,
    playback: PlaybackState,
    hub: BroadcastHub,
}

/// Outcome of a vote request together with the song's resulting state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteReceipt {
    pub outcome: VoteOutcome,
    pub song: Song,
}

/// Read-only view of the scheduler state
#[derive(Debug, Clone, Serialize)]
pub struct QueueSnapshot {
    pub current: Option<Song>,
    pub playing: bool,
    /// Pending songs in arrival order
    pub songs: Vec<Song>,
    pub sessions: usize,
}

/// Shared handle to the scheduling engine
#[derive(Clone)]
pub struct Scheduler {
    state: Arc<Mutex<SchedulerState>>,
    player_tx: mpsc::UnboundedSender<PlayerCommand>,
    session_capacity: usize,
}

impl Scheduler {
    /// Create a scheduler whose backend commands are sent to the returned receiver
    pub fn new(session_capacity: usize) -> (Self, mpsc::UnboundedReceiver<PlayerCommand>) {
        let (player_tx, player_rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            state: Arc::new(Mutex::new(SchedulerState::default())),
            player_tx,
            session_capacity,
        };
        (scheduler, player_rx)
    }

    fn command_player(&self, command: PlayerCommand) {
        if self.player_tx.send(command).is_err() {
            debug!("Player task is gone, dropping backend command");
        }
    }

    /// Append a song to the pending set and broadcast `add`
    ///
    /// The stored song always starts at weight 0. A URI that is already
    /// pending is added again as a separate item.
    pub async fn add(&self, song: Song) -> Song {
        let song = Song { weight: 0, ..song };

        let mut state = self.state.lock().await;
        state.queue.add(song.clone());

        info!("Added song {} ({} pending)", song.uri, state.queue.len());
        state.hub.publish(WrmsEvent::add(vec![song.clone()]));
        song
    }

    /// Apply a vote by `voter` on the pending song `uri`
    ///
    /// The earliest-added pending item with that URI is the target. A
    /// successful vote re-keys the item and broadcasts `update`; a rejected
    /// vote changes nothing and broadcasts nothing.
    pub async fn vote(&self, voter: VoterId, uri: &str, action: VoteAction) -> Result<VoteReceipt> {
        let mut state = self.state.lock().await;

        let id = state
            .queue
            .find_by_uri(uri)
            .ok_or_else(|| Error::UnknownSong(uri.to_string()))?;
        let outcome = state
            .queue
            .votes_mut(id)
            .map(|votes| votes.apply(voter, action))
            .ok_or_else(|| Error::UnknownSong(uri.to_string()))?;

        if let VoteOutcome::Applied { delta, .. } = outcome {
            let weight = state.queue.get(id).map(Item::weight).unwrap_or_default() + delta;
            state.queue.adjust(id, weight);
        }

        let song = state
            .queue
            .get(id)
            .map(Item::to_song)
            .ok_or_else(|| Error::UnknownSong(uri.to_string()))?;

        match outcome {
            VoteOutcome::Applied { delta, .. } => {
                info!("{} {} by {}: weight {} ({:+})", action, uri, voter, song.weight, delta);
                state.hub.publish(WrmsEvent::update(song.clone()));
            }
            VoteOutcome::Rejected(reason) => {
                info!("Rejected {} of {} by {}: {:?}", action, uri, voter, reason);
            }
        }

        Ok(VoteReceipt { outcome, song })
    }

    /// Resume the current song, or start the top of the queue if none is current
    pub async fn play(&self) -> PlayOutcome {
        let mut state = self.state.lock().await;
        let state = &mut *state;
        let outcome = state.playback.play_or_resume(&mut state.queue);
        self.after_play(&mut state.hub, &outcome);
        outcome
    }

    pub async fn pause(&self) -> PauseOutcome {
        let mut state = self.state.lock().await;
        let outcome = state.playback.pause();
        self.after_pause(&mut state.hub, outcome);
        outcome
    }

    /// Toggle between playing and paused
    pub async fn play_pause(&self) -> ToggleOutcome {
        let mut state = self.state.lock().await;
        let state = &mut *state;
        let outcome = state.playback.toggle(&mut state.queue);
        match &outcome {
            ToggleOutcome::Play(play) => self.after_play(&mut state.hub, play),
            ToggleOutcome::Pause(pause) => self.after_pause(&mut state.hub, *pause),
        }
        outcome
    }

    /// External signal that the current track ended (or was skipped)
    ///
    /// With `Some(uri)` the signal is ignored unless `uri` is the current
    /// song, so a late notification for an earlier track has no effect.
    pub async fn finished(&self, uri: Option<&str>) -> AdvanceOutcome {
        let mut state = self.state.lock().await;
        let state = &mut *state;

        if let (Some(uri), Some(current)) = (uri, state.playback.current()) {
            if current.uri() != uri {
                debug!("Ignoring finished signal for {} (current is {})", uri, current.uri());
                return AdvanceOutcome::NothingCurrent;
            }
        }

        let outcome = state.playback.advance(&mut state.queue);
        match &outcome {
            AdvanceOutcome::Next(song) => {
                info!("Advancing to {}", song.uri);
                state.hub.publish(WrmsEvent::play(song.clone()));
                self.command_player(PlayerCommand::Play(song.clone()));
            }
            AdvanceOutcome::Stopped => {
                info!("Nothing left to play");
                state.hub.publish(WrmsEvent::pause());
                self.command_player(PlayerCommand::Pause);
            }
            AdvanceOutcome::NothingCurrent => {}
        }
        outcome
    }

    fn after_play(&self, hub: &mut BroadcastHub, outcome: &PlayOutcome) {
        match outcome {
            PlayOutcome::Started(song) => {
                info!("Playing {}", song.uri);
                hub.publish(WrmsEvent::play(song.clone()));
                self.command_player(PlayerCommand::Play(song.clone()));
            }
            PlayOutcome::Resumed(song) => {
                info!("Resuming {}", song.uri);
                hub.publish(WrmsEvent::play(song.clone()));
                self.command_player(PlayerCommand::Resume(song.clone()));
            }
            PlayOutcome::AlreadyPlaying(_) => {}
            PlayOutcome::Idle => info!("No song to play"),
        }
    }

    fn after_pause(&self, hub: &mut BroadcastHub, outcome: PauseOutcome) {
        if outcome == PauseOutcome::Paused {
            info!("Paused");
            hub.publish(WrmsEvent::pause());
            self.command_player(PlayerCommand::Pause);
        }
    }

    /// Open a session for `voter` and queue its join replay
    ///
    /// Returns `None` only if the replay could not be queued.
    pub async fn register(&self, voter: VoterId) -> Option<Session> {
        let (handle, session) = hub::channel(voter, self.session_capacity);

        let mut state = self.state.lock().await;
        let replay = hub::join_replay(
            &voter,
            state.playback.current(),
            state.playback.is_playing(),
            state.queue.iter(),
        );
        state.hub.register(handle, replay).then_some(session)
    }

    /// Remove a session; safe to call more than once
    pub async fn unregister(&self, key: SessionKey) -> bool {
        self.state.lock().await.hub.unregister(key)
    }

    /// Run a session's writer until it ends, then unregister it
    pub async fn serve_session<S, C>(&self, session: Session, sink: S, cancel: C) -> WriterExit
    where
        S: EventSink,
        C: Future<Output = ()> + Send,
    {
        let key = session.key;
        let exit = session.run(sink, cancel).await;
        self.unregister(key).await;
        exit
    }

    pub async fn snapshot(&self) -> QueueSnapshot {
        let state = self.state.lock().await;
        QueueSnapshot {
            current: state.playback.current().map(Item::to_song),
            playing: state.playback.is_playing(),
            songs: state.queue.iter().map(Item::to_song).collect(),
            sessions: state.hub.len(),
        }
    }

    /// Pending songs in arrival order
    pub async fn pending(&self) -> Vec<Song> {
        self.state.lock().await.queue.iter().map(Item::to_song).collect()
    }

    pub async fn current(&self) -> Option<Song> {
        self.state.lock().await.playback.current().map(Item::to_song)
    }

    pub async fn is_playing(&self) -> bool {
        self.state.lock().await.playback.is_playing()
    }

    pub async fn session_count(&self) -> usize {
        self.state.lock().await.hub.len()
    }

    /// Close every session queue; writers drain and release their transports
    pub async fn shutdown(&self) {
        info!("Shutting down scheduler");
        self.state.lock().await.hub.close_all();
        self.command_player(PlayerCommand::Shutdown);
    }
}
