//! Broadcast hub: fan-out of state changes to live observer sessions
//!
//! The hub is owned by the scheduler and only touched inside its critical
//! section, so events reach every session queue in one total order.
//! Delivery never waits: each session has a bounded queue and a session
//! whose queue is full or whose writer is gone is dropped on the spot.
//! A dropped observer that reconnects is brought up to date by the join
//! replay.

pub mod session;

pub use session::{channel, DeliveryError, EventSink, Session, SessionHandle, SessionKey, WriterExit};

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use wrms_common::WrmsEvent;

use crate::scheduler::{Item, VoteState, VoterId};

#[derive(Debug, Default)]
pub struct BroadcastHub {
    sessions: HashMap<SessionKey, SessionHandle>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, key: SessionKey) -> bool {
        self.sessions.contains_key(&key)
    }

    /// Add a session, queueing `replay` ahead of any later event
    ///
    /// Returns `false` if the replay could not be queued (the session's
    /// writer is already gone); the session is then not registered.
    pub fn register(&mut self, session: SessionHandle, replay: Vec<WrmsEvent>) -> bool {
        for event in replay {
            if let Err(e) = session.deliver(Arc::new(event)) {
                warn!("Join replay for {} failed: {:?}", session.key, e);
                return false;
            }
        }

        info!("Registered {} (voter {})", session.key, session.voter);
        self.sessions.insert(session.key, session);
        true
    }

    /// Deliver `event` to every registered session, in publish order
    ///
    /// Sessions that cannot take the event are unregistered. Returns the
    /// number of sessions the event was queued for.
    pub fn publish(&mut self, event: WrmsEvent) -> usize {
        let event = Arc::new(event);
        let mut dropped = Vec::new();

        for (key, session) in &self.sessions {
            if let Err(e) = session.deliver(Arc::clone(&event)) {
                match e {
                    DeliveryError::Full => warn!("{} is not keeping up, dropping it", key),
                    DeliveryError::Closed => debug!("{} writer is gone, dropping it", key),
                }
                dropped.push(*key);
            }
        }

        for key in &dropped {
            self.unregister(*key);
        }

        let delivered = self.sessions.len();
        debug!("Published {} event to {} sessions", event.cmd, delivered);
        delivered
    }

    /// Remove a session; safe to call more than once
    pub fn unregister(&mut self, key: SessionKey) -> bool {
        match self.sessions.remove(&key) {
            Some(_) => {
                info!("Unregistered {}", key);
                true
            }
            None => false,
        }
    }

    /// Drop every session; each writer drains and closes its transport
    pub fn close_all(&mut self) {
        if !self.sessions.is_empty() {
            info!("Closing {} sessions", self.sessions.len());
        }
        self.sessions.clear();
    }
}

/// Events a newly joined observer needs to reconstruct current state
///
/// In order: `play` with the current item if playing, `add` with all pending
/// items if any are pending, then `upvoted` / `downvoted` listing pending items
/// this voter has voted on (each only if non-empty).
pub fn join_replay<'a>(
    voter: &VoterId,
    current: Option<&Item>,
    playing: bool,
    pending: impl Iterator<Item = &'a Item>,
) -> Vec<WrmsEvent> {
    let mut replay = Vec::new();

    if playing {
        if let Some(current) = current {
            replay.push(WrmsEvent::play(current.to_song()));
        }
    }

    let mut all = Vec::new();
    let mut upvoted = Vec::new();
    let mut downvoted = Vec::new();
    for item in pending {
        let song = item.to_song();
        match item.vote_state(voter) {
            VoteState::Upvoted => upvoted.push(song.clone()),
            VoteState::Downvoted => downvoted.push(song.clone()),
            VoteState::Neutral => {}
        }
        all.push(song);
    }

    if !all.is_empty() {
        replay.push(WrmsEvent::add(all));
    }
    if !upvoted.is_empty() {
        replay.push(WrmsEvent::upvoted(upvoted));
    }
    if !downvoted.is_empty() {
        replay.push(WrmsEvent::downvoted(downvoted));
    }

    replay
}
