//! Pending item: a track reference plus its vote-derived weight

use wrms_common::Song;

use super::votes::{VoteLedger, VoterId, VoteState};

/// Stable handle of an item in the queue
///
/// Handles are assigned in arrival order and never reused, so comparing two
/// handles tells which item was added first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(pub(super) u64);

#[derive(Debug, Clone)]
pub struct Item {
    id: ItemId,
    title: String,
    artist: String,
    source: String,
    uri: String,
    /// Only the queue writes this, so heap order always reflects it
    pub(super) weight: i64,
    pub(super) votes: VoteLedger,
}

impl Item {
    /// Build a fresh item from an add request; any client-supplied weight is dropped
    pub(super) fn new(id: ItemId, song: Song) -> Self {
        Self {
            id,
            title: song.title,
            artist: song.artist,
            source: song.source,
            uri: song.uri,
            weight: 0,
            votes: VoteLedger::new(),
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn weight(&self) -> i64 {
        self.weight
    }

    pub fn vote_state(&self, voter: &VoterId) -> VoteState {
        self.votes.state_of(voter)
    }

    /// Wire representation (voter sets are never serialized)
    pub fn to_song(&self) -> Song {
        Song {
            title: self.title.clone(),
            artist: self.artist.clone(),
            source: self.source.clone(),
            uri: self.uri.clone(),
            weight: self.weight,
        }
    }
}
