//! Event types for the WRMS observer protocol
//!
//! Every state change is delivered to observers as a single JSON object:
//!
//! ```json
//! { "cmd": "update", "songs": [ { "title": "...", "uri": "...", "weight": 1, ... } ] }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Song};

/// Kind of state change carried by a [`WrmsEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Songs were added to the pending set
    Add,
    /// A pending song's weight changed
    Update,
    /// Playback started or resumed; carries the current song
    Play,
    /// Playback paused; carries no songs
    Pause,
    /// Join-time replay: pending songs this observer upvoted
    Upvoted,
    /// Join-time replay: pending songs this observer downvoted
    Downvoted,
    /// Result of a catalog search
    Search,
}

impl EventKind {
    /// Wire name of the event kind
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Add => "add",
            EventKind::Update => "update",
            EventKind::Play => "play",
            EventKind::Pause => "pause",
            EventKind::Upvoted => "upvoted",
            EventKind::Downvoted => "downvoted",
            EventKind::Search => "search",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state-change event as sent to observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrmsEvent {
    pub cmd: EventKind,
    pub songs: Vec<Song>,
}

impl WrmsEvent {
    pub fn new(cmd: EventKind, songs: Vec<Song>) -> Self {
        Self { cmd, songs }
    }

    pub fn add(songs: Vec<Song>) -> Self {
        Self::new(EventKind::Add, songs)
    }

    pub fn update(song: Song) -> Self {
        Self::new(EventKind::Update, vec![song])
    }

    pub fn play(song: Song) -> Self {
        Self::new(EventKind::Play, vec![song])
    }

    pub fn pause() -> Self {
        Self::new(EventKind::Pause, Vec::new())
    }

    pub fn upvoted(songs: Vec<Song>) -> Self {
        Self::new(EventKind::Upvoted, songs)
    }

    pub fn downvoted(songs: Vec<Song>) -> Self {
        Self::new(EventKind::Downvoted, songs)
    }

    pub fn search(songs: Vec<Song>) -> Self {
        Self::new(EventKind::Search, songs)
    }

    /// Serialize to the JSON text frame sent over a transport
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A vote cast by an observer on a pending song
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteAction {
    Up,
    Down,
    Unvote,
}

impl VoteAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteAction::Up => "up",
            VoteAction::Down => "down",
            VoteAction::Unvote => "unvote",
        }
    }
}

impl fmt::Display for VoteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(VoteAction::Up),
            "down" => Ok(VoteAction::Down),
            "unvote" => Ok(VoteAction::Unvote),
            other => Err(Error::InvalidInput(format!("invalid vote: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_shape() {
        let event = WrmsEvent::play(Song::new("Lala", "SNFMT", "dummy", "dummy:lala"));
        let json: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();

        assert_eq!(json["cmd"], "play");
        assert_eq!(json["songs"][0]["uri"], "dummy:lala");
        assert_eq!(json["songs"][0]["weight"], 0);
    }

    #[test]
    fn test_pause_has_empty_song_list() {
        let json = WrmsEvent::pause().to_json().unwrap();
        assert_eq!(json, r#"{"cmd":"pause","songs":[]}"#);
    }

    #[test]
    fn test_event_kind_names() {
        for (kind, name) in [
            (EventKind::Add, "add"),
            (EventKind::Update, "update"),
            (EventKind::Play, "play"),
            (EventKind::Pause, "pause"),
            (EventKind::Upvoted, "upvoted"),
            (EventKind::Downvoted, "downvoted"),
            (EventKind::Search, "search"),
        ] {
            assert_eq!(kind.as_str(), name);
            assert_eq!(serde_json::to_value(kind).unwrap(), name);
        }
    }

    #[test]
    fn test_vote_action_parse() {
        assert_eq!("up".parse::<VoteAction>().unwrap(), VoteAction::Up);
        assert_eq!("down".parse::<VoteAction>().unwrap(), VoteAction::Down);
        assert_eq!("unvote".parse::<VoteAction>().unwrap(), VoteAction::Unvote);
        assert!("sideways".parse::<VoteAction>().is_err());
    }
}
