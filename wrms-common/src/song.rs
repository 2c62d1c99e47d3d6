//! Song wire model
//!
//! The representation of a track that is sent to observers and accepted
//! from add requests. Voter sets never appear on the wire.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A track as seen by clients
///
/// `uri` is the stable identity of the track within its backend. `weight`
/// is the net vote tally at the time the song was serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    /// Backend tag (e.g. "dummy", "local")
    #[serde(default)]
    pub source: String,
    pub uri: String,
    #[serde(default)]
    pub weight: i64,
}

impl Song {
    /// Create a new song with zero weight
    pub fn new(
        title: impl Into<String>,
        artist: impl Into<String>,
        source: impl Into<String>,
        uri: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            source: source.into(),
            uri: uri.into(),
            weight: 0,
        }
    }

    /// Parse an add-request payload
    ///
    /// Rejects payloads that are not a JSON object with a non-empty `uri`.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let song: Song = serde_json::from_slice(data)?;
        if song.uri.trim().is_empty() {
            return Err(Error::InvalidInput("song uri must not be empty".to_string()));
        }
        Ok(song)
    }

    /// Case-insensitive match of `pattern` against title and artist
    pub fn matches(&self, pattern: &str) -> bool {
        let pattern = pattern.to_lowercase();
        self.title.to_lowercase().contains(&pattern) || self.artist.to_lowercase().contains(&pattern)
    }
}
