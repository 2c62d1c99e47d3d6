//! Dummy backend: a fixed in-memory catalog that plays nothing

use std::time::Duration;
use tracing::info;
use wrms_common::Song;

use super::clock::TrackClock;
use super::Backend;
use crate::error::Result;

pub const NAME: &str = "dummy";

const CATALOG: &[(&str, &str)] = &[
    ("Lala", "SNFMT"),
    ("Hobelbank", "MC Wankwichtel"),
    ("Nachtzug", "Die Weichensteller"),
    ("Regen in Bremen", "Kiesel"),
    ("Fernweh", "SNFMT"),
];

pub struct DummyBackend {
    songs: Vec<Song>,
    /// Simulated track length; `None` means tracks never end on their own
    track_length: Option<(TrackClock, Duration)>,
}

impl DummyBackend {
    pub fn new(track_length: Option<(TrackClock, Duration)>) -> Self {
        let songs = CATALOG
            .iter()
            .map(|(title, artist)| {
                let slug = title.to_lowercase().replace(' ', "-");
                Song::new(*title, *artist, NAME, format!("{}:{}", NAME, slug))
            })
            .collect();
        Self { songs, track_length }
    }
}

impl Backend for DummyBackend {
    fn name(&self) -> &str {
        NAME
    }

    fn search(&self, pattern: &str) -> Vec<Song> {
        self.songs
            .iter()
            .filter(|song| song.matches(pattern))
            .cloned()
            .collect()
    }

    fn play(&self, song: &Song) -> Result<()> {
        info!("Dummy playing {} - {}", song.artist, song.title);
        if let Some((clock, length)) = &self.track_length {
            clock.start(&song.uri, *length);
        }
        Ok(())
    }

    fn resume(&self, song: &Song) -> Result<()> {
        info!("Dummy resuming {} - {}", song.artist, song.title);
        if let Some((clock, length)) = &self.track_length {
            clock.resume(&song.uri, *length);
        }
        Ok(())
    }

    fn pause(&self) -> Result<()> {
        info!("Dummy paused");
        if let Some((clock, _)) = &self.track_length {
            clock.pause();
        }
        Ok(())
    }
}
