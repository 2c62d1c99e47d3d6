//! Local backend: songs found in a music directory
//!
//! The directory is scanned once at startup. Title and artist come from the
//! file's tags, falling back to the file stem and the parent folder name.
//! Playing a song only logs it and runs the track clock for the tagged
//! duration; audio output is left to an external player.

use lofty::file::TaggedFileExt;
use lofty::prelude::*;
use lofty::probe::Probe;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use wrms_common::Song;

use super::clock::TrackClock;
use super::Backend;
use crate::error::{Error, Result};

pub const NAME: &str = "local";

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "ogg", "opus", "m4a", "aac", "wav", "aiff"];

#[derive(Debug, Clone)]
struct LocalTrack {
    song: Song,
    path: PathBuf,
    duration: Option<Duration>,
}

pub struct LocalBackend {
    tracks: Vec<LocalTrack>,
    by_uri: HashMap<String, usize>,
    clock: TrackClock,
}

impl LocalBackend {
    /// Scan `root` for audio files (blocking)
    pub fn scan(root: &Path, clock: TrackClock) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::Config(format!(
                "music directory {} is not a directory",
                root.display()
            )));
        }

        let mut tracks = Vec::new();
        for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Error accessing entry: {}", e);
                    continue;
                }
            };
            if entry.file_type().is_file() && is_audio_file(entry.path()) {
                tracks.push(read_track(entry.path()));
            }
        }

        let by_uri = tracks
            .iter()
            .enumerate()
            .map(|(i, track)| (track.song.uri.clone(), i))
            .collect();

        info!("Found {} songs in {}", tracks.len(), root.display());
        Ok(Self {
            tracks,
            by_uri,
            clock,
        })
    }

    fn track(&self, song: &Song) -> Result<&LocalTrack> {
        self.by_uri
            .get(&song.uri)
            .and_then(|i| self.tracks.get(*i))
            .ok_or_else(|| Error::Backend(format!("{} is not in the local library", song.uri)))
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn read_track(path: &Path) -> LocalTrack {
    let fallback_title = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let fallback_artist = path
        .parent()
        .and_then(|p| p.file_name())
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    let (title, artist, duration) = match Probe::open(path).and_then(|probe| probe.read()) {
        Ok(tagged_file) => {
            let duration = Some(tagged_file.properties().duration()).filter(|d| !d.is_zero());
            let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag());
            let title = tag.and_then(|t| t.title().map(|s| s.to_string()));
            let artist = tag.and_then(|t| t.artist().map(|s| s.to_string()));
            (title, artist, duration)
        }
        Err(e) => {
            debug!("No tags for {}: {}", path.display(), e);
            (None, None, None)
        }
    };

    let uri = format!("file://{}", path.display());
    LocalTrack {
        song: Song::new(
            title.filter(|t| !t.is_empty()).unwrap_or(fallback_title),
            artist.filter(|a| !a.is_empty()).unwrap_or(fallback_artist),
            NAME,
            uri,
        ),
        path: path.to_path_buf(),
        duration,
    }
}

impl Backend for LocalBackend {
    fn name(&self) -> &str {
        NAME
    }

    fn search(&self, pattern: &str) -> Vec<Song> {
        self.tracks
            .iter()
            .filter(|track| track.song.matches(pattern))
            .map(|track| track.song.clone())
            .collect()
    }

    fn play(&self, song: &Song) -> Result<()> {
        let track = self.track(song)?;
        info!("Local playing {}", track.path.display());
        if let Some(duration) = track.duration {
            self.clock.start(&song.uri, duration);
        }
        Ok(())
    }

    fn resume(&self, song: &Song) -> Result<()> {
        let track = self.track(song)?;
        info!("Local resuming {}", track.path.display());
        if let Some(duration) = track.duration {
            self.clock.resume(&song.uri, duration);
        }
        Ok(())
    }

    fn pause(&self) -> Result<()> {
        info!("Local paused");
        self.clock.pause();
        Ok(())
    }
}
