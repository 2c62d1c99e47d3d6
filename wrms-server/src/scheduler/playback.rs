//! Now-playing slot
//!
//! Holds the single current item and the play/pause flag.
//! `playing` is only ever true while `current` is present.

use wrms_common::Song;

use super::item::Item;
use super::queue::WeightedQueue;

/// Result of a play request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    /// Nothing was current; the top of the queue became current
    Started(Song),
    /// The paused current item resumed
    Resumed(Song),
    /// Already playing; nothing changed
    AlreadyPlaying(Song),
    /// Nothing current and nothing pending
    Idle,
}

/// Result of a pause request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseOutcome {
    Paused,
    NotPlaying,
}

/// Result of a play/pause toggle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Play(PlayOutcome),
    Pause(PauseOutcome),
}

/// Result of the current track finishing (or being skipped)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// Playback continues with the next item
    Next(Song),
    /// The current item was discarded and nothing plays now
    Stopped,
    /// Nothing was current
    NothingCurrent,
}

#[derive(Debug, Default)]
pub struct PlaybackState {
    current: Option<Item>,
    playing: bool,
}

impl PlaybackState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Item> {
        self.current.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Resume the current item, or pull the next one from `queue` if none is current
    pub fn play_or_resume(&mut self, queue: &mut WeightedQueue) -> PlayOutcome {
        if let Some(current) = &self.current {
            let song = current.to_song();
            if self.playing {
                return PlayOutcome::AlreadyPlaying(song);
            }
            self.playing = true;
            return PlayOutcome::Resumed(song);
        }

        match queue.pop_max() {
            Some(next) => {
                let song = next.to_song();
                self.current = Some(next);
                self.playing = true;
                PlayOutcome::Started(song)
            }
            None => PlayOutcome::Idle,
        }
    }

    pub fn pause(&mut self) -> PauseOutcome {
        if !self.playing {
            return PauseOutcome::NotPlaying;
        }
        self.playing = false;
        PauseOutcome::Paused
    }

    pub fn toggle(&mut self, queue: &mut WeightedQueue) -> ToggleOutcome {
        if self.playing {
            ToggleOutcome::Pause(self.pause())
        } else {
            ToggleOutcome::Play(self.play_or_resume(queue))
        }
    }

    /// Discard the current item
    ///
    /// If it was playing and something is pending, the next item becomes
    /// current and keeps playing. Otherwise the slot is left empty and
    /// paused; the next play request pulls from the queue.
    pub fn advance(&mut self, queue: &mut WeightedQueue) -> AdvanceOutcome {
        if self.current.take().is_none() {
            return AdvanceOutcome::NothingCurrent;
        }

        if self.playing {
            if let Some(next) = queue.pop_max() {
                let song = next.to_song();
                self.current = Some(next);
                return AdvanceOutcome::Next(song);
            }
        }

        self.playing = false;
        AdvanceOutcome::Stopped
    }
}
