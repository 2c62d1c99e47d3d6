//! # WRMS Common Library
//!
//! Shared code for the WRMS vote-driven playback queue:
//! - Wire types sent to observers (Song, WrmsEvent)
//! - Vote actions accepted from clients
//! - Configuration loading
//! - Voter/observer id helpers

pub mod config;
pub mod error;
pub mod events;
pub mod song;
pub mod uuid_utils;

pub use error::{Error, Result};
pub use events::{EventKind, VoteAction, WrmsEvent};
pub use song::Song;
