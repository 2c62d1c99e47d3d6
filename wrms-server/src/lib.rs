//! # WRMS server
//!
//! A shared, vote-driven playback queue. Clients search the configured
//! backends, add songs, and up- or downvote pending songs; the song with
//! the highest weight plays next. Every state change is pushed to all
//! connected observers over WebSocket or Server-Sent Events.

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod hub;
pub mod scheduler;

pub use error::{Error, Result};
