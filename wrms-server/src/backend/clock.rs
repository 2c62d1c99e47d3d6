//! Simulated track clock
//!
//! Backends that do not produce audio themselves use this to report when a
//! track would have ended. Pausing stops the clock and keeps the remaining
//! time for [`TrackClock::resume`]; [`TrackClock::start`] always times a
//! new play from zero.

use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::PlayerEvent;

#[derive(Debug)]
struct Running {
    uri: String,
    remaining: Duration,
    started: Instant,
    timer: Option<JoinHandle<()>>,
}

#[derive(Debug)]
pub struct TrackClock {
    events: mpsc::UnboundedSender<PlayerEvent>,
    running: Mutex<Option<Running>>,
}

impl TrackClock {
    pub fn new(events: mpsc::UnboundedSender<PlayerEvent>) -> Self {
        Self {
            events,
            running: Mutex::new(None),
        }
    }

    /// Time a new play of `uri` from the beginning
    pub fn start(&self, uri: &str, length: Duration) {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(timer) = running.take().and_then(|prev| prev.timer) {
            timer.abort();
        }
        *running = Some(self.spawn_timer(uri, length));
    }

    /// Continue timing a paused `uri` with the time it had left
    ///
    /// Falls back to a fresh start when the clock holds no paused `uri`.
    pub fn resume(&self, uri: &str, length: Duration) {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        let remaining = match running.take() {
            Some(prev) if prev.uri == uri && prev.timer.is_none() => prev.remaining,
            Some(prev) => {
                if let Some(timer) = prev.timer {
                    timer.abort();
                }
                length
            }
            None => length,
        };
        *running = Some(self.spawn_timer(uri, remaining));
    }

    fn spawn_timer(&self, uri: &str, remaining: Duration) -> Running {
        let timer = match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let events = self.events.clone();
                let uri = uri.to_string();
                Some(handle.spawn(async move {
                    tokio::time::sleep(remaining).await;
                    debug!("Track {} finished", uri);
                    let _ = events.send(PlayerEvent::Finished { uri });
                }))
            }
            Err(_) => {
                warn!("No runtime available, track {} will not finish on its own", uri);
                None
            }
        };

        Running {
            uri: uri.to_string(),
            remaining,
            started: Instant::now(),
            timer,
        }
    }

    /// Stop the clock, keeping the time left on the current track
    pub fn pause(&self) {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(current) = running.as_mut() {
            if let Some(timer) = current.timer.take() {
                timer.abort();
                current.remaining = current.remaining.saturating_sub(current.started.elapsed());
            }
        }
    }
}
