//! Server-Sent Events observer transport (`GET /events`)
//!
//! The session queue is the response stream. The SSE `event:` field is the
//! event's `cmd` and `data:` is the full JSON event.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::handlers::observer_id;
use super::AppState;
use crate::error::{Error, Result};
use crate::hub::SessionKey;
use crate::scheduler::Scheduler;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
pub struct EventParams {
    id: Option<String>,
}

/// Unregisters the session when the response stream is dropped
struct SessionGuard {
    scheduler: Scheduler,
    key: SessionKey,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let scheduler = self.scheduler.clone();
        let key = self.key;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if scheduler.unregister(key).await {
                        info!("SSE observer {} disconnected", key);
                    }
                });
            }
            Err(_) => debug!("No runtime to unregister {}", key),
        }
    }
}

/// GET /events
pub async fn event_stream(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<EventParams>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let voter = observer_id(&headers, params.id.as_deref());
    let mut session = state
        .scheduler
        .register(voter)
        .await
        .ok_or_else(|| Error::Http("could not open event session".to_string()))?;

    let guard = SessionGuard {
        scheduler: state.scheduler.clone(),
        key: session.key,
    };
    info!("SSE observer {} connected as {}", voter, session.key);

    let stream = async_stream::stream! {
        let _guard = guard;
        while let Some(event) = session.recv().await {
            match event.to_json() {
                Ok(json) => {
                    debug!("Sending {} event to {}", event.cmd, session.key);
                    yield Ok::<Event, Infallible>(Event::default().event(event.cmd.as_str()).data(json));
                }
                Err(e) => warn!("Failed to serialize {} event: {}", event.cmd, e),
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    ))
}
