//! HTTP surface
//!
//! Request/response endpoints for searching, adding, voting and playback
//! control, plus the two observer transports (`/ws` and `/events`).

pub mod handlers;
pub mod sse;
pub mod ws;

use axum::{
    response::Redirect,
    routing::{get, post},
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::backend::Backends;
use crate::scheduler::Scheduler;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub scheduler: Scheduler,
    pub backends: Arc<Backends>,
    /// Directory served under /static
    pub static_dir: Option<PathBuf>,
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let static_dir = state.static_dir.clone();

    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(|| async { Redirect::temporary("/static/index.html") }))
        .route("/search", get(handlers::search))
        .route("/add", post(handlers::add))
        .route("/up", get(handlers::upvote).post(handlers::upvote))
        .route("/down", get(handlers::downvote).post(handlers::downvote))
        .route("/unvote", get(handlers::unvote).post(handlers::unvote))
        .route("/playpause", get(handlers::play_pause).post(handlers::play_pause))
        .route("/play", post(handlers::play))
        .route("/pause", post(handlers::pause))
        .route("/next", post(handlers::next))
        .route("/queue", get(handlers::queue))
        .route("/ws", get(ws::ws_handler))
        .route("/events", get(sse::event_stream));

    if let Some(dir) = static_dir {
        router = router.nest_service("/static", ServeDir::new(dir));
    }

    router
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
