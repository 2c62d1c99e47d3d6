//! HTTP request handlers

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequestParts, Query, State},
    http::{header, request::Parts, HeaderMap},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use wrms_common::{uuid_utils, Song, VoteAction, WrmsEvent};

use super::AppState;
use crate::error::{Error, Result};
use crate::scheduler::{
    AdvanceOutcome, PauseOutcome, PlayOutcome, QueueSnapshot, ToggleOutcome, VoteOutcome,
    VoteRejection, VoteState, VoterId,
};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
    build: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pattern: String,
}

#[derive(Debug, Deserialize)]
pub struct SongParam {
    song: Option<String>,
}

/// Result of a vote request
///
/// `status` is `"ok"` when the vote changed the song and `"rejected"` when
/// it was a no-op for this voter.
#[derive(Debug, Serialize)]
pub struct VoteResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'static str>,
    vote: &'static str,
    song: Song,
}

/// Result of a playback request
///
/// `status` is `"playing"`, `"paused"` or `"idle"` (nothing to play).
#[derive(Debug, Serialize)]
pub struct PlaybackResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    song: Option<Song>,
}

impl PlaybackResponse {
    fn playing(song: Song) -> Self {
        Self {
            status: "playing",
            song: Some(song),
        }
    }

    fn paused() -> Self {
        Self {
            status: "paused",
            song: None,
        }
    }

    fn idle() -> Self {
        Self {
            status: "idle",
            song: None,
        }
    }
}

impl From<PlayOutcome> for PlaybackResponse {
    fn from(outcome: PlayOutcome) -> Self {
        match outcome {
            PlayOutcome::Started(song)
            | PlayOutcome::Resumed(song)
            | PlayOutcome::AlreadyPlaying(song) => Self::playing(song),
            PlayOutcome::Idle => Self::idle(),
        }
    }
}

// ============================================================================
// Voter identity
// ============================================================================

/// Voter id taken from the `UUID` cookie
///
/// Rejects the request with 401 when the cookie is absent and 400 when it
/// does not hold a UUID.
#[derive(Debug, Clone, Copy)]
pub struct Voter(pub VoterId);

#[async_trait]
impl<S> FromRequestParts<S> for Voter
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        cookie_voter(&parts.headers)
            .ok_or(Error::MissingVoterId)?
            .map(Voter)
    }
}

/// Voter id from the request's cookies, if one is present
pub(crate) fn cookie_voter(headers: &HeaderMap) -> Option<Result<VoterId>> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(uuid_utils::id_from_cookie_header)
        .map(|raw| {
            uuid_utils::parse(raw)
                .map_err(|e| Error::MalformedInput(format!("invalid {} cookie: {}", uuid_utils::ID_COOKIE, e)))
        })
}

/// Id for an observer connection: cookie, then `id` query value, then a fresh one
pub(crate) fn observer_id(headers: &HeaderMap, query_id: Option<&str>) -> VoterId {
    if let Some(Ok(id)) = cookie_voter(headers) {
        return id;
    }
    if let Some(id) = query_id.and_then(|raw| uuid_utils::parse(raw).ok()) {
        return id;
    }
    debug!("Observer has no id, assigning a fresh one");
    uuid_utils::generate()
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "wrms".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        build: env!("WRMS_GIT_HASH").to_string(),
    })
}

/// GET /search?pattern=
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<WrmsEvent> {
    let songs = state.backends.search(&params.pattern);
    debug!("Search {:?}: {} results", params.pattern, songs.len());
    Json(WrmsEvent::search(songs))
}

/// POST /add with a JSON song body
pub async fn add(State(state): State<AppState>, body: Bytes) -> Result<Json<Song>> {
    let song = Song::from_json(&body).map_err(|e| {
        warn!("Rejecting add request: {}", e);
        Error::MalformedInput(e.to_string())
    })?;
    Ok(Json(state.scheduler.add(song).await))
}

async fn vote(state: AppState, voter: VoterId, param: SongParam, action: VoteAction) -> Result<Json<VoteResponse>> {
    let uri = param
        .song
        .filter(|uri| !uri.is_empty())
        .ok_or_else(|| Error::MalformedInput("missing song parameter".to_string()))?;

    let receipt = state.scheduler.vote(voter, &uri, action).await?;
    let response = match receipt.outcome {
        VoteOutcome::Applied { state: vote_state, .. } => VoteResponse {
            status: "ok",
            reason: None,
            vote: vote_state_str(vote_state),
            song: receipt.song,
        },
        VoteOutcome::Rejected(reason) => VoteResponse {
            status: "rejected",
            reason: Some(rejection_str(reason)),
            vote: vote_state_str(match reason {
                VoteRejection::AlreadyUpvoted => VoteState::Upvoted,
                VoteRejection::AlreadyDownvoted => VoteState::Downvoted,
                VoteRejection::NotVoted => VoteState::Neutral,
            }),
            song: receipt.song,
        },
    };
    Ok(Json(response))
}

fn vote_state_str(state: VoteState) -> &'static str {
    match state {
        VoteState::Neutral => "neutral",
        VoteState::Upvoted => "upvoted",
        VoteState::Downvoted => "downvoted",
    }
}

fn rejection_str(reason: VoteRejection) -> &'static str {
    match reason {
        VoteRejection::AlreadyUpvoted => "already upvoted",
        VoteRejection::AlreadyDownvoted => "already downvoted",
        VoteRejection::NotVoted => "not voted",
    }
}

/// /up?song=<uri>
pub async fn upvote(
    State(state): State<AppState>,
    Voter(voter): Voter,
    Query(param): Query<SongParam>,
) -> Result<Json<VoteResponse>> {
    vote(state, voter, param, VoteAction::Up).await
}

/// /down?song=<uri>
pub async fn downvote(
    State(state): State<AppState>,
    Voter(voter): Voter,
    Query(param): Query<SongParam>,
) -> Result<Json<VoteResponse>> {
    vote(state, voter, param, VoteAction::Down).await
}

/// /unvote?song=<uri>
pub async fn unvote(
    State(state): State<AppState>,
    Voter(voter): Voter,
    Query(param): Query<SongParam>,
) -> Result<Json<VoteResponse>> {
    vote(state, voter, param, VoteAction::Unvote).await
}

/// /playpause
pub async fn play_pause(State(state): State<AppState>) -> Json<PlaybackResponse> {
    let response = match state.scheduler.play_pause().await {
        ToggleOutcome::Play(outcome) => outcome.into(),
        ToggleOutcome::Pause(_) => PlaybackResponse::paused(),
    };
    Json(response)
}

/// POST /play
pub async fn play(State(state): State<AppState>) -> Json<PlaybackResponse> {
    Json(state.scheduler.play().await.into())
}

/// POST /pause
pub async fn pause(State(state): State<AppState>) -> Json<PlaybackResponse> {
    let response = match state.scheduler.pause().await {
        PauseOutcome::Paused => PlaybackResponse::paused(),
        PauseOutcome::NotPlaying => match state.scheduler.current().await {
            Some(_) => PlaybackResponse::paused(),
            None => PlaybackResponse::idle(),
        },
    };
    Json(response)
}

/// POST /next: the current song ended or was skipped
pub async fn next(State(state): State<AppState>) -> Json<PlaybackResponse> {
    let response = match state.scheduler.finished(None).await {
        AdvanceOutcome::Next(song) => PlaybackResponse::playing(song),
        AdvanceOutcome::Stopped | AdvanceOutcome::NothingCurrent => PlaybackResponse::idle(),
    };
    Json(response)
}

/// GET /queue
pub async fn queue(State(state): State<AppState>) -> Json<QueueSnapshot> {
    Json(state.scheduler.snapshot().await)
}
