//! Error types for wrms-server
//!
//! Only request-level failures are errors. A rejected vote or a play
//! request with nothing pending are outcomes of the scheduler, not errors
//! (see `scheduler::VoteOutcome` and `scheduler::PlayOutcome`).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Main error type for wrms-server
#[derive(Error, Debug)]
pub enum Error {
    /// Request payload could not be parsed (400)
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Vote references a song that is not pending (404)
    #[error("Unknown song: {0}")]
    UnknownSong(String),

    /// Request carries no voter id cookie (401)
    #[error("No connection ID cookie set")]
    MissingVoterId,

    /// Playback backend failure
    #[error("Backend error: {0}")]
    Backend(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// wrms-common error
    #[error("Common error: {0}")]
    Common(#[from] wrms_common::Error),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            Error::MalformedInput(_) => (StatusCode::BAD_REQUEST, "MALFORMED_INPUT"),
            Error::UnknownSong(_) => (StatusCode::NOT_FOUND, "UNKNOWN_SONG"),
            Error::MissingVoterId => (StatusCode::UNAUTHORIZED, "MISSING_VOTER_ID"),
            Error::Common(wrms_common::Error::InvalidInput(_))
            | Error::Common(wrms_common::Error::Json(_)) => {
                (StatusCode::BAD_REQUEST, "MALFORMED_INPUT")
            }
            Error::Backend(_) => (StatusCode::INTERNAL_SERVER_ERROR, "BACKEND_ERROR"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Convenience Result type using wrms-server Error
pub type Result<T> = std::result::Result<T, Error>;
