//! Error types for mgvp-gp
//!
//! Classifier-level faults never surface here: they resolve to "no event".
//! Only the playback controller, the budget monitor and the outer service
//! layers produce these errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Main error type for the gesture playback service
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Sensor consent refused (fall back to buttons, never retried automatically)
    #[error("Sensor permission denied: {0}")]
    PermissionDenied(String),

    /// No sensor hardware/API or no secure context (fall back for the session)
    #[error("Sensor unavailable: {0}")]
    SensorUnavailable(String),

    /// Media item could not be loaded
    #[error("Item {item_id} failed to load: {reason}")]
    ItemLoad { item_id: String, reason: String },

    /// Remote authority reports the watch budget is used up
    #[error("Watch budget exhausted")]
    BudgetExhausted,

    /// Transient failure talking to a remote service
    #[error("Network error: {0}")]
    Network(String),

    /// Scanned token has no playable items
    #[error("No items to play")]
    EmptySequence,

    /// Items have duplicate or non-contiguous order values
    #[error("Invalid sequence: {0}")]
    InvalidSequence(String),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Shared library errors
    #[error(transparent)]
    Common(#[from] mgvp_common::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Network(e.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Error::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Error::InvalidState(_) => (StatusCode::CONFLICT, "INVALID_STATE"),
            Error::EmptySequence => (StatusCode::UNPROCESSABLE_ENTITY, "EMPTY_SEQUENCE"),
            Error::InvalidSequence(_) => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_SEQUENCE"),
            Error::Network(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_UNAVAILABLE"),
            Error::ItemLoad { .. } => (StatusCode::BAD_GATEWAY, "ITEM_LOAD_FAILED"),
            Error::PermissionDenied(_) => (StatusCode::FORBIDDEN, "PERMISSION_DENIED"),
            Error::SensorUnavailable(_) => (StatusCode::CONFLICT, "SENSOR_UNAVAILABLE"),
            Error::BudgetExhausted => (StatusCode::PAYMENT_REQUIRED, "LIMIT_REACHED"),
            Error::Config(_) | Error::Http(_) | Error::Common(_) | Error::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
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

/// Convenience Result type using mgvp-gp Error
pub type Result<T> = std::result::Result<T, Error>;
