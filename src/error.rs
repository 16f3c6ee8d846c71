//! Domain-specific error types for conference-bot

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Main error type for the conference-bot crate
#[derive(Error, Debug)]
pub enum ConferenceBotError {
    #[error("Category catalog error: {message}")]
    Catalog { message: String },

    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: String },

    #[error("Session incomplete: {message}")]
    SessionIncomplete { message: String },

    #[error("I/O error: {message}")]
    Io { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<anyhow::Error> for ConferenceBotError {
    fn from(err: anyhow::Error) -> Self {
        ConferenceBotError::Internal {
            message: err.to_string(),
        }
    }
}

/// TOML parsed by the crate itself is category data.
impl From<toml::de::Error> for ConferenceBotError {
    fn from(err: toml::de::Error) -> Self {
        ConferenceBotError::Catalog {
            message: format!("invalid category catalog: {}", err),
        }
    }
}

/// Convert ConferenceBotError to an HTTP response
impl IntoResponse for ConferenceBotError {
    fn into_response(self) -> Response {
        let (status, label) = match &self {
            ConferenceBotError::SessionNotFound { .. } => {
                (StatusCode::NOT_FOUND, "Session not found")
            }
            ConferenceBotError::SessionIncomplete { .. } => {
                (StatusCode::CONFLICT, "Session incomplete")
            }
            ConferenceBotError::Catalog { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Configuration error")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error"),
        };

        (
            status,
            [(header::CONTENT_TYPE, "application/json")],
            json!({
                "error": {
                    "code": status.as_u16(),
                    "message": format!("{label}: {self}"),
                }
            })
            .to_string(),
        )
            .into_response()
    }
}

/// Result type alias for conference-bot operations
pub type Result<T> = std::result::Result<T, ConferenceBotError>;

/// Why a conversation turn did not advance.
///
/// Every variant is recoverable: the participant retries the same step.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnError {
    #[error("a required answer was left blank")]
    EmptyInput,

    #[error("no {registry} matched the answer")]
    NoMatch { registry: String },

    #[error("{constraint}")]
    OutOfRange { constraint: String },

    #[error("selection must be one of the {available} options shown")]
    InvalidSelection { available: usize },

    #[error("the conversation has already finished")]
    ConversationClosed,
}
