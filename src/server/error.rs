//! Mapping of service errors onto HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::conversation::ConversationError;

/// Error returned by route handlers, rendered as `{"error": ...}`.
#[derive(Debug)]
pub enum ApiError {
    /// Caller error, 400.
    BadRequest(String),
    /// Unknown conversation, 404.
    NotFound(String),
    /// Server-side failure, 500. Details are logged, never returned.
    Internal(&'static str),
}

impl ApiError {
    /// Map an error from the chat path, where storage failures read as an
    /// unavailable chat service.
    #[must_use]
    pub fn chat(err: ConversationError) -> Self {
        Self::from_conversation(err, "Chat service temporarily unavailable")
    }

    /// Map an error from the analysis path.
    #[must_use]
    pub fn analysis(err: ConversationError) -> Self {
        Self::from_conversation(err, "Analysis service temporarily unavailable")
    }

    fn from_conversation(err: ConversationError, internal: &'static str) -> Self {
        match err {
            ConversationError::Validation(message) => Self::BadRequest(message),
            ConversationError::NotFound(_) => Self::NotFound("Conversation not found".to_string()),
            ConversationError::StorageUnavailable(detail) => {
                tracing::error!("Storage failure: {detail}");
                Self::Internal(internal)
            }
        }
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ConversationError> for ApiError {
    fn from(err: ConversationError) -> Self {
        Self::from_conversation(err, "Internal server error")
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        tracing::debug!("Rejected request body: {err}");
        Self::BadRequest("Invalid JSON body".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::BadRequest(message) | Self::NotFound(message) => message,
            Self::Internal(message) => message.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
