//! Account service error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0} already taken")]
    Conflict(&'static str),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Unknown token")]
    TokenNotFound,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token already used")]
    TokenAlreadyUsed,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AuthError::Validation(msg.into())
    }

    pub fn internal(msg: impl ToString) -> Self {
        AuthError::Internal(msg.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AuthError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AuthError::Conflict("username") => (StatusCode::CONFLICT, "Username already taken"),
            AuthError::Conflict(_) => (StatusCode::CONFLICT, "Email already taken"),
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid credentials"),
            AuthError::NotAuthenticated => (StatusCode::UNAUTHORIZED, "Not authenticated"),
            AuthError::TokenNotFound => (StatusCode::BAD_REQUEST, "Unknown or malformed token"),
            AuthError::TokenExpired => (StatusCode::BAD_REQUEST, "Token expired"),
            AuthError::TokenAlreadyUsed => (StatusCode::BAD_REQUEST, "Token already used"),
            AuthError::Internal(msg) => {
                // Full detail stays server-side; the client gets a generic message.
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "success": false, "reason": message });
        (status, axum::Json(body)).into_response()
    }
}
