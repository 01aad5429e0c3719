//! Authentication error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Malformed token")]
    Malformed,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token expired")]
    Expired,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Insufficient role: {0} required")]
    InsufficientRole(String),

    #[error("Invalid token")]
    InvalidToken,

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Token encoding error: {0}")]
    TokenEncoding(String),

    #[error("Credential store error: {0}")]
    Store(String),
}

impl AuthError {
    /// Short label used for logs and metrics
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::Malformed => "malformed",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::Expired => "expired",
            AuthError::UserNotFound => "user_not_found",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::InsufficientRole(_) => "insufficient_role",
            AuthError::InvalidToken => "invalid_token",
            AuthError::PasswordHash(_) => "password_hash",
            AuthError::TokenEncoding(_) => "token_encoding",
            AuthError::Store(_) => "store",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InsufficientRole(_) => StatusCode::FORBIDDEN,
            AuthError::PasswordHash(_) | AuthError::TokenEncoding(_) | AuthError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// Message shown to clients
    ///
    /// Unknown users and wrong passwords share one message so that the
    /// response does not reveal which usernames exist.
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "Missing bearer token",
            AuthError::Malformed | AuthError::InvalidSignature | AuthError::InvalidToken => {
                "Invalid token"
            }
            AuthError::Expired => "Token expired",
            AuthError::UserNotFound | AuthError::InvalidCredentials => "Invalid credentials",
            AuthError::InsufficientRole(_) => "Insufficient permissions",
            AuthError::PasswordHash(_) | AuthError::TokenEncoding(_) | AuthError::Store(_) => {
                "Internal error"
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = axum::Json(json!({
            "error": self.public_message()
        }));

        (self.status(), body).into_response()
    }
}
