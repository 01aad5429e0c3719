//! API error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Auth error: {0}")]
    Auth(#[from] roster_auth::AuthError),

    #[error("Database error: {0}")]
    Database(#[from] roster_db::DbError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Auth(e) => {
                if e.status().is_server_error() {
                    error!("Auth backend failure: {}", e);
                }
                return e.into_response();
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Database(e) => match e {
                roster_db::DbError::Duplicate { .. } => (StatusCode::CONFLICT, e.to_string()),
                roster_db::DbError::InvalidRole(_) => (StatusCode::BAD_REQUEST, e.to_string()),
                roster_db::DbError::Sqlx(_) => {
                    error!("Database error: {}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal error".to_string(),
                    )
                }
            },
        };

        let body = axum::Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_auth::AuthError;

    async fn body_of(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 4096)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_auth_errors_keep_their_status() {
        let response = ApiError::from(AuthError::InsufficientRole("ROLE_ADMIN".into())).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = ApiError::from(AuthError::Expired).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_of(response).await["error"], "Token expired");
    }

    #[tokio::test]
    async fn test_internal_detail_is_hidden() {
        let response = ApiError::from(AuthError::Store("pool timed out".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_of(response).await["error"], "Internal error");
    }

    #[tokio::test]
    async fn test_duplicate_is_conflict() {
        let response = ApiError::from(roster_db::DbError::Duplicate {
            entity: "User",
            key: "admin".into(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_of(response).await["error"], "User 'admin' already exists");
    }
}
