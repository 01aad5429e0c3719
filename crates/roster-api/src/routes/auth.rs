//! Login, refresh and identity routes

use axum::{
    Json, Router,
    extract::State,
    http::HeaderMap,
    routing::{get, post},
};
use roster_auth::{SecurityContext, extract_bearer_token};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

use super::types::{LoginRequest, MeResponse, TokenResponse};
use super::validation::{validate_password_length, validate_username};

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    validate_username(&request.username)?;
    validate_password_length(&request.password)?;

    match state.auth.login(&request.username, &request.password).await {
        Ok(issued) => {
            metrics::counter!("roster_logins_total", "outcome" => "success").increment(1);
            Ok(Json(TokenResponse {
                expires_in: issued.expires_in(),
                token: issued.token,
            }))
        }
        Err(e) => {
            debug!("Login failed for {}: {}", request.username, e);
            metrics::counter!("roster_logins_total", "outcome" => e.reason()).increment(1);
            Err(e.into())
        }
    }
}

/// POST /api/auth/refresh
///
/// The old token travels in the `Authorization` header. It may already be
/// expired, so this route is public and the token is checked here instead
/// of in the middleware.
async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, ApiError> {
    let result = match extract_bearer_token(&headers) {
        Ok(token) => state.auth.refresh(token).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(issued) => {
            metrics::counter!("roster_token_refresh_total", "outcome" => "success").increment(1);
            Ok(Json(TokenResponse {
                expires_in: issued.expires_in(),
                token: issued.token,
            }))
        }
        Err(e) => {
            debug!("Token refresh failed: {}", e);
            metrics::counter!("roster_token_refresh_total", "outcome" => e.reason()).increment(1);
            Err(e.into())
        }
    }
}

/// GET /api/auth/me
async fn me(ctx: SecurityContext) -> Json<MeResponse> {
    Json(MeResponse {
        username: ctx.username,
        roles: ctx.roles,
    })
}

/// Create auth routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/me", get(me))
}
