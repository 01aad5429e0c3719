//! User administration routes (admin only, enforced by the route policy table)

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use roster_auth::hash_password;
use roster_db::NewUser;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::AppState;

use super::types::{CreateUserRequest, UserResponse};
use super::validation::{validate_new_password, validate_username};

const DEFAULT_ROLE: &str = "ROLE_USER";

/// GET /api/users
async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.db.list_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// POST /api/users
async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    validate_username(&request.username)?;
    validate_new_password(&request.password)?;

    let roles = if request.roles.is_empty() {
        vec![DEFAULT_ROLE.to_string()]
    } else {
        request.roles
    };

    debug!("Creating user: {}", request.username);

    let password_hash = hash_password(&request.password)?;
    let user = state
        .db
        .insert_user(NewUser {
            username: request.username,
            password_hash,
            roles,
        })
        .await?;

    info!("Created user: {} ({})", user.username, user.roles.join(","));
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// GET /api/users/{id}
async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .db
        .get_user_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User: {}", id)))?;

    Ok(Json(UserResponse::from(user)))
}

/// DELETE /api/users/{id}
async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    debug!("Deleting user: {}", id);

    if !state.db.delete_user(id).await? {
        return Err(ApiError::NotFound(format!("User: {}", id)));
    }

    info!("Deleted user: {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Create user administration routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/users/{id}", get(get_user).delete(delete_user))
}
