//! Employee directory routes
//!
//! Who may call what is decided by the route policy table; handlers here
//! only deal with the data.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use roster_auth::SecurityContext;
use roster_db::{Employee, NewEmployee};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

use super::types::CreateEmployeeRequest;

/// GET /api/employees
async fn list_employees(State(state): State<AppState>) -> Result<Json<Vec<Employee>>, ApiError> {
    Ok(Json(state.db.list_employees().await?))
}

/// GET /api/employees/{id}
async fn get_employee(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Employee>, ApiError> {
    let employee = state
        .db
        .get_employee(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Employee: {}", id)))?;

    Ok(Json(employee))
}

/// POST /api/employees
async fn create_employee(
    ctx: SecurityContext,
    State(state): State<AppState>,
    Json(request): Json<CreateEmployeeRequest>,
) -> Result<(StatusCode, Json<Employee>), ApiError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest(
            "Employee name cannot be empty".to_string(),
        ));
    }

    let employee = state
        .db
        .insert_employee(NewEmployee {
            name: name.to_string(),
            role: request.role.trim().to_string(),
        })
        .await?;

    info!(
        request_id = %ctx.request_id,
        "User {} created employee {}", ctx.username, employee.id
    );
    Ok((StatusCode::CREATED, Json(employee)))
}

/// DELETE /api/employees/{id}
async fn delete_employee(
    ctx: SecurityContext,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if !state.db.delete_employee(id).await? {
        return Err(ApiError::NotFound(format!("Employee: {}", id)));
    }

    info!(
        request_id = %ctx.request_id,
        "User {} deleted employee {}", ctx.username, id
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Create employee routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/employees", get(list_employees).post(create_employee))
        .route(
            "/api/employees/{id}",
            get(get_employee).delete(delete_employee),
        )
}
