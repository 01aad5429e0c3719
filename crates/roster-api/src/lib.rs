//! Roster REST API
//!
//! Axum routes for login/refresh, the employee directory and user
//! administration. Access to every route is decided by the authentication
//! middleware from `roster-auth` before any handler runs.

pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use routes::validation::{validate_password_length, validate_username};
pub use state::{AppState, MetricsHandle};
