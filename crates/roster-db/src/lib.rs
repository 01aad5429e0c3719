//! Roster Database Layer
//!
//! This crate provides the persistence layer for Roster: users, their
//! role assignments and the employee records served by the API, stored
//! in SQLite via sqlx.

pub mod error;
pub mod models;
pub mod repository;
pub mod utils;

pub use error::DbError;
pub use models::*;
pub use repository::Database;
