//! Credential lookup

use async_trait::async_trait;
use roster_db::{Database, User};

use crate::error::AuthError;

/// Read-only source of user records for login and refresh
///
/// Implementations must not keep per-request identity in shared state;
/// every call returns the user and its roles directly.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find a user by exact username
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError>;
}

#[async_trait]
impl CredentialStore for Database {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError> {
        self.get_user_by_username(username)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))
    }
}
