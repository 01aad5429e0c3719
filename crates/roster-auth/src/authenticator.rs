//! Login and token refresh

use std::sync::Arc;
use tracing::{debug, info};

use crate::error::AuthError;
use crate::jwt::{IssuedToken, TokenService};
use crate::password::{DUMMY_HASH, verify_password};
use crate::store::CredentialStore;

/// Entry point for credential exchange: password → token, token → token
#[derive(Clone)]
pub struct Authenticator {
    store: Arc<dyn CredentialStore>,
    tokens: Arc<TokenService>,
}

impl Authenticator {
    pub fn new(store: Arc<dyn CredentialStore>, tokens: Arc<TokenService>) -> Self {
        Self { store, tokens }
    }

    pub fn tokens(&self) -> &Arc<TokenService> {
        &self.tokens
    }

    /// Verify a username/password pair and issue a token with the user's
    /// current roles
    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedToken, AuthError> {
        debug!("Login attempt for user: {}", username);

        let Some(user) = self.store.find_by_username(username).await? else {
            // Burn the same hashing cost as a real check
            verify_password(password, DUMMY_HASH)?;
            return Err(AuthError::UserNotFound);
        };

        if !verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        let issued = self.tokens.issue(&user.username, &user.roles)?;
        info!("User {} logged in", user.username);
        Ok(issued)
    }

    /// Exchange a token (live, or expired within the grace window) for a new
    /// one carrying the subject's roles as they are now
    pub async fn refresh(&self, token: &str) -> Result<IssuedToken, AuthError> {
        let previous = self.tokens.validate_for_refresh(token)?;

        let user = self
            .store
            .find_by_username(&previous.sub)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let issued = self.tokens.reissue(&previous, &user.roles)?;
        info!("Refreshed token for user {}", user.username);
        Ok(issued)
    }
}
