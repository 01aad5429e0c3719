//! JWT token management

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AuthError;

/// Default token lifetime (10 hours)
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 10 * 3600;

/// Default window after expiry during which a token may still be refreshed
pub const DEFAULT_REFRESH_GRACE_SECS: i64 = 3600;

/// Upper bound accepted for the token lifetime (30 days)
pub const MAX_TOKEN_TTL_SECS: i64 = 30 * 24 * 3600;

/// Upper bound accepted for the refresh grace window (30 days)
pub const MAX_REFRESH_GRACE_SECS: i64 = 30 * 24 * 3600;

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// Role names held at issuance
    pub roles: Vec<String>,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// A freshly signed token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl IssuedToken {
    /// Lifetime of the token in seconds
    pub fn expires_in(&self) -> i64 {
        (self.expires_at - self.issued_at).num_seconds()
    }
}

/// Issues and validates HS256 tokens with the instance signing key.
///
/// Tokens are self-contained: validation never consults the credential
/// store, so role changes only reach a client once its token is refreshed.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_ttl: Duration,
    refresh_grace: Duration,
}

impl TokenService {
    /// Create a new token service
    pub fn new(secret: &str, token_ttl_secs: i64) -> Self {
        // Expiry is checked by hand below so that it is strict (`exp <= now`
        // fails) and so that refresh can look past it.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            token_ttl: Duration::try_seconds(token_ttl_secs).unwrap_or(Duration::MAX),
            refresh_grace: Duration::seconds(DEFAULT_REFRESH_GRACE_SECS),
        }
    }

    /// Set how long after expiry a token is still accepted for refresh
    pub fn with_refresh_grace(mut self, refresh_grace_secs: i64) -> Self {
        self.refresh_grace = Duration::try_seconds(refresh_grace_secs.max(0)).unwrap_or(Duration::MAX);
        self
    }

    /// Issue a token for `subject` carrying `roles`
    pub fn issue(&self, subject: &str, roles: &[String]) -> Result<IssuedToken, AuthError> {
        self.issue_at(subject, roles, Utc::now())
    }

    pub(crate) fn issue_at(
        &self,
        subject: &str,
        roles: &[String],
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let expires_at = self.expiry_from(now)?;
        self.sign(subject, roles, now, expires_at)
    }

    /// `now + ttl`, or an error when the result leaves chrono's range
    fn expiry_from(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, AuthError> {
        now.checked_add_signed(self.token_ttl)
            .ok_or_else(|| AuthError::TokenEncoding("token lifetime out of range".to_string()))
    }

    fn sign(
        &self,
        subject: &str,
        roles: &[String],
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let claims = Claims {
            sub: subject.to_string(),
            roles: roles.to_vec(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        debug!("Issuing token for user: {}", subject);

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenEncoding(e.to_string()))?;

        Ok(IssuedToken {
            token,
            issued_at,
            expires_at,
        })
    }

    /// Validate a token and return its claims
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.decode_verified(token)?;

        if claims.exp <= Utc::now().timestamp() {
            return Err(AuthError::Expired);
        }

        Ok(claims)
    }

    /// Recover the claims of a token presented for refresh
    ///
    /// The signature must be valid. Expiry may have passed by at most the
    /// refresh grace window.
    pub fn validate_for_refresh(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.decode_verified(token).map_err(|e| {
            debug!("Refresh rejected: {}", e);
            AuthError::InvalidToken
        })?;

        let deadline = claims.exp.saturating_add(self.refresh_grace.num_seconds());
        if deadline <= Utc::now().timestamp() {
            debug!("Refresh rejected: grace window for {} has passed", claims.sub);
            return Err(AuthError::InvalidToken);
        }

        Ok(claims)
    }

    /// Issue a replacement for `previous` carrying the given roles
    ///
    /// The new expiry is always strictly later than the previous one, even
    /// when both are issued within the same second.
    pub fn reissue(&self, previous: &Claims, roles: &[String]) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let floor = Utc
            .timestamp_opt(previous.exp.saturating_add(1), 0)
            .single()
            .unwrap_or(now);
        let expires_at = self.expiry_from(now)?.max(floor);

        self.sign(&previous.sub, roles, now, expires_at)
    }

    /// Check the signature and structure, ignoring expiry
    fn decode_verified(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::Malformed,
            })
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("token_ttl_secs", &self.token_ttl.num_seconds())
            .field("refresh_grace_secs", &self.refresh_grace.num_seconds())
            .finish()
    }
}
