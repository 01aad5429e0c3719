//! Request-scoped security context

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::Serialize;
use uuid::Uuid;

use crate::error::AuthError;
use crate::jwt::Claims;

/// Identity bound to a single request after token validation.
///
/// Lives in the request extensions and is dropped with the request.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityContext {
    pub username: String,
    pub roles: Vec<String>,
    pub request_id: Uuid,
}

impl SecurityContext {
    /// Create from validated JWT claims
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            username: claims.sub.clone(),
            roles: claims.roles.clone(),
            request_id: Uuid::new_v4(),
        }
    }

    /// Exact, case-sensitive role check
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl<S> FromRequestParts<S> for SecurityContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SecurityContext>()
            .cloned()
            .ok_or(AuthError::MissingToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_claims() {
        let claims = Claims {
            sub: "admin".to_string(),
            roles: vec!["ROLE_ADMIN".to_string()],
            iat: 0,
            exp: 10,
        };
        let ctx = SecurityContext::from_claims(&claims);

        assert_eq!(ctx.username, "admin");
        assert!(ctx.has_role("ROLE_ADMIN"));
        assert!(!ctx.has_role("ROLE_admin"));
        assert!(!ctx.has_role("ADMIN"));
    }

    #[test]
    fn test_each_context_gets_its_own_request_id() {
        let claims = Claims {
            sub: "user".to_string(),
            roles: vec![],
            iat: 0,
            exp: 10,
        };

        let first = SecurityContext::from_claims(&claims);
        let second = SecurityContext::from_claims(&claims);
        assert_ne!(first.request_id, second.request_id);
    }
}
