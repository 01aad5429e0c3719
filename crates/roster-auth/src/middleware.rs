//! Authentication middleware for Axum
//!
//! Every request is matched against the route policy table. Public routes
//! pass straight through; all others must carry a valid bearer token, whose
//! identity is bound into the request extensions as a [`SecurityContext`]
//! before the route's role requirement is checked.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::context::SecurityContext;
use crate::error::AuthError;
use crate::jwt::TokenService;
use crate::policy::{RoutePolicy, RoutePolicyTable};

/// State shared by the authentication middleware
#[derive(Clone)]
pub struct AuthGate {
    pub tokens: Arc<TokenService>,
    pub policies: Arc<RoutePolicyTable>,
}

impl AuthGate {
    pub fn new(tokens: Arc<TokenService>, policies: Arc<RoutePolicyTable>) -> Self {
        Self { tokens, policies }
    }

    /// Validate the bearer token and check it against `policy`
    pub fn check(
        &self,
        headers: &HeaderMap,
        policy: &RoutePolicy,
    ) -> Result<SecurityContext, AuthError> {
        let token = extract_bearer_token(headers)?;
        let claims = self.tokens.validate(token)?;
        let ctx = SecurityContext::from_claims(&claims);
        policy.authorize(&ctx)?;
        Ok(ctx)
    }
}

/// Extract bearer token from the authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingToken)
}

/// Authentication and authorization middleware
pub async fn auth_middleware(
    State(gate): State<AuthGate>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let policy = gate
        .policies
        .resolve(request.method(), request.uri().path())
        .clone();

    if policy.is_public() {
        return Ok(next.run(request).await);
    }

    match gate.check(request.headers(), &policy) {
        Ok(ctx) => {
            debug!(
                request_id = %ctx.request_id,
                "Authenticated user: {} ({}) for {} {}",
                ctx.username,
                ctx.roles.join(","),
                request.method(),
                request.uri().path()
            );
            request.extensions_mut().insert(ctx);
            Ok(next.run(request).await)
        }
        Err(e) => {
            debug!(
                "Rejected {} {} ({}): {}",
                request.method(),
                request.uri().path(),
                policy,
                e
            );
            metrics::counter!("roster_auth_rejections_total", "reason" => e.reason()).increment(1);
            Err(e)
        }
    }
}
