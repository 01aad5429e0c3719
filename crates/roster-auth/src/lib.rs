//! Roster Authentication and Authorization
//!
//! This crate provides stateless JWT authentication, Argon2 credential
//! verification and the route policy table that decides, per request,
//! whether an identity may reach a handler.

pub mod authenticator;
pub mod context;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod policy;
pub mod store;

pub use authenticator::Authenticator;
pub use context::SecurityContext;
pub use error::AuthError;
pub use jwt::{Claims, IssuedToken, TokenService};
pub use middleware::{AuthGate, auth_middleware, extract_bearer_token};
pub use password::{hash_password, verify_password};
pub use policy::{PolicyError, RoutePolicy, RoutePolicyTable, RouteRule};
pub use store::CredentialStore;
