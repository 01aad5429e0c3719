//! Route policy table
//!
//! Maps request paths (and optionally methods) to the access level they
//! require. Rules are evaluated in declaration order and the first match
//! wins; unmatched requests fall back to the table's default policy.
//!
//! Pattern syntax:
//! - literal text must match exactly
//! - `*` or `{name}` matches exactly one non-empty path segment
//! - `**` matches any remaining text, including further segments;
//!   a trailing `/**` also matches the bare prefix (`/api/auth/**`
//!   matches `/api/auth`)

use std::fmt;
use std::str::FromStr;

use axum::http::Method;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::SecurityContext;
use crate::error::AuthError;

/// Maximum iterations allowed for pattern matching to prevent ReDoS
const MAX_MATCH_ITERATIONS: usize = 10000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Invalid route policy '{0}': expected public, authenticated or role:<ROLE_NAME>")]
    InvalidPolicy(String),

    #[error("Invalid HTTP method '{0}'")]
    InvalidMethod(String),

    #[error("Invalid route pattern '{0}': must start with '/'")]
    InvalidPattern(String),
}

/// Access level required by a route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RoutePolicy {
    /// No token required
    Public,
    /// Any valid token
    Authenticated,
    /// Valid token holding the named role
    Role(String),
}

impl RoutePolicy {
    pub fn is_public(&self) -> bool {
        matches!(self, RoutePolicy::Public)
    }

    /// Decide whether an authenticated identity may proceed
    pub fn authorize(&self, ctx: &SecurityContext) -> Result<(), AuthError> {
        match self {
            RoutePolicy::Public | RoutePolicy::Authenticated => Ok(()),
            RoutePolicy::Role(role) if ctx.has_role(role) => Ok(()),
            RoutePolicy::Role(role) => Err(AuthError::InsufficientRole(role.clone())),
        }
    }
}

impl FromStr for RoutePolicy {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "public" => Ok(RoutePolicy::Public),
            "authenticated" => Ok(RoutePolicy::Authenticated),
            other => match other.strip_prefix("role:") {
                Some(role) if !role.is_empty() => Ok(RoutePolicy::Role(role.to_string())),
                _ => Err(PolicyError::InvalidPolicy(s.to_string())),
            },
        }
    }
}

impl TryFrom<String> for RoutePolicy {
    type Error = PolicyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RoutePolicy> for String {
    fn from(policy: RoutePolicy) -> Self {
        policy.to_string()
    }
}

impl fmt::Display for RoutePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutePolicy::Public => write!(f, "public"),
            RoutePolicy::Authenticated => write!(f, "authenticated"),
            RoutePolicy::Role(role) => write!(f, "role:{}", role),
        }
    }
}

/// One configured rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRule {
    /// Path pattern
    pub pattern: String,
    /// HTTP method; any method when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    pub policy: RoutePolicy,
}

impl RouteRule {
    pub fn new(pattern: &str, policy: RoutePolicy) -> Self {
        Self {
            pattern: pattern.to_string(),
            method: None,
            policy,
        }
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = Some(method.to_string());
        self
    }
}

/// Compiled, read-only policy table
#[derive(Debug, Clone)]
pub struct RoutePolicyTable {
    rules: Vec<CompiledRule>,
    default_policy: RoutePolicy,
}

#[derive(Debug, Clone)]
struct CompiledRule {
    method: Option<Method>,
    pattern: String,
    parts: Vec<PatternPart>,
    policy: RoutePolicy,
}

#[derive(Debug, Clone)]
enum PatternPart {
    /// Literal text that must match exactly
    Literal(String),
    /// Single path segment wildcard (`*` or `{name}`)
    SingleWildcard,
    /// Multi-segment wildcard (**)
    MultiWildcard,
}

impl RoutePolicyTable {
    /// Compile a table from configured rules
    pub fn new(rules: Vec<RouteRule>, default_policy: RoutePolicy) -> Result<Self, PolicyError> {
        let rules = rules
            .into_iter()
            .map(|rule| {
                if !rule.pattern.starts_with('/') {
                    return Err(PolicyError::InvalidPattern(rule.pattern));
                }
                let method = rule
                    .method
                    .as_deref()
                    .map(|m| {
                        Method::from_bytes(m.trim().to_ascii_uppercase().as_bytes())
                            .map_err(|_| PolicyError::InvalidMethod(m.to_string()))
                    })
                    .transpose()?;
                Ok(CompiledRule {
                    method,
                    parts: Self::compile_pattern(&rule.pattern),
                    pattern: rule.pattern,
                    policy: rule.policy,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            rules,
            default_policy,
        })
    }

    /// Policy for a request
    pub fn resolve(&self, method: &Method, path: &str) -> &RoutePolicy {
        self.rules
            .iter()
            .find(|rule| {
                rule.method.as_ref().is_none_or(|m| m == method)
                    && Self::matches_pattern(&rule.pattern, &rule.parts, path)
            })
            .map(|rule| &rule.policy)
            .unwrap_or(&self.default_policy)
    }

    /// Compile a glob-like pattern into parts
    fn compile_pattern(pattern: &str) -> Vec<PatternPart> {
        let mut parts = Vec::new();
        let mut current = String::new();

        let chars: Vec<char> = pattern.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            let ch = chars[i];

            if ch == '*' || ch == '{' {
                if !current.is_empty() {
                    parts.push(PatternPart::Literal(current.clone()));
                    current.clear();
                }

                if ch == '{' {
                    // Skip the parameter name up to the closing brace
                    while i < chars.len() && chars[i] != '}' {
                        i += 1;
                    }
                    parts.push(PatternPart::SingleWildcard);
                    i += 1;
                } else if i + 1 < chars.len() && chars[i + 1] == '*' {
                    parts.push(PatternPart::MultiWildcard);
                    i += 2;
                } else {
                    parts.push(PatternPart::SingleWildcard);
                    i += 1;
                }
            } else {
                current.push(ch);
                i += 1;
            }
        }

        if !current.is_empty() {
            parts.push(PatternPart::Literal(current));
        }

        parts
    }

    fn matches_pattern(pattern: &str, parts: &[PatternPart], path: &str) -> bool {
        if let Some(prefix) = pattern.strip_suffix("/**")
            && path == prefix
        {
            return true;
        }
        let mut iterations = 0;
        Self::match_recursive(parts, path, 0, 0, &mut iterations)
    }

    fn match_recursive(
        parts: &[PatternPart],
        path: &str,
        part_idx: usize,
        path_pos: usize,
        iterations: &mut usize,
    ) -> bool {
        *iterations += 1;
        if *iterations > MAX_MATCH_ITERATIONS {
            tracing::warn!(
                "Pattern matching exceeded {} iterations, aborting",
                MAX_MATCH_ITERATIONS
            );
            return false;
        }

        if part_idx >= parts.len() {
            return path_pos >= path.len();
        }

        let path_remaining = &path[path_pos..];

        match &parts[part_idx] {
            PatternPart::Literal(lit) => {
                path_remaining.starts_with(lit.as_str())
                    && Self::match_recursive(parts, path, part_idx + 1, path_pos + lit.len(), iterations)
            }
            PatternPart::SingleWildcard => {
                let segment_len = path_remaining.find('/').unwrap_or(path_remaining.len());
                // A segment wildcard never matches an empty segment
                segment_len > 0
                    && Self::match_recursive(parts, path, part_idx + 1, path_pos + segment_len, iterations)
            }
            PatternPart::MultiWildcard => {
                if part_idx + 1 == parts.len() {
                    return true;
                }

                path_remaining
                    .char_indices()
                    .map(|(i, _)| i)
                    .chain(std::iter::once(path_remaining.len()))
                    .any(|i| Self::match_recursive(parts, path, part_idx + 1, path_pos + i, iterations))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::Claims;

    fn ctx(roles: &[&str]) -> SecurityContext {
        SecurityContext::from_claims(&Claims {
            sub: "tester".to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            iat: 0,
            exp: 0,
        })
    }

    fn table(rules: Vec<RouteRule>) -> RoutePolicyTable {
        RoutePolicyTable::new(rules, RoutePolicy::Authenticated).unwrap()
    }

    #[test]
    fn test_parse_policy() {
        assert_eq!("public".parse::<RoutePolicy>(), Ok(RoutePolicy::Public));
        assert_eq!("authenticated".parse::<RoutePolicy>(), Ok(RoutePolicy::Authenticated));
        assert_eq!(
            "role:ROLE_ADMIN".parse::<RoutePolicy>(),
            Ok(RoutePolicy::Role("ROLE_ADMIN".to_string()))
        );
        assert!("role:".parse::<RoutePolicy>().is_err());
        assert!("admin".parse::<RoutePolicy>().is_err());
        assert_eq!(RoutePolicy::Role("ROLE_X".into()).to_string(), "role:ROLE_X");
    }

    #[test]
    fn test_authorize() {
        let admin_only = RoutePolicy::Role("ROLE_ADMIN".to_string());

        assert_eq!(
            admin_only.authorize(&ctx(&["ROLE_USER"])),
            Err(AuthError::InsufficientRole("ROLE_ADMIN".to_string()))
        );
        assert!(admin_only.authorize(&ctx(&["ROLE_USER", "ROLE_ADMIN"])).is_ok());
        assert!(admin_only.authorize(&ctx(&["role_admin"])).is_err());
        assert!(RoutePolicy::Authenticated.authorize(&ctx(&[])).is_ok());
    }

    #[test]
    fn test_exact_match() {
        let table = table(vec![RouteRule::new("/health", RoutePolicy::Public)]);

        assert_eq!(table.resolve(&Method::GET, "/health"), &RoutePolicy::Public);
        assert_eq!(
            table.resolve(&Method::GET, "/healthz"),
            &RoutePolicy::Authenticated
        );
    }

    #[test]
    fn test_parameter_segment() {
        let table = table(vec![
            RouteRule::new("/api/employees/{id}", RoutePolicy::Role("ROLE_ADMIN".into()))
                .with_method("DELETE"),
        ]);

        let admin = RoutePolicy::Role("ROLE_ADMIN".into());
        assert_eq!(table.resolve(&Method::DELETE, "/api/employees/42"), &admin);
        assert_eq!(
            table.resolve(&Method::GET, "/api/employees/42"),
            &RoutePolicy::Authenticated
        );
        assert_eq!(
            table.resolve(&Method::DELETE, "/api/employees/"),
            &RoutePolicy::Authenticated
        );
        assert_eq!(
            table.resolve(&Method::DELETE, "/api/employees/42/notes"),
            &RoutePolicy::Authenticated
        );
    }

    #[test]
    fn test_multi_wildcard() {
        let table = table(vec![RouteRule::new("/api/auth/**", RoutePolicy::Public)]);

        assert!(table.resolve(&Method::POST, "/api/auth/login").is_public());
        assert!(table.resolve(&Method::POST, "/api/auth/a/b").is_public());
        assert!(table.resolve(&Method::POST, "/api/auth").is_public());
        assert!(!table.resolve(&Method::POST, "/api/authx").is_public());
        assert!(!table.resolve(&Method::GET, "/api/employees").is_public());
    }

    #[test]
    fn test_single_wildcard_does_not_cross_segments() {
        let table = table(vec![RouteRule::new("/docs/*", RoutePolicy::Public)]);

        assert!(table.resolve(&Method::GET, "/docs/index").is_public());
        assert!(!table.resolve(&Method::GET, "/docs/a/b").is_public());
    }

    #[test]
    fn test_first_match_wins() {
        let table = table(vec![
            RouteRule::new("/api/auth/me", RoutePolicy::Authenticated),
            RouteRule::new("/api/auth/**", RoutePolicy::Public),
        ]);

        assert_eq!(
            table.resolve(&Method::GET, "/api/auth/me"),
            &RoutePolicy::Authenticated
        );
        assert!(table.resolve(&Method::POST, "/api/auth/login").is_public());
    }

    #[test]
    fn test_method_is_case_insensitive_in_config() {
        let table = table(vec![
            RouteRule::new("/api/users", RoutePolicy::Public).with_method("post"),
        ]);

        assert!(table.resolve(&Method::POST, "/api/users").is_public());
        assert!(!table.resolve(&Method::GET, "/api/users").is_public());
    }

    #[test]
    fn test_invalid_rules_rejected() {
        let bad_pattern = RoutePolicyTable::new(
            vec![RouteRule::new("api/users", RoutePolicy::Public)],
            RoutePolicy::Authenticated,
        );
        assert!(matches!(bad_pattern, Err(PolicyError::InvalidPattern(_))));

        let bad_method = RoutePolicyTable::new(
            vec![RouteRule::new("/api", RoutePolicy::Public).with_method("GE T")],
            RoutePolicy::Authenticated,
        );
        assert!(matches!(bad_method, Err(PolicyError::InvalidMethod(_))));
    }

    #[test]
    fn test_default_policy_applies_to_unmatched() {
        let table = RoutePolicyTable::new(vec![], RoutePolicy::Public).unwrap();
        assert!(table.resolve(&Method::GET, "/anything").is_public());
    }
}
