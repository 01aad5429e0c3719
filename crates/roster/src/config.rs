//! Configuration loading

use anyhow::{Context, Result, bail};
use roster_api::{validate_password_length, validate_username};
use roster_auth::jwt::{MAX_REFRESH_GRACE_SECS, MAX_TOKEN_TTL_SECS};
use roster_auth::{RoutePolicy, RoutePolicyTable, RouteRule};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Placeholder shipped in the default config; must be replaced in production
pub const PLACEHOLDER_JWT_SECRET: &str = "change-me-in-production";

/// Below this many bytes an HS256 key is considered weak
const MIN_SECRET_BYTES: usize = 32;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Browser origins allowed by CORS; empty means any
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: i64,
    /// How long after expiry a token may still be refreshed; 0 disables
    #[serde(default = "default_refresh_grace_secs")]
    pub refresh_grace_secs: i64,
    /// Applied to requests no rule matches
    #[serde(default = "default_policy")]
    pub default_policy: RoutePolicy,
    /// Ordered route rules; the first match wins
    #[serde(default = "default_routes")]
    pub routes: Vec<RouteRule>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            token_ttl_secs: default_token_ttl_secs(),
            refresh_grace_secs: default_refresh_grace_secs(),
            default_policy: default_policy(),
            routes: default_routes(),
        }
    }
}

impl AuthConfig {
    /// Reject unusable secrets and warn about weak ones
    pub fn validate(&self) -> Result<()> {
        if self.jwt_secret.is_empty() {
            bail!("auth.jwt_secret must not be empty (set it in the config or ROSTER_JWT_SECRET)");
        }
        if self.jwt_secret == PLACEHOLDER_JWT_SECRET {
            warn!("auth.jwt_secret is the shipped placeholder; set ROSTER_JWT_SECRET in production");
        } else if self.jwt_secret.len() < MIN_SECRET_BYTES {
            warn!(
                "auth.jwt_secret is shorter than {} bytes; consider a longer key",
                MIN_SECRET_BYTES
            );
        }
        if !(1..=MAX_TOKEN_TTL_SECS).contains(&self.token_ttl_secs) {
            bail!(
                "auth.token_ttl_secs must be between 1 and {}",
                MAX_TOKEN_TTL_SECS
            );
        }
        if !(0..=MAX_REFRESH_GRACE_SECS).contains(&self.refresh_grace_secs) {
            bail!(
                "auth.refresh_grace_secs must be between 0 and {}",
                MAX_REFRESH_GRACE_SECS
            );
        }
        Ok(())
    }

    /// Compile the configured rules into a policy table
    pub fn policy_table(&self) -> Result<RoutePolicyTable> {
        RoutePolicyTable::new(self.routes.clone(), self.default_policy.clone())
            .context("Invalid [[auth.routes]] configuration")
    }
}

/// Users created on first start, when the database holds none
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default = "default_bootstrap_users")]
    pub users: Vec<BootstrapUser>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            users: default_bootstrap_users(),
        }
    }
}

impl BootstrapConfig {
    /// Bootstrap users must be able to log in with the same rules the
    /// login route applies
    pub fn validate(&self) -> Result<()> {
        for user in &self.users {
            validate_username(&user.username)
                .with_context(|| format!("Invalid bootstrap user '{}'", user.username))?;
            if user.password.is_empty() {
                bail!("Bootstrap user '{}' has an empty password", user.username);
            }
            validate_password_length(&user.password)
                .with_context(|| format!("Invalid bootstrap user '{}'", user.username))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapUser {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
        }
    }
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

fn default_db_path() -> String {
    "./data/roster.db".to_string()
}

fn default_jwt_secret() -> String {
    PLACEHOLDER_JWT_SECRET.to_string()
}

fn default_token_ttl_secs() -> i64 {
    roster_auth::jwt::DEFAULT_TOKEN_TTL_SECS
}

fn default_refresh_grace_secs() -> i64 {
    roster_auth::jwt::DEFAULT_REFRESH_GRACE_SECS
}

fn default_policy() -> RoutePolicy {
    RoutePolicy::Authenticated
}

fn default_routes() -> Vec<RouteRule> {
    let admin = || RoutePolicy::Role("ROLE_ADMIN".to_string());
    vec![
        RouteRule::new("/health", RoutePolicy::Public),
        RouteRule::new("/metrics", RoutePolicy::Public),
        RouteRule::new("/api/auth/me", RoutePolicy::Authenticated),
        RouteRule::new("/api/auth/**", RoutePolicy::Public),
        RouteRule::new("/api/employees/{id}", admin()).with_method("DELETE"),
        RouteRule::new("/api/users/**", admin()),
        RouteRule::new("/api/**", RoutePolicy::Authenticated),
    ]
}

fn default_bootstrap_users() -> Vec<BootstrapUser> {
    vec![
        BootstrapUser {
            username: "admin".to_string(),
            password: "admin123".to_string(),
            roles: vec!["ROLE_ADMIN".to_string(), "ROLE_USER".to_string()],
        },
        BootstrapUser {
            username: "user".to_string(),
            password: "user123".to_string(),
            roles: vec!["ROLE_USER".to_string()],
        },
    ]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &str) -> Result<Self> {
        let config_path = Path::new(path);

        // Check if config file exists
        if !config_path.exists() {
            info!("Config file not found at {}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        info!("Loaded configuration from {}", path);
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Checks that need no I/O; run once before anything is started
    pub fn validate(&self) -> Result<()> {
        self.auth.validate()?;
        self.bootstrap.validate()
    }
}
