//! Roster - employee directory service with stateless JWT authentication

use anyhow::{Context, Result};
use axum::http::{HeaderValue, Method, header};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;

use config::{BootstrapUser, Config, LoggingConfig};
use roster_api::{AppState, create_router};
use roster_auth::{AuthGate, Authenticator, TokenService};
use roster_db::{Database, NewUser};

/// Roster - employee directory with JWT authentication
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Bind address
    #[arg(long, env = "ROSTER_BIND")]
    bind: Option<String>,

    /// Port
    #[arg(short, long, env = "ROSTER_PORT")]
    port: Option<u16>,

    /// HMAC secret used to sign tokens (overrides auth.jwt_secret)
    #[arg(long, env = "ROSTER_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(&args.config)?;
    if let Some(secret) = args.jwt_secret {
        config.auth.jwt_secret = secret;
    }

    init_logging(&config.logging);

    info!("Starting Roster v{}", env!("CARGO_PKG_VERSION"));

    config.validate()?;
    let policies = Arc::new(config.auth.policy_table()?);

    // Metrics recorder must be installed before the first counter is touched
    let metrics_handle = if config.metrics.enabled {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        Some(Arc::new(handle))
    } else {
        None
    };
    metrics::counter!("roster_startups_total").increment(1);

    // Initialize database
    if let Some(parent) = Path::new(&config.database.path).parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let db_url = format!("sqlite:{}?mode=rwc", config.database.path);
    let db = Database::new(&db_url).await?;

    if !db.has_users().await? {
        seed_users(&db, &config.bootstrap.users).await?;
    }

    let tokens = Arc::new(
        TokenService::new(&config.auth.jwt_secret, config.auth.token_ttl_secs)
            .with_refresh_grace(config.auth.refresh_grace_secs),
    );
    let auth = Authenticator::new(Arc::new(db.clone()), tokens.clone());
    let gate = AuthGate::new(tokens, policies);

    let state = AppState::new(db, auth, gate);

    let app = create_router(state, metrics_handle)
        .layer(cors_layer(&config.server.cors_origins))
        .layer(TraceLayer::new_for_http());

    // Determine bind address
    let bind_addr = args.bind.unwrap_or(config.server.bind_address);
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", bind_addr, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind_addr, port))?;

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Initialize logging
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

/// Create the configured users in an empty database
async fn seed_users(db: &Database, users: &[BootstrapUser]) -> Result<()> {
    if users.is_empty() {
        warn!("Database has no users and no bootstrap users are configured");
        return Ok(());
    }

    for user in users {
        let password_hash = roster_auth::hash_password(&user.password)?;
        db.insert_user(NewUser {
            username: user.username.clone(),
            password_hash,
            roles: user.roles.clone(),
        })
        .await
        .with_context(|| format!("Failed to create bootstrap user {}", user.username))?;
        info!(
            "Created bootstrap user {} ({})",
            user.username,
            user.roles.join(",")
        );
    }
    Ok(())
}

/// CORS for the configured browser origins
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        warn!("No CORS origins configured, allowing any origin");
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin: {}", o);
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
