//! Application state

use metrics_exporter_prometheus::PrometheusHandle;
use roster_auth::{AuthGate, Authenticator};
use roster_db::Database;

/// Handle used to render the Prometheus exposition
pub type MetricsHandle = PrometheusHandle;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub auth: Authenticator,
    pub gate: AuthGate,
}

impl AppState {
    pub fn new(db: Database, auth: Authenticator, gate: AuthGate) -> Self {
        Self { db, auth, gate }
    }
}
