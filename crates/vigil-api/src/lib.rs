//! vigil-api — the watchdog's admin surface.
//!
//! A small axum router, mounted only when an admin port is configured.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/healthz` | Liveness of the watchdog itself |
//! | GET | `/api/v1/status` | Current watchdog state snapshot |
//! | POST | `/api/v1/resume` | Record manual intervention; re-arm restarts |
//!
//! Handlers never touch the watchdog state directly: status reads the
//! latest snapshot from the scheduler's watch channel, and resume sends
//! a command that the control loop applies between ticks.

pub mod handlers;

use axum::routing::{get, post};
use axum::Router;
use tokio::sync::{mpsc, watch};

use vigil_scheduler::ControlCommand;
use vigil_state::WatchdogState;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    /// The monitored target address (for display).
    pub target: String,
    /// Unix timestamp (seconds) when the daemon started.
    pub started_at: u64,
    /// Latest state snapshot published by the scheduler.
    pub state_rx: watch::Receiver<WatchdogState>,
    /// Command channel into the control loop.
    pub control_tx: mpsc::Sender<ControlCommand>,
}

/// Build the admin router.
pub fn build_router(state: ApiState) -> Router {
    let api_routes = Router::new()
        .route("/status", get(handlers::status))
        .route("/resume", post(handlers::resume))
        .with_state(state.clone());

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/healthz", get(handlers::healthz))
}
