//! vigild — the vigil watchdog daemon.
//!
//! Single binary that assembles the supervision pipeline:
//! - Health probe (HTTP or TCP)
//! - State tracker (threshold counting, restart/escalate policy)
//! - Action executor (restart hooks, alert sink)
//! - Control loop (fixed-interval, strictly sequential)
//! - Optional admin API (status, manual resume)
//!
//! # Usage
//!
//! ```text
//! VIGIL_TARGET=app:8080 VIGIL_RESTART_CMD='docker restart app' vigild
//! ```
//!
//! Configuration is exclusively environment variables; see `config.rs`.
//! Exit code is 0 on clean shutdown, non-zero on a startup failure.

mod config;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::{mpsc, watch};
use tracing::{error, info};

use vigil_action::ActionExecutor;
use vigil_probe::HealthProbe;
use vigil_scheduler::Scheduler;
use vigil_state::{StateTracker, WatchdogState};

use crate::config::{Config, ProbeMode};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,vigild=debug,vigil=debug".parse().unwrap()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "configuration error");
            return Err(e.into());
        }
    };

    run(config).await
}

async fn run(config: Config) -> anyhow::Result<()> {
    info!(target = %config.target, "vigil watchdog starting");

    // ── Assemble subsystems ────────────────────────────────────

    let probe = match config.probe_mode {
        ProbeMode::Http => {
            HealthProbe::http(&config.target, &config.probe_path, config.probe_timeout)
        }
        ProbeMode::Tcp => HealthProbe::tcp(&config.target, config.probe_timeout),
    };
    info!(mode = ?config.probe_mode, timeout = ?config.probe_timeout, "probe configured");

    let tracker = StateTracker::new(config.failure_threshold, config.escalation_cooldown);
    info!(
        threshold = config.failure_threshold,
        cooldown = ?config.escalation_cooldown,
        "state tracker initialized"
    );

    let executor = Arc::new(
        ActionExecutor::new(&config.target)
            .with_restart_cmd(config.restart_cmd.clone())
            .with_restart_url(config.restart_url.clone())
            .with_alert_url(config.alert_url.clone())
            .with_restart_timeout(config.restart_timeout)
            .with_alert_timeout(config.alert_timeout),
    );
    if config.restart_cmd.is_none() && config.restart_url.is_none() {
        info!("no restart hook configured; running as an alert-only monitor");
    }

    // ── Channels ───────────────────────────────────────────────

    let (state_tx, state_rx) = watch::channel(WatchdogState::new());
    let (control_tx, control_rx) = mpsc::channel(8);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Admin API ──────────────────────────────────────────────

    let api_handle = match config.admin_port {
        Some(port) => {
            let api_state = vigil_api::ApiState {
                target: config.target.clone(),
                started_at: epoch_secs(),
                state_rx: state_rx.clone(),
                control_tx: control_tx.clone(),
            };
            let router = vigil_api::build_router(api_state);
            let addr = SocketAddr::from(([0, 0, 0, 0], port));
            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!(%addr, "admin API listening");

            let mut api_shutdown = shutdown_rx.clone();
            Some(tokio::spawn(async move {
                let server = axum::serve(listener, router).with_graceful_shutdown(async move {
                    let _ = api_shutdown.changed().await;
                });
                if let Err(e) = server.await {
                    error!(error = %e, "admin API server error");
                }
            }))
        }
        None => None,
    };
    // The scheduler detects a closed control channel; keep no extra
    // senders alive beyond the API.
    drop(control_tx);

    // ── Shutdown signal ────────────────────────────────────────

    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    // ── Run the control loop ───────────────────────────────────

    let scheduler = Scheduler::new(
        probe,
        tracker,
        executor,
        config.interval,
        config.shutdown_grace,
        state_tx,
    );
    scheduler.run(shutdown_rx, control_rx).await;

    if let Some(handle) = api_handle {
        let _ = handle.await;
    }

    info!("vigil watchdog stopped");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM — the container runtime sends SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
