//! vigil-probe — health probes against the monitored target.
//!
//! One probe runs per scheduler tick. A probe is a single
//! bounded-duration operation: the configured deadline is enforced with
//! `tokio::time::timeout` and every outcome maps to a
//! [`HealthStatus`] — probes never return errors and never panic, so a
//! bad tick can not take the control loop down.
//!
//! # Classification
//!
//! | Observation | Status |
//! |---|---|
//! | HTTP 2xx / TCP connect success | `Healthy` |
//! | HTTP 429 or 503 (target busy) | `Unknown` |
//! | other non-2xx, connect error, timeout | `Unhealthy` |
//!
//! Probes are idempotent and side-effect free on the target; the
//! protocol itself is opaque to the rest of the daemon.

pub mod http;
pub mod tcp;

use std::time::Duration;

use vigil_state::HealthStatus;

/// Probe protocol for the monitored target.
#[derive(Debug, Clone)]
pub enum ProbeKind {
    /// HTTP GET against `http://{target}{path}`.
    Http { path: String },
    /// Plain TCP connect to `target`.
    Tcp,
}

/// A configured health probe. One `check()` per tick.
#[derive(Debug, Clone)]
pub struct HealthProbe {
    target: String,
    kind: ProbeKind,
    deadline: Duration,
}

impl HealthProbe {
    /// HTTP probe against `target` (ip:port or host:port).
    pub fn http(target: &str, path: &str, deadline: Duration) -> Self {
        Self {
            target: target.to_string(),
            kind: ProbeKind::Http {
                path: path.to_string(),
            },
            deadline,
        }
    }

    /// TCP connect probe against `target`.
    pub fn tcp(target: &str, deadline: Duration) -> Self {
        Self {
            target: target.to_string(),
            kind: ProbeKind::Tcp,
            deadline,
        }
    }

    /// The monitored target address.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Execute one bounded check against the target.
    pub async fn check(&self) -> HealthStatus {
        match &self.kind {
            ProbeKind::Http { path } => http::http_probe(&self.target, path, self.deadline).await,
            ProbeKind::Tcp => tcp::tcp_probe(&self.target, self.deadline).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn http_probe_to_closed_port_is_unhealthy() {
        let probe = HealthProbe::http("127.0.0.1:1", "/healthz", Duration::from_millis(200));
        assert_eq!(probe.check().await, HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn tcp_probe_to_closed_port_is_unhealthy() {
        let probe = HealthProbe::tcp("127.0.0.1:1", Duration::from_millis(200));
        assert_eq!(probe.check().await, HealthStatus::Unhealthy);
    }

    #[test]
    fn probe_reports_its_target() {
        let probe = HealthProbe::tcp("10.0.0.1:9000", Duration::from_secs(1));
        assert_eq!(probe.target(), "10.0.0.1:9000");
    }
}
