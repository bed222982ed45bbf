//! TCP connect probe.
//!
//! For targets without an HTTP health endpoint: a successful connect
//! within the deadline counts as alive. There is no indeterminate
//! outcome in this mode.

use std::time::Duration;

use tracing::debug;
use vigil_state::HealthStatus;

/// Probe `address` with a plain TCP connect bounded by `deadline`.
pub async fn tcp_probe(address: &str, deadline: Duration) -> HealthStatus {
    match tokio::time::timeout(deadline, tokio::net::TcpStream::connect(address)).await {
        Ok(Ok(_stream)) => HealthStatus::Healthy,
        Ok(Err(e)) => {
            debug!(error = %e, %address, "tcp probe failed");
            HealthStatus::Unhealthy
        }
        Err(_) => {
            debug!(%address, "tcp probe timed out");
            HealthStatus::Unhealthy
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn listening_socket_is_healthy() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        // Keep the listener alive for the duration of the probe.
        let status = tcp_probe(&addr, Duration::from_secs(1)).await;
        assert_eq!(status, HealthStatus::Healthy);
        drop(listener);
    }

    #[tokio::test]
    async fn refused_connection_is_unhealthy() {
        let status = tcp_probe("127.0.0.1:1", Duration::from_millis(200)).await;
        assert_eq!(status, HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn unroutable_address_times_out_unhealthy() {
        // TEST-NET-1 is reserved and never routable.
        let status = tcp_probe("192.0.2.1:80", Duration::from_millis(100)).await;
        assert_eq!(status, HealthStatus::Unhealthy);
    }
}
