//! HTTP liveness probe.
//!
//! A raw hyper 1.x handshake per check: no connection pooling, so every
//! tick observes a full connect + request round trip, which is exactly
//! what a liveness check wants.

use std::time::Duration;

use http::StatusCode;
use tracing::debug;
use vigil_state::HealthStatus;

/// Perform one HTTP GET health probe against `http://{address}{path}`.
///
/// 2xx is `Healthy`; 429/503 signal a busy target and map to `Unknown`;
/// everything else — other status codes, connect/handshake failures,
/// deadline overrun — is `Unhealthy`.
pub async fn http_probe(address: &str, path: &str, deadline: Duration) -> HealthStatus {
    let uri = format!("http://{address}{path}");

    let result = tokio::time::timeout(deadline, async {
        let stream = match tokio::net::TcpStream::connect(address).await {
            Ok(s) => s,
            Err(e) => {
                debug!(error = %e, %uri, "probe connection failed");
                return HealthStatus::Unhealthy;
            }
        };

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = match hyper::client::conn::http1::handshake(io).await {
            Ok(pair) => pair,
            Err(e) => {
                debug!(error = %e, %uri, "probe handshake failed");
                return HealthStatus::Unhealthy;
            }
        };

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let req = match http::Request::builder()
            .method("GET")
            .uri(&uri)
            .header("host", address)
            .header("user-agent", "vigil-probe/0.1")
            .body(http_body_util::Empty::<bytes::Bytes>::new())
        {
            Ok(req) => req,
            Err(e) => {
                debug!(error = %e, %uri, "probe request invalid");
                return HealthStatus::Unhealthy;
            }
        };

        match sender.send_request(req).await {
            Ok(resp) => classify_status(resp.status(), &uri),
            Err(e) => {
                debug!(error = %e, %uri, "probe request failed");
                HealthStatus::Unhealthy
            }
        }
    })
    .await;

    match result {
        Ok(status) => status,
        Err(_) => {
            debug!(%uri, "probe timed out");
            HealthStatus::Unhealthy
        }
    }
}

fn classify_status(status: StatusCode, uri: &str) -> HealthStatus {
    if status.is_success() {
        return HealthStatus::Healthy;
    }
    // A busy target is not evidence of an outage.
    if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE {
        debug!(%status, %uri, "probe indeterminate");
        return HealthStatus::Unknown;
    }
    debug!(%status, %uri, "probe non-2xx");
    HealthStatus::Unhealthy
}
