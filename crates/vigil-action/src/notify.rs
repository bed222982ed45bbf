//! Notification payloads and webhook delivery.
//!
//! Notifications go to an HTTP sink as a JSON POST. The wire format is
//! intentionally small; anything richer belongs to the sink side.

use serde::Serialize;
use tracing::debug;
use vigil_state::{SupervisorPhase, WatchdogState};

use crate::error::{ActionError, ActionResult};

/// One notification event, serialized as the webhook body.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    /// Event kind: `alert`, `escalation`, or `restart`.
    pub event: &'static str,
    /// Severity: `warning` or `critical`.
    pub severity: &'static str,
    /// The monitored target address.
    pub target: String,
    /// Phase of the watchdog when the event fired.
    pub phase: SupervisorPhase,
    /// Consecutive failures at the time of the event.
    pub consecutive_failures: u32,
    /// Human-readable summary.
    pub message: String,
    /// Unix timestamp (seconds).
    pub ts: u64,
}

impl Notification {
    /// Build a notification from the current watchdog state.
    pub fn new(
        event: &'static str,
        severity: &'static str,
        target: &str,
        state: &WatchdogState,
        message: String,
    ) -> Self {
        Self {
            event,
            severity,
            target: target.to_string(),
            phase: state.phase,
            consecutive_failures: state.consecutive_failures,
            message,
            ts: epoch_secs(),
        }
    }
}

/// POST a notification as JSON to an `http://` sink.
///
/// One raw hyper handshake per delivery, mirroring the probe path; the
/// caller bounds the whole call with a timeout.
pub async fn post_json(url: &str, payload: &Notification) -> ActionResult<()> {
    let (authority, path) = split_url(url)?;
    let body = serde_json::to_vec(payload)?;

    let stream = tokio::net::TcpStream::connect(&authority)
        .await
        .map_err(|e| ActionError::Connect(authority.clone(), e))?;

    let io = hyper_util::rt::TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;

    // Drive the connection in the background.
    tokio::spawn(async move {
        let _ = conn.await;
    });

    let req = http::Request::builder()
        .method("POST")
        .uri(format!("http://{authority}{path}"))
        .header("host", authority.as_str())
        .header("content-type", "application/json")
        .header("user-agent", "vigil-action/0.1")
        .body(http_body_util::Full::new(bytes::Bytes::from(body)))?;

    let resp = sender.send_request(req).await?;
    if !resp.status().is_success() {
        return Err(ActionError::SinkStatus(resp.status()));
    }
    debug!(%url, "notification delivered");
    Ok(())
}

/// Split an `http://host:port/path` URL into (authority, path).
fn split_url(url: &str) -> ActionResult<(String, String)> {
    let rest = url
        .strip_prefix("http://")
        .ok_or_else(|| ActionError::UnsupportedUrl(url.to_string()))?;
    match rest.split_once('/') {
        Some((authority, path)) if !authority.is_empty() => {
            Ok((authority.to_string(), format!("/{path}")))
        }
        None if !rest.is_empty() => Ok((rest.to_string(), "/".to_string())),
        _ => Err(ActionError::UnsupportedUrl(url.to_string())),
    }
}

fn epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
