//! Admin API handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::info;

use vigil_scheduler::ControlCommand;
use vigil_state::WatchdogState;

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

/// Status payload: the state snapshot plus daemon identity.
#[derive(serde::Serialize)]
pub struct StatusView {
    pub target: String,
    pub uptime_secs: u64,
    #[serde(flatten)]
    pub state: WatchdogState,
}

/// GET /healthz — the watchdog's own liveness.
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// GET /api/v1/status
pub async fn status(State(state): State<ApiState>) -> impl IntoResponse {
    let snapshot = state.state_rx.borrow().clone();
    let view = StatusView {
        target: state.target.clone(),
        uptime_secs: epoch_secs().saturating_sub(state.started_at),
        state: snapshot,
    };
    ApiResponse::ok(view).into_response()
}

/// POST /api/v1/resume — record manual intervention.
pub async fn resume(State(state): State<ApiState>) -> impl IntoResponse {
    match state.control_tx.send(ControlCommand::Resume).await {
        Ok(()) => {
            info!("manual intervention recorded via admin API");
            (StatusCode::ACCEPTED, ApiResponse::ok("resume recorded")).into_response()
        }
        Err(_) => {
            error_response("control loop is not running", StatusCode::SERVICE_UNAVAILABLE)
                .into_response()
        }
    }
}

fn epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
