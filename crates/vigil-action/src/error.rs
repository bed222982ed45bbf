//! Action execution error types.

use thiserror::Error;

/// Result type alias for action operations.
pub type ActionResult<T> = Result<T, ActionError>;

/// Errors that can occur while executing a remediation action.
///
/// These never propagate out of an action task; they are logged and the
/// daemon moves on to the next tick.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("unsupported notification url (only http:// is accepted): {0}")]
    UnsupportedUrl(String),

    #[error("connection to {0} failed: {1}")]
    Connect(String, std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] hyper::Error),

    #[error("invalid request: {0}")]
    Request(#[from] http::Error),

    #[error("sink returned {0}")]
    SinkStatus(http::StatusCode),

    #[error("restart command exited with {0}")]
    CommandStatus(std::process::ExitStatus),

    #[error("failed to spawn restart command: {0}")]
    CommandSpawn(std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
