//! Action executor — dispatches remediation decisions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use vigil_state::{Action, WatchdogState};

use crate::error::{ActionError, ActionResult};
use crate::notify::{post_json, Notification};

/// What the executor did with a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Nothing to do.
    Noop,
    /// Handled synchronously (log-only paths).
    Completed,
    /// A background task was started.
    Started,
    /// A restart was requested while one is still outstanding.
    SkippedInFlight,
}

/// Executes restart/alert/escalate decisions for a single target.
///
/// Restarts run as background tasks so a slow recovery never blocks the
/// probe cadence; the in-flight flag suppresses duplicates. Alerts are
/// fire-and-forget with their own timeout.
pub struct ActionExecutor {
    target: String,
    restart_cmd: Option<String>,
    restart_url: Option<String>,
    restart_timeout: Duration,
    alert_url: Option<String>,
    alert_timeout: Duration,
    /// Set while a restart task is outstanding.
    restart_in_flight: Arc<AtomicBool>,
    /// Handle to the outstanding restart task, for drain/abort.
    restart_task: Mutex<Option<JoinHandle<()>>>,
}

impl ActionExecutor {
    /// Create an executor with no hooks configured (log-only).
    pub fn new(target: &str) -> Self {
        Self {
            target: target.to_string(),
            restart_cmd: None,
            restart_url: None,
            restart_timeout: Duration::from_secs(30),
            alert_url: None,
            alert_timeout: Duration::from_secs(5),
            restart_in_flight: Arc::new(AtomicBool::new(false)),
            restart_task: Mutex::new(None),
        }
    }

    /// Set the restart shell command (run via `sh -c`).
    pub fn with_restart_cmd(mut self, cmd: Option<String>) -> Self {
        self.restart_cmd = cmd;
        self
    }

    /// Set the restart webhook URL.
    pub fn with_restart_url(mut self, url: Option<String>) -> Self {
        self.restart_url = url;
        self
    }

    /// Set the alert/escalation webhook URL.
    pub fn with_alert_url(mut self, url: Option<String>) -> Self {
        self.alert_url = url;
        self
    }

    /// Set the restart hook deadline.
    pub fn with_restart_timeout(mut self, timeout: Duration) -> Self {
        self.restart_timeout = timeout;
        self
    }

    /// Set the alert delivery deadline.
    pub fn with_alert_timeout(mut self, timeout: Duration) -> Self {
        self.alert_timeout = timeout;
        self
    }

    /// Whether a restart task is currently outstanding.
    pub fn restart_in_flight(&self) -> bool {
        self.restart_in_flight.load(Ordering::SeqCst)
    }

    /// Execute one decision. Never fails: action errors are logged inside
    /// their tasks and swallowed.
    pub async fn execute(&self, action: Action, state: &WatchdogState) -> Dispatch {
        match action {
            Action::None => Dispatch::Noop,
            Action::Restart => self.dispatch_restart(state).await,
            Action::Alert => {
                let message = format!(
                    "target {} reported healthy after an outage; awaiting confirmation",
                    self.target
                );
                warn!(target = %self.target, "{message}");
                self.dispatch_notice("alert", "warning", state, message)
            }
            Action::Escalate => {
                let message = format!(
                    "target {} is still failing after a restart; automatic restarts halted pending manual intervention",
                    self.target
                );
                error!(target = %self.target, "{message}");
                self.dispatch_notice("escalation", "critical", state, message)
            }
        }
    }

    /// Wait up to `grace` for an outstanding restart, then abort it.
    pub async fn drain(&self, grace: Duration) {
        let handle = self.restart_task.lock().await.take();
        if let Some(mut handle) = handle {
            if handle.is_finished() {
                return;
            }
            info!("waiting for in-flight restart to finish");
            if tokio::time::timeout(grace, &mut handle).await.is_err() {
                warn!("restart still in flight after grace period; aborting");
                handle.abort();
            }
        }
    }

    async fn dispatch_restart(&self, state: &WatchdogState) -> Dispatch {
        if self.restart_cmd.is_none() && self.restart_url.is_none() {
            warn!(
                target = %self.target,
                failures = state.consecutive_failures,
                "restart decided but no recovery hook is configured"
            );
            return Dispatch::Completed;
        }

        // Two restarts are never in flight at once.
        if self
            .restart_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!(target = %self.target, "restart already in flight; skipping");
            return Dispatch::SkippedInFlight;
        }

        let cmd = self.restart_cmd.clone();
        let url = self.restart_url.clone();
        let timeout = self.restart_timeout;
        let target = self.target.clone();
        let in_flight = Arc::clone(&self.restart_in_flight);
        let notification = Notification::new(
            "restart",
            "warning",
            &self.target,
            state,
            format!("restarting target {}", self.target),
        );

        let handle = tokio::spawn(async move {
            match tokio::time::timeout(timeout, run_restart(cmd, url, &target, notification)).await
            {
                Ok(Ok(())) => info!(%target, "restart hook completed"),
                Ok(Err(e)) => error!(%target, error = %e, "restart hook failed"),
                Err(_) => error!(%target, ?timeout, "restart hook timed out"),
            }
            in_flight.store(false, Ordering::SeqCst);
        });

        *self.restart_task.lock().await = Some(handle);
        Dispatch::Started
    }

    fn dispatch_notice(
        &self,
        event: &'static str,
        severity: &'static str,
        state: &WatchdogState,
        message: String,
    ) -> Dispatch {
        let Some(url) = self.alert_url.clone() else {
            return Dispatch::Completed;
        };

        let notification = Notification::new(event, severity, &self.target, state, message);
        let timeout = self.alert_timeout;

        // Fire and forget: delivery never blocks the control loop.
        tokio::spawn(async move {
            match tokio::time::timeout(timeout, post_json(&url, &notification)).await {
                Ok(Ok(())) => debug!(%url, event, "notification delivered"),
                Ok(Err(e)) => warn!(%url, event, error = %e, "notification delivery failed"),
                Err(_) => warn!(%url, event, ?timeout, "notification delivery timed out"),
            }
        });
        Dispatch::Started
    }
}

/// Run the configured recovery hooks in order: command, then webhook.
async fn run_restart(
    cmd: Option<String>,
    url: Option<String>,
    target: &str,
    notification: Notification,
) -> ActionResult<()> {
    if let Some(cmd) = cmd {
        info!(%target, command = %cmd, "running restart command");
        // kill_on_drop so aborting the restart task also reaps the child.
        let status = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&cmd)
            .kill_on_drop(true)
            .status()
            .await
            .map_err(ActionError::CommandSpawn)?;
        if !status.success() {
            return Err(ActionError::CommandStatus(status));
        }
    }
    if let Some(url) = url {
        info!(%target, %url, "invoking restart webhook");
        post_json(&url, &notification).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn state() -> WatchdogState {
        WatchdogState::new()
    }

    /// Poll until the restart flag clears or the deadline passes.
    async fn wait_for_idle(executor: &ActionExecutor, deadline: Duration) -> bool {
        let start = tokio::time::Instant::now();
        while executor.restart_in_flight() {
            if start.elapsed() > deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        true
    }

    /// Capture one HTTP request on an ephemeral listener; respond 200.
    async fn capture_one() -> (String, tokio::sync::oneshot::Receiver<String>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let (tx, rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = vec![0u8; 4096];
                let n = stream.read(&mut buf).await.unwrap_or(0);
                let _ = stream
                    .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                    .await;
                let _ = stream.shutdown().await;
                let _ = tx.send(String::from_utf8_lossy(&buf[..n]).into_owned());
            }
        });
        (addr, rx)
    }

    #[tokio::test]
    async fn none_is_a_noop() {
        let executor = ActionExecutor::new("db:5432");
        assert_eq!(executor.execute(Action::None, &state()).await, Dispatch::Noop);
    }

    #[tokio::test]
    async fn restart_without_hooks_completes_immediately() {
        let executor = ActionExecutor::new("db:5432");
        let dispatch = executor.execute(Action::Restart, &state()).await;
        assert_eq!(dispatch, Dispatch::Completed);
        assert!(!executor.restart_in_flight());
    }

    #[tokio::test]
    async fn restart_command_runs_and_clears_the_flag() {
        let executor =
            ActionExecutor::new("db:5432").with_restart_cmd(Some("true".to_string()));
        let dispatch = executor.execute(Action::Restart, &state()).await;
        assert_eq!(dispatch, Dispatch::Started);
        assert!(wait_for_idle(&executor, Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn failing_restart_command_still_clears_the_flag() {
        let executor =
            ActionExecutor::new("db:5432").with_restart_cmd(Some("false".to_string()));
        executor.execute(Action::Restart, &state()).await;
        assert!(wait_for_idle(&executor, Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn second_restart_is_skipped_while_one_is_in_flight() {
        let executor =
            ActionExecutor::new("db:5432").with_restart_cmd(Some("sleep 5".to_string()));

        let first = executor.execute(Action::Restart, &state()).await;
        assert_eq!(first, Dispatch::Started);
        assert!(executor.restart_in_flight());

        let second = executor.execute(Action::Restart, &state()).await;
        assert_eq!(second, Dispatch::SkippedInFlight);

        // Abort the sleeper rather than waiting it out.
        executor.drain(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn restart_webhook_is_invoked() {
        let (addr, rx) = capture_one().await;
        let executor = ActionExecutor::new("db:5432")
            .with_restart_url(Some(format!("http://{addr}/restart")));

        let dispatch = executor.execute(Action::Restart, &state()).await;
        assert_eq!(dispatch, Dispatch::Started);

        let request = rx.await.unwrap();
        assert!(request.starts_with("POST /restart"));
        assert!(request.contains("\"event\":\"restart\""));
        assert!(wait_for_idle(&executor, Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn alert_without_sink_completes_immediately() {
        let executor = ActionExecutor::new("db:5432");
        let dispatch = executor.execute(Action::Alert, &state()).await;
        assert_eq!(dispatch, Dispatch::Completed);
    }

    #[tokio::test]
    async fn alert_posts_to_the_sink() {
        let (addr, rx) = capture_one().await;
        let executor =
            ActionExecutor::new("db:5432").with_alert_url(Some(format!("http://{addr}/hooks")));

        let dispatch = executor.execute(Action::Alert, &state()).await;
        assert_eq!(dispatch, Dispatch::Started);

        let request = rx.await.unwrap();
        assert!(request.starts_with("POST /hooks"));
        assert!(request.contains("\"event\":\"alert\""));
        assert!(request.contains("\"severity\":\"warning\""));
    }

    #[tokio::test]
    async fn escalation_posts_critical_severity() {
        let (addr, rx) = capture_one().await;
        let executor =
            ActionExecutor::new("db:5432").with_alert_url(Some(format!("http://{addr}/hooks")));

        executor.execute(Action::Escalate, &state()).await;

        let request = rx.await.unwrap();
        assert!(request.contains("\"event\":\"escalation\""));
        assert!(request.contains("\"severity\":\"critical\""));
    }

    #[tokio::test]
    async fn drain_aborts_a_stuck_restart() {
        let executor =
            ActionExecutor::new("db:5432").with_restart_cmd(Some("sleep 30".to_string()));
        executor.execute(Action::Restart, &state()).await;

        let start = tokio::time::Instant::now();
        executor.drain(Duration::from_millis(100)).await;
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn drain_with_no_outstanding_restart_returns_immediately() {
        let executor = ActionExecutor::new("db:5432");
        executor.drain(Duration::from_secs(1)).await;
    }
}
