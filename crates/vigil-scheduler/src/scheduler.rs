//! The periodic supervision loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use vigil_action::{ActionExecutor, Dispatch};
use vigil_probe::HealthProbe;
use vigil_state::{StateTracker, WatchdogState};

/// Commands applied to the tracker between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Record manual operator intervention: re-arm automatic restarts.
    Resume,
}

/// Drives probe → classify → act cycles on a fixed interval.
///
/// Owns the probe, the tracker, and (shared) the executor. All state
/// mutation happens on this loop; observers read snapshots from the
/// watch channel.
pub struct Scheduler {
    probe: HealthProbe,
    tracker: StateTracker,
    executor: Arc<ActionExecutor>,
    interval: Duration,
    shutdown_grace: Duration,
    state_tx: watch::Sender<WatchdogState>,
}

impl Scheduler {
    /// Create a scheduler. The caller owns the channels (and keeps a
    /// receiver for state snapshots).
    pub fn new(
        probe: HealthProbe,
        tracker: StateTracker,
        executor: Arc<ActionExecutor>,
        interval: Duration,
        shutdown_grace: Duration,
        state_tx: watch::Sender<WatchdogState>,
    ) -> Self {
        Self {
            probe,
            tracker,
            executor,
            interval,
            shutdown_grace,
            state_tx,
        }
    }

    /// Run until the shutdown signal fires, then drain the executor
    /// within the grace period.
    pub async fn run(
        mut self,
        mut shutdown: watch::Receiver<bool>,
        mut control: mpsc::Receiver<ControlCommand>,
    ) {
        info!(
            target = %self.probe.target(),
            interval_ms = self.interval.as_millis() as u64,
            "watchdog loop started"
        );

        // Cleared once all control senders are gone, to keep the closed
        // channel from waking the select in a busy loop.
        let mut control_open = true;

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {
                    self.tick().await;
                }
                cmd = control.recv(), if control_open => {
                    match cmd {
                        Some(ControlCommand::Resume) => {
                            self.tracker.resume();
                            let _ = self.state_tx.send(self.tracker.state().clone());
                        }
                        None => control_open = false,
                    }
                }
                _ = shutdown.changed() => {
                    info!("watchdog loop shutting down");
                    break;
                }
            }
        }

        self.executor.drain(self.shutdown_grace).await;
        info!("watchdog loop stopped");
    }

    /// One probe/classify/act cycle.
    async fn tick(&mut self) {
        let status = self.probe.check().await;
        let decision = self.tracker.classify(status);

        // Audit line for every cycle; phase transitions are additionally
        // logged at INFO by the tracker.
        debug!(
            ?status,
            prior = ?decision.prior,
            phase = ?decision.state.phase,
            failures = decision.state.consecutive_failures,
            successes = decision.state.consecutive_successes,
            action = ?decision.action,
            "probe cycle"
        );

        let dispatch = self
            .executor
            .execute(decision.action, &decision.state)
            .await;
        if dispatch == Dispatch::SkippedInFlight {
            debug!("restart suppressed; previous attempt still in flight");
        }

        let _ = self.state_tx.send(decision.state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_state::SupervisorPhase;

    fn dead_target_scheduler(
        threshold: u32,
        cooldown: Duration,
    ) -> (
        Scheduler,
        watch::Receiver<WatchdogState>,
        watch::Sender<bool>,
        watch::Receiver<bool>,
    ) {
        let probe = HealthProbe::tcp("127.0.0.1:1", Duration::from_millis(50));
        let tracker = StateTracker::new(threshold, cooldown);
        let executor = Arc::new(ActionExecutor::new("127.0.0.1:1"));
        let (state_tx, state_rx) = watch::channel(WatchdogState::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let scheduler = Scheduler::new(
            probe,
            tracker,
            executor,
            Duration::from_millis(10),
            Duration::from_millis(100),
            state_tx,
        );
        (scheduler, state_rx, shutdown_tx, shutdown_rx)
    }

    async fn wait_for_state(
        state_rx: &mut watch::Receiver<WatchdogState>,
        mut predicate: impl FnMut(&WatchdogState) -> bool,
    ) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                state_rx.changed().await.unwrap();
                if predicate(&state_rx.borrow()) {
                    break;
                }
            }
        })
        .await
        .expect("state predicate not reached in time");
    }

    #[tokio::test]
    async fn dead_target_reaches_unhealthy() {
        let (scheduler, mut state_rx, shutdown_tx, shutdown_rx) =
            dead_target_scheduler(2, Duration::from_secs(3600));
        let (_control_tx, control_rx) = mpsc::channel(1);
        let handle = tokio::spawn(scheduler.run(shutdown_rx, control_rx));

        wait_for_state(&mut state_rx, |s| s.phase == SupervisorPhase::Unhealthy).await;
        assert!(state_rx.borrow().restart_attempted);

        let _ = shutdown_tx.send(true);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn live_target_accumulates_successes() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        // Accept loop so repeated probes succeed.
        tokio::spawn(async move {
            loop {
                let _ = listener.accept().await;
            }
        });

        let probe = HealthProbe::tcp(&addr, Duration::from_millis(100));
        let tracker = StateTracker::new(3, Duration::from_secs(3600));
        let executor = Arc::new(ActionExecutor::new(&addr));
        let (state_tx, mut state_rx) = watch::channel(WatchdogState::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (_control_tx, control_rx) = mpsc::channel(1);

        let scheduler = Scheduler::new(
            probe,
            tracker,
            executor,
            Duration::from_millis(10),
            Duration::from_millis(100),
            state_tx,
        );
        let handle = tokio::spawn(scheduler.run(shutdown_rx, control_rx));

        wait_for_state(&mut state_rx, |s| {
            s.phase == SupervisorPhase::Healthy && s.consecutive_successes >= 2
        })
        .await;

        let _ = shutdown_tx.send(true);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn resume_command_re_arms_restarts() {
        // Threshold 1, zero cooldown: tick one restarts, tick two
        // escalates and halts.
        let (scheduler, mut state_rx, shutdown_tx, shutdown_rx) =
            dead_target_scheduler(1, Duration::ZERO);
        let (control_tx, control_rx) = mpsc::channel(1);
        let handle = tokio::spawn(scheduler.run(shutdown_rx, control_rx));

        wait_for_state(&mut state_rx, |s| s.restarts_halted).await;

        control_tx.send(ControlCommand::Resume).await.unwrap();
        wait_for_state(&mut state_rx, |s| !s.restarts_halted).await;

        let _ = shutdown_tx.send(true);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn loop_exits_promptly_on_shutdown() {
        let (scheduler, _state_rx, shutdown_tx, shutdown_rx) =
            dead_target_scheduler(3, Duration::from_secs(3600));
        // Control senders all dropped up front; the loop must not spin.
        let (_, control_rx) = mpsc::channel::<ControlCommand>(1);
        let handle = tokio::spawn(scheduler.run(shutdown_rx, control_rx));

        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = shutdown_tx.send(true);

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("scheduler did not stop in time")
            .unwrap();
    }
}
