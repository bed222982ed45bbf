//! The supervision state machine.
//!
//! `StateTracker` consumes one probe result per tick and decides the
//! phase transition and remediation action for that tick. It is purely
//! sequential: `classify` takes `&mut self` and the control loop is the
//! only caller, so the state needs no locking.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::types::{epoch_secs, Action, HealthStatus, SupervisorPhase, WatchdogState};

/// The outcome of classifying one probe result.
#[derive(Debug, Clone)]
pub struct Decision {
    /// Phase before this tick.
    pub prior: SupervisorPhase,
    /// Remediation decided for this tick.
    pub action: Action,
    /// Snapshot of the state after this tick.
    pub state: WatchdogState,
}

/// Tracks consecutive probe results and drives the remediation policy.
///
/// Restart policy per outage: one `Restart` when the failure threshold is
/// crossed, then `Escalate` once if the target is still failing after the
/// escalation cooldown. After escalation, automatic restarts stay halted
/// until the target fully recovers or an operator records manual
/// intervention via [`resume`](Self::resume).
#[derive(Debug)]
pub struct StateTracker {
    state: WatchdogState,
    /// Consecutive failures before the phase turns `Unhealthy`.
    failure_threshold: u32,
    /// How long after a restart attempt a still-failing target escalates.
    escalation_cooldown: Duration,
    /// When the restart for the current outage was decided.
    restart_attempted_at: Option<Instant>,
}

impl StateTracker {
    /// Create a tracker with the given policy knobs.
    pub fn new(failure_threshold: u32, escalation_cooldown: Duration) -> Self {
        Self {
            state: WatchdogState::new(),
            failure_threshold,
            escalation_cooldown,
            restart_attempted_at: None,
        }
    }

    /// Classify one probe result, committing the resulting state.
    ///
    /// `Unknown` is a missed sample: no counter movement, no phase
    /// change, no action.
    pub fn classify(&mut self, status: HealthStatus) -> Decision {
        let prior = self.state.phase;

        let action = match status {
            HealthStatus::Unknown => {
                debug!(phase = ?prior, "indeterminate probe; sample skipped");
                Action::None
            }
            HealthStatus::Healthy => self.on_healthy(),
            HealthStatus::Unhealthy => self.on_unhealthy(),
        };

        if self.state.phase != prior {
            self.state.last_transition = epoch_secs();
            info!(
                from = ?prior,
                to = ?self.state.phase,
                failures = self.state.consecutive_failures,
                successes = self.state.consecutive_successes,
                "phase transition"
            );
        }
        if action != Action::None {
            self.state.last_action = Some(action);
        }

        Decision {
            prior,
            action,
            state: self.state.clone(),
        }
    }

    /// Record manual operator intervention.
    ///
    /// Clears the post-escalation halt and re-arms a single restart for
    /// the ongoing outage. A no-op when restarts are not halted.
    pub fn resume(&mut self) {
        if self.state.restarts_halted {
            self.state.restarts_halted = false;
            self.state.restart_attempted = false;
            self.restart_attempted_at = None;
            info!("manual intervention recorded; automatic restarts re-armed");
        } else {
            debug!("resume requested but restarts were not halted");
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> &WatchdogState {
        &self.state
    }

    fn on_healthy(&mut self) -> Action {
        self.state.consecutive_failures = 0;
        self.state.consecutive_successes += 1;

        match self.state.phase {
            SupervisorPhase::Healthy => Action::None,
            SupervisorPhase::Degraded => {
                // Transient blip below threshold; nothing ever ran.
                self.state.phase = SupervisorPhase::Healthy;
                Action::None
            }
            SupervisorPhase::Unhealthy => {
                self.state.phase = SupervisorPhase::Recovering;
                Action::Alert
            }
            SupervisorPhase::Recovering => {
                self.state.phase = SupervisorPhase::Healthy;
                self.clear_outage();
                Action::None
            }
        }
    }

    fn on_unhealthy(&mut self) -> Action {
        self.state.consecutive_successes = 0;
        self.state.consecutive_failures += 1;

        match self.state.phase {
            SupervisorPhase::Healthy | SupervisorPhase::Degraded => {
                if self.state.consecutive_failures >= self.failure_threshold {
                    self.state.phase = SupervisorPhase::Unhealthy;
                    self.restart_decision()
                } else {
                    self.state.phase = SupervisorPhase::Degraded;
                    Action::None
                }
            }
            SupervisorPhase::Unhealthy => self.restart_decision(),
            SupervisorPhase::Recovering => {
                // Relapse: the outage never ended. Restart bookkeeping is
                // kept so continued failure escalates instead of
                // restarting again.
                self.state.phase = SupervisorPhase::Unhealthy;
                self.restart_decision()
            }
        }
    }

    fn restart_decision(&mut self) -> Action {
        if !self.state.restart_attempted {
            self.state.restart_attempted = true;
            self.restart_attempted_at = Some(Instant::now());
            warn!(
                failures = self.state.consecutive_failures,
                threshold = self.failure_threshold,
                "failure threshold exceeded; restarting target"
            );
            return Action::Restart;
        }
        if self.state.restarts_halted {
            return Action::None;
        }
        let cooldown_elapsed = self
            .restart_attempted_at
            .map_or(true, |t| t.elapsed() >= self.escalation_cooldown);
        if cooldown_elapsed {
            self.state.restarts_halted = true;
            warn!(
                failures = self.state.consecutive_failures,
                "restart did not recover the target; escalating and halting automatic restarts"
            );
            Action::Escalate
        } else {
            Action::None
        }
    }

    fn clear_outage(&mut self) {
        self.state.restart_attempted = false;
        self.state.restarts_halted = false;
        self.restart_attempted_at = None;
    }
}
