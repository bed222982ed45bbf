//! Domain types for the vigil watchdog.
//!
//! These types describe the observable state of the supervision loop.
//! All of them serialize to JSON for the admin API and notification
//! payloads. `WatchdogState` lives for the process lifetime and is never
//! persisted — a restart of the watchdog starts from a clean, optimistic
//! state.

use serde::{Deserialize, Serialize};

/// Outcome of a single health probe against the monitored target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// The target answered positively.
    Healthy,
    /// The target was unreachable, timed out, or answered negatively.
    Unhealthy,
    /// The probe could not produce evidence either way (e.g. target busy).
    Unknown,
}

/// Phase of the supervision state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupervisorPhase {
    /// Target is healthy.
    Healthy,
    /// Transient failures below the threshold.
    Degraded,
    /// Failure threshold exceeded; remediation in progress.
    Unhealthy,
    /// First success after an outage; awaiting confirmation.
    Recovering,
}

/// Remediation decided for one tick. Derived, never stored on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Nothing to do.
    None,
    /// Invoke the recovery hook on the target.
    Restart,
    /// Emit a notification (also used for the recovery notice).
    Alert,
    /// Higher-severity notification; halts automatic restarts.
    Escalate,
}

/// The single mutable state of the watchdog.
///
/// Owned exclusively by [`StateTracker`](crate::StateTracker) and mutated
/// only at tick boundaries. Everyone else sees clones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchdogState {
    /// Current phase of the state machine.
    pub phase: SupervisorPhase,
    /// Consecutive unhealthy probe results.
    pub consecutive_failures: u32,
    /// Consecutive healthy probe results.
    pub consecutive_successes: u32,
    /// Last non-trivial action the tracker decided.
    pub last_action: Option<Action>,
    /// Unix timestamp (seconds) of the last phase transition.
    pub last_transition: u64,
    /// Whether a restart has been attempted for the current outage.
    pub restart_attempted: bool,
    /// Whether automatic restarts are halted (post-escalation).
    pub restarts_halted: bool,
}

impl WatchdogState {
    /// Initial state: optimistic start, zero counters.
    pub fn new() -> Self {
        Self {
            phase: SupervisorPhase::Healthy,
            consecutive_failures: 0,
            consecutive_successes: 0,
            last_action: None,
            last_transition: epoch_secs(),
            restart_attempted: false,
            restarts_halted: false,
        }
    }
}

impl Default for WatchdogState {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
