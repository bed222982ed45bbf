//! vigil-state — watchdog state types and the supervision state machine.
//!
//! Holds the data model shared across the daemon (`HealthStatus`,
//! `SupervisorPhase`, `Action`, `WatchdogState`) and the `StateTracker`,
//! the deterministic state machine that turns a stream of probe results
//! into remediation decisions.
//!
//! # State machine
//!
//! ```text
//!            unhealthy (< threshold)
//!  Healthy ──────────────────────────▶ Degraded
//!     ▲  ▲                               │
//!     │  │ healthy                       │ unhealthy (≥ threshold)
//!     │  └───────────────────────────────┤
//!     │ healthy                          ▼
//!  Recovering ◀──────────────────── Unhealthy
//!               healthy (alert)      │ restart, then escalate
//!                                    │ after the cooldown
//!                                    ▼
//!                              (restarts halted until
//!                               recovery or manual resume)
//! ```
//!
//! `Unknown` probe results are missed samples, not evidence: they never
//! move the machine or touch the counters.
//!
//! The tracker is the sole owner of `WatchdogState`. Observers receive
//! cloned snapshots; all mutation happens on the control loop, one tick
//! at a time.

pub mod tracker;
pub mod types;

pub use tracker::{Decision, StateTracker};
pub use types::{Action, HealthStatus, SupervisorPhase, WatchdogState};
