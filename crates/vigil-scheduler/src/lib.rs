//! vigil-scheduler — the watchdog control loop.
//!
//! A single task drives the whole daemon: every interval it probes the
//! target, classifies the result through the state tracker, hands the
//! decision to the action executor, and publishes the committed state
//! over a watch channel for observers (the admin API).
//!
//! ```text
//! tick ──▶ HealthProbe::check ──▶ StateTracker::classify
//!                                        │
//!            watch channel ◀── publish ──┤
//!                                        ▼
//!                            ActionExecutor::execute
//! ```
//!
//! Cycles are strictly sequential — the next tick does not start until
//! the previous probe/classify/act cycle returned. Long-running actions
//! are spawned by the executor, so a slow restart can outlive its tick;
//! the executor's in-flight guard suppresses a duplicate restart rather
//! than queueing one. Manual-intervention commands arrive over an mpsc
//! channel and are applied between ticks, never concurrently.

pub mod scheduler;

pub use scheduler::{ControlCommand, Scheduler};
