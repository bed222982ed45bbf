//! vigil-action — remediation for the watchdog's decisions.
//!
//! The [`ActionExecutor`] turns a per-tick [`Action`](vigil_state::Action)
//! into work:
//!
//! - `Restart` runs the configured recovery hook (external command and/or
//!   webhook) as a background task under a deadline. An in-flight flag
//!   guarantees two restarts are never outstanding at once — a second
//!   restart decision while one is running is skipped, not queued.
//! - `Alert` and `Escalate` are fire-and-forget notifications: always a
//!   structured log line, plus a webhook POST when a sink is configured,
//!   each bounded by its own timeout so the control loop never waits on
//!   a slow sink.
//!
//! Failures inside action tasks are logged and swallowed; the next tick
//! proceeds regardless.

pub mod error;
pub mod executor;
pub mod notify;

pub use error::{ActionError, ActionResult};
pub use executor::{ActionExecutor, Dispatch};
pub use notify::Notification;
