//! Daemon configuration.
//!
//! vigild is launched with no arguments; everything comes from
//! environment variables. Configuration problems are the only fatal
//! errors in the daemon — once the loop is running, nothing a probe or
//! an action does can take it down.
//!
//! Duration values accept `10s`, `500ms`, `2m`, or a bare number of
//! seconds. Empty variables are treated as unset.

use std::time::Duration;

use thiserror::Error;

/// Probe protocol selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeMode {
    Http,
    Tcp,
}

/// Errors raised while reading the environment. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Full daemon configuration, resolved from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Monitored target address (`host:port`).
    pub target: String,
    /// Probe protocol.
    pub probe_mode: ProbeMode,
    /// HTTP probe path.
    pub probe_path: String,
    /// Check interval.
    pub interval: Duration,
    /// Per-probe deadline.
    pub probe_timeout: Duration,
    /// Consecutive failures before the target is unhealthy.
    pub failure_threshold: u32,
    /// Wait after a restart before a still-failing target escalates.
    pub escalation_cooldown: Duration,
    /// Recovery shell command.
    pub restart_cmd: Option<String>,
    /// Recovery webhook.
    pub restart_url: Option<String>,
    /// Restart hook deadline.
    pub restart_timeout: Duration,
    /// Alert/escalation webhook.
    pub alert_url: Option<String>,
    /// Alert delivery deadline.
    pub alert_timeout: Duration,
    /// Admin API port; the API is disabled when unset.
    pub admin_port: Option<u16>,
    /// Drain window for in-flight actions on shutdown.
    pub shutdown_grace: Duration,
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &'static str| {
            get(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let target = var("VIGIL_TARGET").ok_or(ConfigError::Missing("VIGIL_TARGET"))?;

        let probe_mode = match var("VIGIL_PROBE").as_deref() {
            None => ProbeMode::Http,
            Some("http") => ProbeMode::Http,
            Some("tcp") => ProbeMode::Tcp,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "VIGIL_PROBE",
                    value: other.to_string(),
                    reason: "expected http or tcp",
                });
            }
        };

        let probe_path = match var("VIGIL_PROBE_PATH") {
            Some(path) if path.starts_with('/') => path,
            Some(path) => format!("/{path}"),
            None => "/healthz".to_string(),
        };

        let interval = duration_var(&var, "VIGIL_INTERVAL", Duration::from_secs(10))?;
        let probe_timeout = duration_var(&var, "VIGIL_PROBE_TIMEOUT", Duration::from_secs(2))?;
        let escalation_cooldown =
            duration_var(&var, "VIGIL_ESCALATION_COOLDOWN", Duration::from_secs(60))?;
        let restart_timeout = duration_var(&var, "VIGIL_RESTART_TIMEOUT", Duration::from_secs(30))?;
        let alert_timeout = duration_var(&var, "VIGIL_ALERT_TIMEOUT", Duration::from_secs(5))?;
        let shutdown_grace = duration_var(&var, "VIGIL_SHUTDOWN_GRACE", Duration::from_secs(5))?;

        let failure_threshold = match var("VIGIL_FAILURE_THRESHOLD") {
            None => 3,
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if n >= 1 => n,
                Ok(_) => {
                    return Err(ConfigError::Invalid {
                        var: "VIGIL_FAILURE_THRESHOLD",
                        value: raw,
                        reason: "must be at least 1",
                    });
                }
                Err(_) => {
                    return Err(ConfigError::Invalid {
                        var: "VIGIL_FAILURE_THRESHOLD",
                        value: raw,
                        reason: "expected an integer",
                    });
                }
            },
        };

        let restart_url = url_var(&var, "VIGIL_RESTART_URL")?;
        let alert_url = url_var(&var, "VIGIL_ALERT_URL")?;
        let restart_cmd = var("VIGIL_RESTART_CMD");

        let admin_port = match var("VIGIL_ADMIN_PORT") {
            None => None,
            Some(raw) => match raw.parse::<u16>() {
                Ok(port) => Some(port),
                Err(_) => {
                    return Err(ConfigError::Invalid {
                        var: "VIGIL_ADMIN_PORT",
                        value: raw,
                        reason: "expected a port number",
                    });
                }
            },
        };

        Ok(Self {
            target,
            probe_mode,
            probe_path,
            interval,
            probe_timeout,
            failure_threshold,
            escalation_cooldown,
            restart_cmd,
            restart_url,
            restart_timeout,
            alert_url,
            alert_timeout,
            admin_port,
            shutdown_grace,
        })
    }
}

fn duration_var(
    var: &impl Fn(&'static str) -> Option<String>,
    name: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match var(name) {
        None => Ok(default),
        Some(raw) => parse_duration(&raw).ok_or(ConfigError::Invalid {
            var: name,
            value: raw,
            reason: "expected a duration such as 10s, 500ms, 2m",
        }),
    }
}

fn url_var(
    var: &impl Fn(&'static str) -> Option<String>,
    name: &'static str,
) -> Result<Option<String>, ConfigError> {
    match var(name) {
        None => Ok(None),
        Some(url) if url.starts_with("http://") => Ok(Some(url)),
        Some(url) => Err(ConfigError::Invalid {
            var: name,
            value: url,
            reason: "only http:// sinks are supported",
        }),
    }
}

/// Parse a duration string like "5s", "500ms", "1m", or bare seconds.
fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>().ok().map(|m| Duration::from_secs(m * 60))
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
