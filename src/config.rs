//! Call options for the bridge, with environment overrides.

use std::env;
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(60_000);
/// Floor for the poll interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

pub const POLL_INTERVAL_ENV: &str = "FIELD_BRIDGE_POLL_INTERVAL_MS";
pub const TIMEOUT_ENV: &str = "FIELD_BRIDGE_TIMEOUT_MS";

/// Polling cadence and deadline for one bridge call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallOptions {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl CallOptions {
    /// Defaults overridden by `FIELD_BRIDGE_POLL_INTERVAL_MS` / `FIELD_BRIDGE_TIMEOUT_MS`.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            poll_interval: env_millis(POLL_INTERVAL_ENV).unwrap_or(defaults.poll_interval),
            timeout: env_millis(TIMEOUT_ENV).unwrap_or(defaults.timeout),
        }
    }

    /// Sets the poll interval, raised to [`MIN_POLL_INTERVAL`] if smaller.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(MIN_POLL_INTERVAL);
        self
    }

    /// The interval the poll loop actually sleeps, never below [`MIN_POLL_INTERVAL`].
    #[must_use]
    pub fn effective_poll_interval(&self) -> Duration {
        self.poll_interval.max(MIN_POLL_INTERVAL)
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|millis| *millis > 0)
        .map(Duration::from_millis)
}
