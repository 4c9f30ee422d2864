//! Bounded poll-and-retry policy.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub const RETRY_INTERVAL: Duration = Duration::from_millis(50);
pub const RETRY_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    /// Multiplier applied to the interval after every wait (>= 1.0).
    pub factor: f64,
    pub max_interval: Duration,
}

/// How long and how often the retry loops poll.
///
/// The first attempt runs immediately; later attempts follow `interval`
/// (optionally growing by `backoff`) until `timeout` has elapsed.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub timeout: Duration,
    pub backoff: Option<Backoff>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { interval: RETRY_INTERVAL, timeout: RETRY_TIMEOUT, backoff: None }
    }
}

fn env_millis(key: &str) -> Option<Duration> {
    std::env::var(key).ok().and_then(|s| s.trim().parse::<u64>().ok()).map(Duration::from_millis)
}

impl RetryPolicy {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout, backoff: None }
    }

    pub fn with_backoff(mut self, factor: f64, max_interval: Duration) -> Self {
        self.backoff = Some(Backoff { factor: if factor.is_finite() { factor.max(1.0) } else { 1.0 }, max_interval });
        self
    }

    /// Defaults overridden by `MODREQ_RETRY_INTERVAL_MS`, `MODREQ_RETRY_TIMEOUT_MS`,
    /// `MODREQ_RETRY_BACKOFF_FACTOR` and `MODREQ_RETRY_MAX_INTERVAL_MS`.
    /// Malformed values are ignored.
    pub fn from_env() -> Self {
        let mut policy = Self::default();
        if let Some(d) = env_millis("MODREQ_RETRY_INTERVAL_MS").filter(|d| !d.is_zero()) {
            policy.interval = d;
        }
        if let Some(d) = env_millis("MODREQ_RETRY_TIMEOUT_MS") {
            policy.timeout = d;
        }
        let factor = std::env::var("MODREQ_RETRY_BACKOFF_FACTOR").ok().and_then(|s| s.trim().parse::<f64>().ok());
        if let Some(factor) = factor.filter(|f| f.is_finite() && *f >= 1.0) {
            let max = env_millis("MODREQ_RETRY_MAX_INTERVAL_MS").unwrap_or(policy.timeout);
            policy = policy.with_backoff(factor, max);
        }
        policy
    }

    pub(crate) fn start(&self) -> Poller {
        Poller { deadline: Instant::now() + self.timeout, delay: self.interval, backoff: self.backoff }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stop {
    TimedOut,
    Cancelled,
}

/// Paces the attempts of one retry loop.
pub(crate) struct Poller {
    deadline: Instant,
    delay: Duration,
    backoff: Option<Backoff>,
}

impl Poller {
    /// Sleep until the next attempt is due, or report why there is none.
    pub(crate) async fn wait(&mut self, cancel: &CancellationToken) -> Result<(), Stop> {
        if cancel.is_cancelled() {
            return Err(Stop::Cancelled);
        }
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(Stop::TimedOut);
        }
        tokio::select! {
            _ = tokio::time::sleep(self.delay.min(remaining)) => {}
            _ = cancel.cancelled() => return Err(Stop::Cancelled),
        }
        if let Some(b) = self.backoff {
            self.delay = self.delay.mul_f64(b.factor).min(b.max_interval);
        }
        Ok(())
    }
}
