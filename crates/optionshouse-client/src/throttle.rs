//! Minimum spacing between outgoing requests.

use std::time::{Duration, Instant};
use tracing::debug;


/// Default spacing the API expects between two requests.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Tracks when the last request left and how long the next one must wait.
#[derive(Debug, Clone)]
pub struct Throttle {
    min_interval: Duration,
    last_sent: Option<Instant>,
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}

impl Throttle {
    /// Creates a throttle with the given spacing.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_sent: None,
        }
    }

    /// Configured spacing.
    #[must_use]
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// When the last request was recorded.
    #[must_use]
    pub fn last_sent(&self) -> Option<Instant> {
        self.last_sent
    }

    /// Time still to wait at `now`, if any.
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        let last = self.last_sent?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed < self.min_interval {
            Some(self.min_interval - elapsed)
        } else {
            None
        }
    }

    /// Sleeps until the next request may leave.
    pub async fn wait(&self) {
        if let Some(delay) = self.remaining(Instant::now()) {
            debug!("Throttling request for {:?}", delay);
            tokio::time::sleep(delay).await;
        }
    }

    /// Records that a request was just issued.
    pub fn mark_sent(&mut self) {
        self.last_sent = Some(Instant::now());
    }
}
