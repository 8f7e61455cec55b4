use std::time::Duration;

use rand::Rng;

/// How long to wait between attempts.
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    Fixed(Duration),
    Exponential { base: Duration, max: Duration },
}

/// Retry schedule for re-establishing subscriptions. Call sites only ask
/// `delay_for`, so the schedule can change without touching them.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub backoff: Backoff,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
    /// Add up to one second of random jitter to each delay.
    pub jitter: bool,
}

impl RetryPolicy {
    /// Fixed interval, unbounded attempts.
    pub fn forever(interval: Duration) -> Self {
        Self {
            backoff: Backoff::Fixed(interval),
            max_attempts: None,
            jitter: false,
        }
    }

    pub fn exponential(base: Duration, max: Duration) -> Self {
        Self {
            backoff: Backoff::Exponential { base, max },
            max_attempts: None,
            jitter: false,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_jitter(mut self) -> Self {
        self.jitter = true;
        self
    }

    /// Delay before retrying after the `attempt`-th failure (1-based).
    /// `None` means give up.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if let Some(max) = self.max_attempts {
            if attempt >= max {
                return None;
            }
        }

        let delay = match &self.backoff {
            Backoff::Fixed(interval) => *interval,
            Backoff::Exponential { base, max } => {
                let exp = attempt.saturating_sub(1).min(16);
                base.saturating_mul(1u32 << exp).min(*max)
            }
        };

        if self.jitter {
            Some(delay + Duration::from_millis(rand::rng().random_range(0..1000)))
        } else {
            Some(delay)
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::forever(Duration::from_secs(60))
    }
}
