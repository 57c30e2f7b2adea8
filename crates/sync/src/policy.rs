//! Retry and scheduling policy for sync cycles.

use std::time::Duration;
use store::{BackoffKind, SyncSettings};

/// How the delay grows between retries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry
    Fixed,
    /// Delay doubles per retry, capped at `max_delay`
    Exponential { max_delay: Duration },
}

/// Bounded retry policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first failed attempt
    pub max_retries: u32,
    /// Base delay before a retry
    pub delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_secs(2),
            backoff: Backoff::Fixed,
        }
    }
}

impl RetryPolicy {
    /// Total attempts a cycle may make
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential { max_delay } => {
                let exponent = retry.saturating_sub(1).min(31);
                self.delay
                    .checked_mul(1u32 << exponent)
                    .unwrap_or(max_delay)
                    .min(max_delay)
            }
        }
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub retry: RetryPolicy,
    /// Pause after reconnecting before an automatic cycle starts
    pub settle_delay: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            settle_delay: Duration::from_secs(2),
        }
    }
}

impl SyncConfig {
    /// Create a config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.retry.max_retries = max_retries;
        self
    }

    /// Set the base retry delay
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry.delay = delay;
        self
    }

    /// Set the backoff strategy
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.retry.backoff = backoff;
        self
    }

    /// Set the reconnect settle delay
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }
}

impl From<&SyncSettings> for SyncConfig {
    fn from(settings: &SyncSettings) -> Self {
        let backoff = match settings.backoff {
            BackoffKind::Fixed => Backoff::Fixed,
            BackoffKind::Exponential => Backoff::Exponential {
                max_delay: Duration::from_millis(settings.max_retry_delay_ms),
            },
        };
        Self::new()
            .with_max_retries(settings.max_retries)
            .with_retry_delay(Duration::from_millis(settings.retry_delay_ms))
            .with_backoff(backoff)
            .with_settle_delay(Duration::from_millis(settings.settle_delay_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let config = SyncConfig::default();
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.max_attempts(), 4);
        assert_eq!(config.retry.delay_for(1), Duration::from_secs(2));
        assert_eq!(config.retry.delay_for(3), Duration::from_secs(2));
        assert_eq!(config.settle_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let policy = RetryPolicy {
            max_retries: 10,
            delay: Duration::from_millis(500),
            backoff: Backoff::Exponential {
                max_delay: Duration::from_secs(3),
            },
        };

        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(4), Duration::from_secs(3));
        assert_eq!(policy.delay_for(40), Duration::from_secs(3));
    }

    #[test]
    fn test_from_settings() {
        let settings = SyncSettings {
            max_retries: 1,
            retry_delay_ms: 100,
            backoff: BackoffKind::Exponential,
            max_retry_delay_ms: 800,
            settle_delay_ms: 50,
            auto_sync: true,
        };
        let config = SyncConfig::from(&settings);

        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.retry.delay, Duration::from_millis(100));
        assert_eq!(
            config.retry.backoff,
            Backoff::Exponential {
                max_delay: Duration::from_millis(800)
            }
        );
        assert_eq!(config.settle_delay, Duration::from_millis(50));
    }
}
