//! Reconnect policy
//!
//! The client never reconnects on its own. Callers that want automatic
//! reconnection drive [`LobbyClient::reconnect`](crate::LobbyClient::reconnect)
//! themselves and can use this policy to pace the attempts.

use std::time::Duration;

/// Bounded, exponentially backed-off reconnect schedule
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    /// Attempts allowed after a connection is lost (0 disables reconnecting)
    pub max_attempts: u32,
    /// Delay before the first attempt
    pub delay: Duration,
    /// Multiplier applied to the delay after each attempt
    pub backoff_factor: f64,
    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl ReconnectPolicy {
    /// Policy that never reconnects
    pub fn disabled() -> Self {
        Self {
            max_attempts: 0,
            ..Default::default()
        }
    }

    /// Delay before attempt number `attempt` (1-based), or `None` when the
    /// attempts are used up
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let factor = self.backoff_factor.max(1.0).powi(exponent);
        let nanos = (self.delay.as_nanos() as f64 * factor).min(u64::MAX as f64);
        Some(Duration::from_nanos(nanos as u64).min(self.max_delay))
    }
}
