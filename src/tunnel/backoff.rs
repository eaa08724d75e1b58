// ABOUTME: Reconnect delay policy for tunnels.
// ABOUTME: Exponential backoff with a capped delay and an unbounded retry count.

use serde::Deserialize;
use std::time::Duration;

/// Configuration for reconnection behavior.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReconnectConfig {
    /// Delay before the first retry.
    #[serde(default = "default_initial_delay", with = "humantime_serde")]
    pub initial_delay: Duration,
    /// Ceiling for the delay between retries.
    #[serde(default = "default_max_delay", with = "humantime_serde")]
    pub max_delay: Duration,
    /// Growth factor applied after each failed attempt.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            multiplier: default_multiplier(),
        }
    }
}

/// Exponential backoff sequence for reconnection attempts.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    config: ReconnectConfig,
    current_delay: Duration,
    attempt: u32,
}

impl ExponentialBackoff {
    pub fn new(config: ReconnectConfig) -> Self {
        Self {
            current_delay: config.initial_delay.min(config.max_delay),
            attempt: 0,
            config,
        }
    }

    /// Next delay to wait. Never runs out.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current_delay;
        self.attempt = self.attempt.saturating_add(1);

        let multiplier = if self.config.multiplier.is_finite() && self.config.multiplier >= 1.0 {
            self.config.multiplier
        } else {
            1.0
        };
        let next = Duration::try_from_secs_f64(self.current_delay.as_secs_f64() * multiplier)
            .unwrap_or(self.config.max_delay);
        self.current_delay = next.max(self.current_delay).min(self.config.max_delay);

        delay
    }

    /// Attempts handed out since the last reset (1-based after the first
    /// `next_delay`).
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn reset(&mut self) {
        self.current_delay = self.config.initial_delay.min(self.config.max_delay);
        self.attempt = 0;
    }
}
