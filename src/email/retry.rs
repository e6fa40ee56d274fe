use rand::Rng;
use std::time::Duration;

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_attempts: u32,
    pub jitter_factor: f64,
    pub timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 500,
            max_delay_ms: 10_000,
            max_attempts: 4,
            jitter_factor: 0.2,
            timeout_secs: 10,
        }
    }
}

impl RetryConfig {
    /// Calculate delay before retry `attempt` (0-based) with exponential backoff and jitter
    /// Formula: delay = min(base_delay × 2^attempt × (1 ± jitter), max_delay)
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay_ms as f64;
        let exponential = base * 2_f64.powi(attempt.min(30) as i32);

        let mut rng = rand::rng();
        let jitter = 1.0 + (rng.random::<f64>() * 2.0 - 1.0) * self.jitter_factor;
        let capped = (exponential * jitter).min(self.max_delay_ms as f64).max(0.0);

        Duration::from_millis(capped as u64)
    }

    /// `attempt` counts the attempts already made
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
