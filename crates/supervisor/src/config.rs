// SPDX-License-Identifier: MIT

//! Supervisor configuration (§6.2): every option has a deterministic
//! default and maps to one observable effect.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub poll_interval: Duration,
    pub supersede_poll_interval: Duration,
    pub turn_timeout: Duration,
    pub kill_grace: Duration,
    /// Bounded retries for transient turn errors (rate-limit, stream
    /// disconnect) before giving up and closing `failed`.
    pub max_transient_retries: u32,
    pub retry_base_ms: u64,
    pub retry_max_ms: u64,
    pub retry_jitter_max_ms: u64,
    pub rate_limit_min_cooldown_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(300),
            supersede_poll_interval: Duration::from_millis(1000),
            turn_timeout: Duration::from_secs(3 * 3600),
            kill_grace: Duration::from_secs(10),
            max_transient_retries: 5,
            retry_base_ms: 1_000,
            retry_max_ms: 60_000,
            retry_jitter_max_ms: 2_000,
            rate_limit_min_cooldown_ms: 30_000,
        }
    }
}

impl SupervisorConfig {
    /// Exponential backoff with a cap, for the `attempt`-th (0-indexed)
    /// transient retry. Jitter is added by the caller.
    pub fn backoff_ms(&self, attempt: u32) -> u64 {
        let exp = self.retry_base_ms.saturating_mul(1u64 << attempt.min(20));
        exp.min(self.retry_max_ms)
    }
}
