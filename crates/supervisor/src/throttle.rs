// SPDX-License-Identifier: MIT

//! Status-packet throttling (§7): timeouts surface a status packet to
//! the operator inbox, throttled per (agent, title) to avoid spam.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;

/// Default throttle window: one status packet per (agent, title) per
/// ten minutes.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(600);

#[derive(Default)]
pub struct StatusThrottle {
    window: Duration,
    last_sent_ms: Mutex<HashMap<(String, String), u64>>,
}

impl StatusThrottle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_sent_ms: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` if a status packet for (agent, title) may be sent
    /// at `now_ms`, recording the send so subsequent calls within the
    /// window are suppressed.
    pub fn try_send(&self, agent: &str, title: &str, now_ms: u64) -> bool {
        let key = (agent.to_string(), title.to_string());
        let mut last_sent = self.last_sent_ms.lock();
        match last_sent.get(&key) {
            Some(&last) if now_ms.saturating_sub(last) < self.window.as_millis() as u64 => false,
            _ => {
                last_sent.insert(key, now_ms);
                true
            }
        }
    }
}
