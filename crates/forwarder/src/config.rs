// SPDX-License-Identifier: MIT

//! Forwarder configuration (§6.2): digest verbosity and the
//! self-remediation depth cap.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestMode {
    Compact,
    Verbose,
}

#[derive(Debug, Clone)]
pub struct ForwarderConfig {
    pub poll_interval: Duration,
    pub digest_mode: DigestMode,
    /// Compact mode trims the note to this many characters.
    pub max_digest_chars: usize,
    /// Cap on `ORCHESTRATOR_UPDATE` self-remediation forwards (§4.4).
    pub self_remediation_depth_cap: u32,
    /// Whether a `reviewRequired` digest is also copied to the operator.
    pub notify_operator_on_review_required: bool,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(300),
            digest_mode: DigestMode::Compact,
            max_digest_chars: 240,
            self_remediation_depth_cap: 1,
            notify_operator_on_review_required: true,
        }
    }
}
