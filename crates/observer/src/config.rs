// SPDX-License-Identifier: MIT

//! Observer configuration (§6.2): poll cadence and cold-start mode.
//! Cold-start mode is global to the observer instance, not per-source
//! (spec §9 Open Questions — current behavior preserved as-is).

use std::time::Duration;

use crate::state::ColdStartMode;

#[derive(Debug, Clone)]
pub struct ObserverConfig {
    pub poll_interval: Duration,
    pub cold_start_mode: ColdStartMode,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            cold_start_mode: ColdStartMode::Baseline,
        }
    }
}
