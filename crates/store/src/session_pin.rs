// SPDX-License-Identifier: MIT

//! Task-session pin (spec §3, §4.2.2): maps (agent, task) and (agent,
//! rootId) to an LLM thread id, so a restart of the same task resumes the
//! same conversation instead of starting a fresh one.

use serde::{Deserialize, Serialize};
use std::path::Path;

use agentbus_core::BusError;

use crate::atomic;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionPin {
    pub thread_id: String,
    pub pinned_at_ms: u64,
}

/// Reads and writes the per-task and per-root session pin files under
/// `state/codex-task-sessions/<agent>/<id>.json` and
/// `state/codex-root-sessions/<agent>/<rootId>.json` (spec §6.1 layout).
pub struct SessionPins {
    state_dir: std::path::PathBuf,
}

impl SessionPins {
    pub fn new(bus_root: impl AsRef<Path>) -> Self {
        Self {
            state_dir: bus_root.as_ref().join("state"),
        }
    }

    fn task_path(&self, agent: &str, task_id: &str) -> std::path::PathBuf {
        self.state_dir
            .join("codex-task-sessions")
            .join(agent)
            .join(format!("{task_id}.json"))
    }

    fn root_path(&self, agent: &str, root_id: &str) -> std::path::PathBuf {
        self.state_dir
            .join("codex-root-sessions")
            .join(agent)
            .join(format!("{root_id}.json"))
    }

    pub fn task_pin(&self, agent: &str, task_id: &str) -> Result<Option<SessionPin>, BusError> {
        atomic::read_json(&self.task_path(agent, task_id))
    }

    pub fn pin_task(
        &self,
        agent: &str,
        task_id: &str,
        pin: &SessionPin,
    ) -> Result<(), BusError> {
        atomic::write_json_atomic(&self.task_path(agent, task_id), pin)
    }

    pub fn root_pin(&self, agent: &str, root_id: &str) -> Result<Option<SessionPin>, BusError> {
        atomic::read_json(&self.root_path(agent, root_id))
    }

    /// Pins `root_id` to a thread only if unset — the first-created
    /// thread for an autopilot's workflow stays its session (spec §4.2.2)
    /// unless a pin already exists.
    pub fn pin_root_if_absent(
        &self,
        agent: &str,
        root_id: &str,
        pin: &SessionPin,
    ) -> Result<(), BusError> {
        if self.root_pin(agent, root_id)?.is_none() {
            atomic::write_json_atomic(&self.root_path(agent, root_id), pin)?;
        }
        Ok(())
    }
}
