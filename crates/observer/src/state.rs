// SPDX-License-Identifier: MIT

//! Per-source cold-start state (spec §4.5):
//! `state/observer/<source>/<id>.json` holding `{watermark, seen_ids,
//! mode}`. One file per source, not per item — `id` in the path is the
//! source name, already sanitized by the caller.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use agentbus_core::BusError;
use serde::{Deserialize, Serialize};

use agentbus_store::atomic;

/// Governs what happens the first time a source is observed (no
/// persisted state yet). `Baseline` (the default) seeds `seen_ids`
/// without emitting anything; `Replay` emits every currently-open item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColdStartMode {
    Baseline,
    Replay,
}

impl Default for ColdStartMode {
    fn default() -> Self {
        Self::Baseline
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObserverState {
    /// Most recent item's `created_at_ms`, kept for diagnostics; `seen_ids`
    /// is the authoritative membership test.
    pub watermark: Option<u64>,
    pub seen_ids: HashSet<String>,
    pub mode: ColdStartMode,
}

/// Reads and writes one state file per source under `state/observer/`.
pub struct ObserverStateStore {
    state_dir: PathBuf,
}

impl ObserverStateStore {
    pub fn new(bus_root: impl AsRef<Path>) -> Self {
        Self {
            state_dir: bus_root.as_ref().join("state").join("observer"),
        }
    }

    fn path(&self, source: &str) -> PathBuf {
        self.state_dir.join(source).join("state.json")
    }

    pub fn load(&self, source: &str) -> Result<Option<ObserverState>, BusError> {
        atomic::read_json(&self.path(source))
    }

    pub fn save(&self, source: &str, state: &ObserverState) -> Result<(), BusError> {
        atomic::write_json_atomic(&self.path(source), state)
    }
}
