// SPDX-License-Identifier: MIT

//! Global Cooldown Record (spec §3, §4.3): a single file workers read
//! before spawning a turn. Concurrent writers take `max(retryAtMs)`.

use std::path::PathBuf;

use agentbus_core::{BusError, Clock};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CooldownRecord {
    pub retry_at_ms: u64,
    pub reason: String,
    pub source_agent: String,
    pub task_id: String,
}

pub struct CooldownCoordinator<C: Clock> {
    path: PathBuf,
    clock: C,
}

impl<C: Clock> CooldownCoordinator<C> {
    pub fn new(bus_root: impl Into<PathBuf>, clock: C) -> Self {
        Self {
            path: bus_root.into().join("state").join("cooldown.json"),
            clock,
        }
    }

    /// The in-effect record, or `None` if absent or expired. Expired
    /// records are treated as absent, never deleted — the next `record`
    /// call overwrites them via `max`.
    pub fn current(&self) -> Result<Option<CooldownRecord>, BusError> {
        let Some(record) = agentbus_store::atomic::read_json::<CooldownRecord>(&self.path)?
        else {
            return Ok(None);
        };
        if record.retry_at_ms <= self.clock.epoch_ms() {
            Ok(None)
        } else {
            Ok(Some(record))
        }
    }

    /// Records a cooldown, taking `max(retryAtMs)` against whatever is
    /// currently on disk (expired or not) so a write never regresses an
    /// in-flight, still-valid cooldown from another writer.
    pub fn record(
        &self,
        retry_at_ms: u64,
        reason: impl Into<String>,
        source_agent: impl Into<String>,
        task_id: impl Into<String>,
    ) -> Result<CooldownRecord, BusError> {
        let existing = agentbus_store::atomic::read_json::<CooldownRecord>(&self.path)?;
        let retry_at_ms = existing
            .as_ref()
            .map_or(retry_at_ms, |e| e.retry_at_ms.max(retry_at_ms));
        let record = CooldownRecord {
            retry_at_ms,
            reason: reason.into(),
            source_agent: source_agent.into(),
            task_id: task_id.into(),
        };
        agentbus_store::atomic::write_json_atomic(&self.path, &record)?;
        tracing::warn!(
            retry_at_ms = record.retry_at_ms,
            reason = %record.reason,
            "recorded global cooldown"
        );
        Ok(record)
    }

    /// Blocks the caller (with small randomized jitter) until the
    /// in-effect cooldown, if any, has elapsed. Uses wall-clock sleeping
    /// regardless of the injected `Clock`, since this is a real-time wait.
    pub async fn wait(&self, jitter_max_ms: u64) -> Result<(), BusError> {
        loop {
            let Some(record) = self.current()? else {
                return Ok(());
            };
            let now = self.clock.epoch_ms();
            let remaining = record.retry_at_ms.saturating_sub(now);
            if remaining == 0 {
                return Ok(());
            }
            let jitter = if jitter_max_ms == 0 {
                0
            } else {
                rand::random::<u64>() % jitter_max_ms
            };
            tokio::time::sleep(std::time::Duration::from_millis(remaining + jitter)).await;
        }
    }
}
