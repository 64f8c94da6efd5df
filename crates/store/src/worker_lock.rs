// SPDX-License-Identifier: MIT

//! Per-agent Worker Lock (spec §3, §4.2 step 1): at most one Supervisor
//! instance may hold it; others exit on startup with a clear diagnostic.
//! A stale lock (pid no longer alive) is never rotated automatically —
//! only operator tooling may remove it (`WorkerLock::force_release`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::atomic;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockRecord {
    pub pid: u32,
    pub acquired_at_ms: u64,
}

#[derive(Debug, Error)]
pub enum WorkerLockError {
    #[error("worker lock for {agent} already held by pid {pid}")]
    AlreadyHeld { agent: String, pid: u32 },
    #[error(transparent)]
    Bus(#[from] agentbus_core::BusError),
}

/// An acquired lock; releases (deletes the lock file) on drop.
pub struct WorkerLock {
    path: PathBuf,
    released: bool,
}

impl WorkerLock {
    fn lock_path(state_dir: &Path, agent: &str) -> PathBuf {
        state_dir.join("worker-locks").join(format!("{agent}.lock.json"))
    }

    /// Acquire the lock for `agent`. Fails if a lock file already exists —
    /// staleness is never judged or rotated here; see `force_release`.
    pub fn acquire(
        state_dir: &Path,
        agent: &str,
        pid: u32,
        acquired_at_ms: u64,
    ) -> Result<Self, WorkerLockError> {
        let path = Self::lock_path(state_dir, agent);

        if let Some(existing) = atomic::read_json::<LockRecord>(&path)? {
            return Err(WorkerLockError::AlreadyHeld {
                agent: agent.to_string(),
                pid: existing.pid,
            });
        }

        let record = LockRecord { pid, acquired_at_ms };
        atomic::write_json_atomic(&path, &record)?;
        Ok(WorkerLock {
            path,
            released: false,
        })
    }

    pub fn release(mut self) {
        let _ = std::fs::remove_file(&self.path);
        self.released = true;
    }

    /// Operator-only escape hatch: removes a stale lock unconditionally.
    /// Never called from the Supervisor's own startup path.
    pub fn force_release(state_dir: &Path, agent: &str) -> Result<(), WorkerLockError> {
        let path = Self::lock_path(state_dir, agent);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(agentbus_core::BusError::from(e).into()),
        }
    }
}

impl Drop for WorkerLock {
    fn drop(&mut self) {
        if !self.released {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
