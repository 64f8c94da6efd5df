// SPDX-License-Identifier: MIT

//! Global Semaphore (spec §3, §4.3): a directory of lease files bounding
//! the number of in-flight turns across every worker, in-process or not.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use agentbus_core::BusError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseRecord {
    pub holder: String,
    pub acquired_at_ms: u64,
}

/// A held slot; releasing deletes the lease file. Dropping without an
/// explicit `release` also frees the slot, tolerant of the file already
/// being gone (another process may have reaped it as stale).
pub struct Lease {
    path: PathBuf,
    released: bool,
}

impl Lease {
    pub fn release(mut self) {
        let _ = fs::remove_file(&self.path);
        self.released = true;
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if !self.released {
            let _ = fs::remove_file(&self.path);
        }
    }
}

pub struct Semaphore {
    dir: PathBuf,
    max_slots: usize,
}

impl Semaphore {
    pub fn new(bus_root: impl Into<PathBuf>, max_slots: usize) -> Self {
        Self {
            dir: bus_root.into().join("state").join("semaphore"),
            max_slots,
        }
    }

    fn lease_count(&self) -> usize {
        fs::read_dir(&self.dir).map(|d| d.flatten().count()).unwrap_or(0)
    }

    /// Attempts one acquisition without waiting; `Ok(None)` means every
    /// slot is currently occupied. Fairness is best-effort: a burst of
    /// callers may acquire out of arrival order.
    pub fn try_acquire(
        &self,
        holder: &str,
        acquired_at_ms: u64,
    ) -> Result<Option<Lease>, BusError> {
        fs::create_dir_all(&self.dir)?;
        if self.lease_count() >= self.max_slots {
            return Ok(None);
        }
        let path = self.dir.join(format!("{}.json", uuid::Uuid::new_v4()));
        let record = LeaseRecord {
            holder: holder.to_string(),
            acquired_at_ms,
        };
        let bytes = serde_json::to_vec_pretty(&record)?;
        match agentbus_store::atomic::create_exclusive(&path, &bytes) {
            Ok(()) => Ok(Some(Lease {
                path,
                released: false,
            })),
            Err(BusError::Io(e)) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Retries with small randomized jitter until a slot opens up.
    pub async fn acquire(
        &self,
        holder: &str,
        acquired_at_ms: u64,
        retry_jitter_max_ms: u64,
    ) -> Result<Lease, BusError> {
        loop {
            if let Some(lease) = self.try_acquire(holder, acquired_at_ms)? {
                return Ok(lease);
            }
            let jitter = if retry_jitter_max_ms == 0 {
                50
            } else {
                rand::random::<u64>() % retry_jitter_max_ms
            };
            tokio::time::sleep(Duration::from_millis(jitter.max(10))).await;
        }
    }

    /// Operator-tooling-only: removes lease files older than `ttl_ms`
    /// relative to `now_ms`, returning the count reaped. Never called
    /// automatically from a worker.
    pub fn reap_stale(&self, now_ms: u64, ttl_ms: u64) -> Result<usize, BusError> {
        let mut reaped = 0;
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Ok(0);
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if let Ok(Some(record)) =
                agentbus_store::atomic::read_json::<LeaseRecord>(&path)
            {
                if now_ms.saturating_sub(record.acquired_at_ms) > ttl_ms {
                    let _ = fs::remove_file(&path);
                    reaped += 1;
                }
            }
        }
        Ok(reaped)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
