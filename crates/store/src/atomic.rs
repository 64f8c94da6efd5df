// SPDX-License-Identifier: MIT

//! Atomic filesystem primitives shared by every on-disk store in this
//! workspace: write-tmp-then-rename, and exclusive-create-as-mutex.
//!
//! Rename is the only state-changing primitive the core relies on. A
//! crash between steps leaves the prior file untouched; the rename
//! itself is atomic on a single local filesystem, so readers never see
//! a half-written file.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use agentbus_core::BusError;

/// Write `bytes` to `path` via a sibling `.tmp` file and an atomic
/// rename. Creates parent directories as needed.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), BusError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = tmp_sibling(path);
    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Serialize `value` as JSON and write it atomically.
pub fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), BusError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &bytes)
}

/// Read and deserialize a JSON file, returning `Ok(None)` if it is absent.
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, BusError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Create `path` exclusively, failing if it already exists. Used as a
/// directory-as-mutex / `O_EXCL`-equivalent primitive for semaphore
/// leases and worker locks.
pub fn create_exclusive(path: &Path, bytes: &[u8]) -> Result<(), BusError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!(".{file_name}.tmp"))
}
