// SPDX-License-Identifier: MIT

//! Tracing setup: non-blocking file appender plus an env filter, the same
//! shape as every other long-running process in this workspace.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn init(log_path: &Path) -> std::io::Result<WorkerGuard> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = log_path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = log_path
        .file_name()
        .map(|n| n.to_owned())
        .unwrap_or_else(|| "agentbusd.log".into());
    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).json())
        .init();

    Ok(guard)
}
