// SPDX-License-Identifier: MIT

//! Errors surfaced by the Worker Supervisor loop.

use agentbus_core::{BusError, RosterError};
use agentbus_runner::RunnerError;
use agentbus_store::WorkerLockError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("worker lock: {0}")]
    WorkerLock(#[from] WorkerLockError),
    #[error(transparent)]
    Bus(#[from] BusError),
    #[error(transparent)]
    Runner(#[from] RunnerError),
    #[error(transparent)]
    Roster(#[from] RosterError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("agent {0} has no configured turn-runner command")]
    MissingCommand(String),
}
