// SPDX-License-Identifier: MIT

//! Errors surfaced by the Observer loop.

use agentbus_core::BusError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObserverError {
    #[error(transparent)]
    Bus(#[from] BusError),
    #[error("review source {0} failed: {1}")]
    Source(String, String),
}
