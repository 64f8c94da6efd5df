// SPDX-License-Identifier: MIT

//! Errors surfaced by the Orchestrator Forwarder loop.

use agentbus_core::BusError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForwarderError {
    #[error(transparent)]
    Bus(#[from] BusError),
}
