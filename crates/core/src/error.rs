// SPDX-License-Identifier: MIT

//! The error taxonomy surfaced across every component boundary (spec §6.4).

use thiserror::Error;

/// Error kinds shared by the Bus Store, Worker Supervisor, Rate Coordinator,
/// Orchestrator Forwarder, and Observer. Kinds are identity; wire
/// representation (JSON, exit code, …) is a concern of each boundary, not
/// of this type.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("already processed: {0}")]
    AlreadyProcessed(String),

    #[error("claim conflict: {0}")]
    ClaimConflict(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("schema invalid: {0}")]
    SchemaInvalid(#[from] serde_json::Error),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("stream disconnected: {0}")]
    StreamDisconnected(String),

    #[error("turn timed out after {0:?}")]
    TurnTimeout(std::time::Duration),

    #[error("superseded by update at {0}ms")]
    Superseded(u64),

    #[error("dependency missing: {0}")]
    DependencyMissing(String),
}

impl BusError {
    /// Stable machine-readable kind, used in logs and receipts without
    /// exposing the full `Display` message.
    pub fn kind(&self) -> &'static str {
        match self {
            BusError::NotFound(_) => "not_found",
            BusError::AlreadyExists(_) => "already_exists",
            BusError::AlreadyProcessed(_) => "already_processed",
            BusError::ClaimConflict(_) => "claim_conflict",
            BusError::Io(_) => "io_error",
            BusError::SchemaInvalid(_) => "schema_invalid",
            BusError::RateLimited(_) => "rate_limited",
            BusError::StreamDisconnected(_) => "stream_disconnected",
            BusError::TurnTimeout(_) => "turn_timeout",
            BusError::Superseded(_) => "superseded",
            BusError::DependencyMissing(_) => "dependency_missing",
        }
    }
}
