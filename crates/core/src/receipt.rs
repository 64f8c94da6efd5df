// SPDX-License-Identifier: MIT

//! The Receipt closure record (spec §3, §6.1).

use crate::task::PacketMeta;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Done,
    NeedsReview,
    Blocked,
    Failed,
    Skipped,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Done => "done",
            Outcome::NeedsReview => "needs_review",
            Outcome::Blocked => "blocked",
            Outcome::Failed => "failed",
            Outcome::Skipped => "skipped",
        }
    }

    /// Whether this outcome represents a successful, non-downgraded close.
    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A closure record for one (agent, task) pair, written before the
/// packet is renamed into `processed` (spec §4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub outcome: Outcome,
    pub note: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,
    /// Snapshot of the closed packet's meta.
    pub task: PacketMeta,
    /// Opaque structured output from the agent, including any follow-ups
    /// the supervisor dispatched and errors it encountered.
    #[serde(default)]
    pub receipt_extra: serde_json::Value,
}

impl Receipt {
    pub fn new(outcome: Outcome, note: impl Into<String>, task: PacketMeta) -> Self {
        Self {
            outcome,
            note: note.into(),
            commit_sha: None,
            task,
            receipt_extra: serde_json::Value::Null,
        }
    }

    pub fn with_commit_sha(mut self, sha: impl Into<String>) -> Self {
        self.commit_sha = Some(sha.into());
        self
    }

    pub fn with_receipt_extra(mut self, extra: serde_json::Value) -> Self {
        self.receipt_extra = extra;
        self
    }
}
