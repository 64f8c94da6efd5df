// SPDX-License-Identifier: MIT

//! The typed signal envelope carried by every packet (spec §3).

use serde::{Deserialize, Serialize};

/// The kind of a packet, driving skill selection (§4.2.1), forwarder
/// rules (§4.4), and observer emission (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalKind {
    UserRequest,
    PlanRequest,
    Execute,
    OrchestratorUpdate,
    TaskComplete,
    ReviewActionRequired,
    Status,
    OpusConsultRequest,
    OpusConsultResponse,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::UserRequest => "USER_REQUEST",
            SignalKind::PlanRequest => "PLAN_REQUEST",
            SignalKind::Execute => "EXECUTE",
            SignalKind::OrchestratorUpdate => "ORCHESTRATOR_UPDATE",
            SignalKind::TaskComplete => "TASK_COMPLETE",
            SignalKind::ReviewActionRequired => "REVIEW_ACTION_REQUIRED",
            SignalKind::Status => "STATUS",
            SignalKind::OpusConsultRequest => "OPUS_CONSULT_REQUEST",
            SignalKind::OpusConsultResponse => "OPUS_CONSULT_RESPONSE",
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Signals envelope embedded in every packet's meta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signals {
    pub kind: SignalKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    /// Workflow identity shared by every packet in one logical flow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_id: Option<String>,
    /// Direct lineage: the id of the packet this one was dispatched from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Fast-path flag: skip skill invocation during prompt assembly.
    #[serde(default)]
    pub smoke: bool,
    /// Suppresses `TASK_COMPLETE` emission on close when `false`.
    #[serde(default = "default_true")]
    pub notify_orchestrator: bool,
}

fn default_true() -> bool {
    true
}

impl Signals {
    pub fn new(kind: SignalKind) -> Self {
        Self {
            kind,
            phase: None,
            root_id: None,
            parent_id: None,
            smoke: false,
            notify_orchestrator: true,
        }
    }

    pub fn with_root_id(mut self, root_id: impl Into<String>) -> Self {
        self.root_id = Some(root_id.into());
        self
    }

    pub fn with_parent_id(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }
}

/// Shallow-merge patch applied by `update` (spec §4.1).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smoke: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_orchestrator: Option<bool>,
}

impl Signals {
    /// Apply a shallow-merge patch in place, keeping any field the patch
    /// leaves absent.
    pub fn apply_patch(&mut self, patch: SignalsPatch) {
        if let Some(phase) = patch.phase {
            self.phase = Some(phase);
        }
        if let Some(root_id) = patch.root_id {
            self.root_id = Some(root_id);
        }
        if let Some(parent_id) = patch.parent_id {
            self.parent_id = Some(parent_id);
        }
        if let Some(smoke) = patch.smoke {
            self.smoke = smoke;
        }
        if let Some(notify) = patch.notify_orchestrator {
            self.notify_orchestrator = notify;
        }
    }
}
