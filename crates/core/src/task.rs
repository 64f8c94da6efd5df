// SPDX-License-Identifier: MIT

//! The Task/packet data model (spec §3) and the inbox state machine.

use crate::signals::Signals;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

crate::define_id! {
    /// Globally unique, monotonic-prefixed (wall-clock + random suffix) task id.
    pub struct TaskId;
}

/// Ordering hint only — priority never changes claim semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    P1,
    P2,
    P3,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::P1 => write!(f, "P1"),
            Priority::P2 => write!(f, "P2"),
            Priority::P3 => write!(f, "P3"),
        }
    }
}

/// Free-form cross-packet pointer map (receipt path, commit id, source
/// agent, workflow identifiers, …). Deliberately untyped: the core does
/// not interpret these values, it only carries them.
pub type References = HashMap<String, String>;

/// The JSON object stored between the two delimiter lines of a packet
/// file (spec §6.1). The body text is kept out of this struct since it
/// is appended to, not merged, by `update`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacketMeta {
    pub id: TaskId,
    /// Non-empty set of recipient agent names. A delivered packet exists
    /// once per recipient.
    pub to: Vec<String>,
    pub from: String,
    pub priority: Priority,
    pub title: String,
    pub signals: Signals,
    #[serde(default)]
    pub references: References,
}

impl PacketMeta {
    pub fn is_valid(&self) -> bool {
        !self.to.is_empty() && !self.title.is_empty()
    }
}

/// Identity of the directory a packet currently lives in. State identity
/// IS the containing directory — there is no separate status field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InboxState {
    New,
    Seen,
    InProgress,
    Processed,
}

impl InboxState {
    /// The on-disk directory name for this state.
    pub fn dir_name(&self) -> &'static str {
        match self {
            InboxState::New => "new",
            InboxState::Seen => "seen",
            InboxState::InProgress => "in_progress",
            InboxState::Processed => "processed",
        }
    }

    pub const ALL: [InboxState; 4] = [
        InboxState::New,
        InboxState::Seen,
        InboxState::InProgress,
        InboxState::Processed,
    ];
}

impl fmt::Display for InboxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}
