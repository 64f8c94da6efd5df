// SPDX-License-Identifier: MIT

//! Shared test builders for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::signals::{SignalKind, Signals};
use crate::task::{PacketMeta, Priority, TaskId};

/// Build a minimal, valid packet meta for a given kind — the common case
/// in tests that don't care about the exact title/body content.
pub fn packet_meta(id: &str, from: &str, to: &str, kind: SignalKind) -> PacketMeta {
    PacketMeta {
        id: TaskId::new(id),
        to: vec![to.to_string()],
        from: from.to_string(),
        priority: Priority::P2,
        title: format!("{kind} for {to}"),
        signals: Signals::new(kind),
        references: Default::default(),
    }
}

pub fn packet_meta_broadcast(id: &str, from: &str, to: &[&str], kind: SignalKind) -> PacketMeta {
    PacketMeta {
        id: TaskId::new(id),
        to: to.iter().map(|s| s.to_string()).collect(),
        from: from.to_string(),
        priority: Priority::P2,
        title: format!("{kind} broadcast"),
        signals: Signals::new(kind),
        references: Default::default(),
    }
}
