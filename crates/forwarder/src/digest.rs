// SPDX-License-Identifier: MIT

//! Digest computation (§4.4): turns a closed receipt into a compact
//! string for the autopilot's `ORCHESTRATOR_UPDATE` inbox.

use agentbus_core::{Receipt, SignalKind};

use crate::config::DigestMode;

/// `reviewRequired` iff the completed task's kind was `EXECUTE`, its
/// outcome was `done`, and it left a non-empty commit reference.
pub fn review_required(receipt: &Receipt) -> bool {
    receipt.task.signals.kind == SignalKind::Execute
        && receipt.outcome.is_done()
        && receipt.commit_sha.as_deref().is_some_and(|s| !s.is_empty())
}

/// Builds the digest string handed to autopilot. `verbose` includes the
/// full note and commit reference; `compact` trims the note to
/// `max_chars`.
pub fn build_digest(receipt: &Receipt, mode: DigestMode, max_chars: usize) -> String {
    let root_id = receipt.task.signals.root_id.as_deref().unwrap_or("-");
    let commit = receipt.commit_sha.as_deref().unwrap_or("-");

    match mode {
        DigestMode::Verbose => format!(
            "source={} agent={} task={} root={} outcome={} commit={}\n{}",
            receipt.task.signals.kind, receipt.task.from, receipt.task.id, root_id, receipt.outcome, commit,
            receipt.note,
        ),
        DigestMode::Compact => {
            let note = trim_note(&receipt.note, max_chars);
            format!(
                "source={} agent={} task={} root={} outcome={} commit={} note={note}",
                receipt.task.signals.kind, receipt.task.from, receipt.task.id, root_id, receipt.outcome, commit,
            )
        }
    }
}

fn trim_note(note: &str, max_chars: usize) -> String {
    if note.chars().count() <= max_chars {
        return note.to_string();
    }
    let truncated: String = note.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{truncated}…")
}
