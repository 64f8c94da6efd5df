// SPDX-License-Identifier: MIT

//! Builds the context snapshot prompt assembly is handed (§4.2.1).
//! Autopilot agents get `Full`; everyone else gets `Minimal`. A warm
//! resumed `ORCHESTRATOR_UPDATE` downgrades autopilot to `Thin`.

use std::path::Path;

use agentbus_core::{Clock, IdGen, InboxState};
use agentbus_skills::{ContextSnapshot, OpenTaskSummary, ReceiptSummary};
use agentbus_store::BusStore;

async fn git_output(cwd: &Path, args: &[&str]) -> String {
    match tokio::process::Command::new("git").args(args).current_dir(cwd).output().await {
        Ok(output) if output.status.success() => String::from_utf8_lossy(&output.stdout).trim().to_string(),
        _ => "unknown".to_string(),
    }
}

pub async fn minimal(cwd: &Path) -> ContextSnapshot {
    let branch = git_output(cwd, &["rev-parse", "--abbrev-ref", "HEAD"]).await;
    let head = git_output(cwd, &["rev-parse", "HEAD"]).await;
    ContextSnapshot::Minimal {
        workdir: cwd.display().to_string(),
        branch,
        head,
    }
}

pub async fn thin(cwd: &Path) -> ContextSnapshot {
    let branch = git_output(cwd, &["rev-parse", "--abbrev-ref", "HEAD"]).await;
    let head = git_output(cwd, &["rev-parse", "HEAD"]).await;
    ContextSnapshot::Thin {
        workdir: cwd.display().to_string(),
        branch,
        head,
    }
}

/// Builds the enlarged autopilot snapshot: git state, bus status
/// summary, recent receipts, and open tasks filtered by `root_id`.
pub async fn full<G: IdGen, C: Clock>(
    cwd: &Path,
    store: &BusStore<G, C>,
    root_id: Option<&str>,
    continuity_ledger: impl Into<String>,
) -> ContextSnapshot {
    let branch = git_output(cwd, &["rev-parse", "--abbrev-ref", "HEAD"]).await;
    let head = git_output(cwd, &["rev-parse", "HEAD"]).await;
    let git_status = git_output(cwd, &["status", "--porcelain"]).await;

    let status_summary = match store.status_summary() {
        Ok(summary) => render_status_summary(&summary),
        Err(e) => format!("status summary unavailable: {e}"),
    };

    let recent_receipts = store
        .recent_receipts(None, 10)
        .unwrap_or_default()
        .into_iter()
        .filter(|receipt| root_id.map_or(true, |r| receipt.task.signals.root_id.as_deref() == Some(r)))
        .map(|receipt| ReceiptSummary {
            id: format!("{}/{}", receipt.task.from, receipt.task.id),
            outcome: receipt.outcome.to_string(),
            note: receipt.note,
        })
        .collect();

    let open_tasks = open_tasks_for_root(store, root_id);

    ContextSnapshot::Full {
        workdir: cwd.display().to_string(),
        branch,
        head,
        git_status,
        status_summary,
        recent_receipts,
        open_tasks,
        continuity_ledger: continuity_ledger.into(),
    }
}

fn render_status_summary(summary: &agentbus_store::StatusSummary) -> String {
    let mut agents: Vec<_> = summary.keys().collect();
    agents.sort();
    agents
        .into_iter()
        .map(|agent| {
            let status = &summary[agent];
            format!(
                "{agent}: new={} seen={} in_progress={} processed={}",
                status.new, status.seen, status.in_progress, status.processed
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn open_tasks_for_root<G: IdGen, C: Clock>(
    store: &BusStore<G, C>,
    root_id: Option<&str>,
) -> Vec<OpenTaskSummary> {
    let mut tasks = Vec::new();
    for agent in store.roster().names() {
        for state in [InboxState::New, InboxState::Seen, InboxState::InProgress] {
            let Ok(ids) = store.list_inbox(agent, state) else {
                continue;
            };
            for id in ids {
                let Ok(opened) = store.open(agent, id.as_str(), false) else {
                    continue;
                };
                if root_id.map_or(true, |r| opened.meta.signals.root_id.as_deref() == Some(r)) {
                    tasks.push(OpenTaskSummary {
                        id: opened.meta.id.to_string(),
                        title: opened.meta.title,
                        agent: agent.to_string(),
                    });
                }
            }
        }
    }
    tasks
}
