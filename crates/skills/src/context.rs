// SPDX-License-Identifier: MIT

//! Context snapshots handed to prompt assembly (§4.2.1). The Supervisor
//! builds these from git state and bus status before calling
//! [`crate::assemble_prompt`]; this crate only renders them.

#[derive(Debug, Clone, Default)]
pub struct OpenTaskSummary {
    pub id: String,
    pub title: String,
    pub agent: String,
}

#[derive(Debug, Clone, Default)]
pub struct ReceiptSummary {
    pub id: String,
    pub outcome: String,
    pub note: String,
}

/// Autopilot agents get `Full`; everyone else gets `Minimal`. A warm
/// resumed `ORCHESTRATOR_UPDATE` may downgrade an autopilot turn to
/// `Thin` to keep the prompt small on a hot path.
#[derive(Debug, Clone)]
pub enum ContextSnapshot {
    Minimal {
        workdir: String,
        branch: String,
        head: String,
    },
    Thin {
        workdir: String,
        branch: String,
        head: String,
    },
    Full {
        workdir: String,
        branch: String,
        head: String,
        git_status: String,
        status_summary: String,
        recent_receipts: Vec<ReceiptSummary>,
        open_tasks: Vec<OpenTaskSummary>,
        continuity_ledger: String,
    },
}

impl ContextSnapshot {
    pub fn render(&self) -> String {
        match self {
            ContextSnapshot::Minimal { workdir, branch, head }
            | ContextSnapshot::Thin { workdir, branch, head } => {
                format!("# Context\nworkdir: {workdir}\nbranch: {branch}\nhead: {head}\n")
            }
            ContextSnapshot::Full {
                workdir,
                branch,
                head,
                git_status,
                status_summary,
                recent_receipts,
                open_tasks,
                continuity_ledger,
            } => {
                let mut out = format!(
                    "# Context\nworkdir: {workdir}\nbranch: {branch}\nhead: {head}\n\n## git status\n{git_status}\n\n## bus status\n{status_summary}\n"
                );
                if !open_tasks.is_empty() {
                    out.push_str("\n## open tasks\n");
                    for task in open_tasks {
                        out.push_str(&format!("- [{}] {} ({})\n", task.id, task.title, task.agent));
                    }
                }
                if !recent_receipts.is_empty() {
                    out.push_str("\n## recent receipts\n");
                    for receipt in recent_receipts {
                        out.push_str(&format!(
                            "- [{}] {}: {}\n",
                            receipt.id, receipt.outcome, receipt.note
                        ));
                    }
                }
                if !continuity_ledger.is_empty() {
                    out.push_str(&format!("\n## continuity\n{continuity_ledger}\n"));
                }
                out
            }
        }
    }
}
