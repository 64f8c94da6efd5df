// SPDX-License-Identifier: MIT

//! The Forwarder loop (§4.4): polls the orchestrator's inbox like any
//! other agent, translating `TASK_COMPLETE` and `REVIEW_ACTION_REQUIRED`
//! packets into digests for autopilot.

use std::sync::Arc;

use agentbus_core::{
    BusError, Clock, IdGen, InboxState, Outcome, PacketMeta, Priority, Receipt, SignalKind,
    Signals, TaskId,
};
use agentbus_store::BusStore;

use crate::config::ForwarderConfig;
use crate::digest::{build_digest, review_required};
use crate::error::ForwarderError;

const ORCHESTRATOR: &str = "orchestrator";
const AUTOPILOT: &str = "autopilot";
const OPERATOR: &str = "operator";

pub struct ForwarderLoop<G: IdGen, C: Clock> {
    store: Arc<BusStore<G, C>>,
    config: ForwarderConfig,
}

impl<G: IdGen, C: Clock> ForwarderLoop<G, C> {
    pub fn new(store: Arc<BusStore<G, C>>, config: ForwarderConfig) -> Self {
        Self { store, config }
    }

    pub async fn run(&self) -> Result<(), ForwarderError> {
        loop {
            if let Err(e) = self.poll_once().await {
                tracing::warn!(error = %e, "forwarder poll cycle failed");
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    pub async fn poll_once(&self) -> Result<usize, ForwarderError> {
        let mut ids = self
            .store
            .list_inbox_by_mtime(ORCHESTRATOR, InboxState::InProgress)?;
        for state in [InboxState::New, InboxState::Seen] {
            for id in self.store.list_inbox_by_mtime(ORCHESTRATOR, state)? {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        let count = ids.len();
        for id in ids {
            self.process_one(&id).await?;
        }
        Ok(count)
    }

    async fn process_one(&self, id: &TaskId) -> Result<(), ForwarderError> {
        let claimed = match self.store.claim(ORCHESTRATOR, id.as_str()) {
            Ok(claimed) => claimed,
            Err(BusError::ClaimConflict(_)) | Err(BusError::AlreadyProcessed(_)) => return Ok(()),
            Err(BusError::NotFound(_)) => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        match claimed.meta.signals.kind {
            SignalKind::TaskComplete => self.handle_task_complete(&claimed.meta)?,
            SignalKind::ReviewActionRequired => self.handle_review_action_required(&claimed.meta)?,
            _ => {}
        }

        let receipt = Receipt::new(Outcome::Done, "forwarded", claimed.meta.clone());
        self.store.close(ORCHESTRATOR, id.as_str(), receipt, false)?;
        Ok(())
    }

    fn handle_task_complete(&self, meta: &PacketMeta) -> Result<(), ForwarderError> {
        let Some(source_agent) = meta.references.get("sourceAgent") else {
            return Ok(());
        };
        let Some(task_id) = meta.references.get("taskId") else {
            return Ok(());
        };

        let receipt = match self.store.read_receipt(source_agent, task_id) {
            Ok(receipt) => receipt,
            Err(BusError::NotFound(_)) => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        if receipt.task.signals.kind == SignalKind::OrchestratorUpdate {
            if receipt.outcome.is_done() {
                // Loop-avoidance: a clean `ORCHESTRATOR_UPDATE` close
                // never gets forwarded back to autopilot.
                return Ok(());
            }
            let depth: u32 = receipt
                .task
                .references
                .get("remediationDepth")
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);
            if depth >= self.config.self_remediation_depth_cap {
                tracing::warn!(
                    task_id = %receipt.task.id,
                    depth,
                    "dropping self-remediation forward past the depth cap"
                );
                return Ok(());
            }
            self.forward_digest(&receipt, depth + 1)?;
            return Ok(());
        }

        self.forward_digest(&receipt, 0)
    }

    fn forward_digest(&self, receipt: &Receipt, remediation_depth: u32) -> Result<(), ForwarderError> {
        let digest = build_digest(receipt, self.config.digest_mode, self.config.max_digest_chars);
        let required = review_required(receipt);

        let mut signals = Signals::new(SignalKind::OrchestratorUpdate);
        signals.root_id = receipt.task.signals.root_id.clone();
        signals.parent_id = Some(receipt.task.id.to_string());

        let mut references = agentbus_core::References::new();
        references.insert("sourceAgent".to_string(), receipt.task.from.clone());
        references.insert("sourceTaskId".to_string(), receipt.task.id.to_string());
        references.insert("reviewRequired".to_string(), required.to_string());
        if remediation_depth > 0 {
            references.insert("remediationDepth".to_string(), remediation_depth.to_string());
        }

        let meta = PacketMeta {
            id: self.store.next_id(),
            to: vec![AUTOPILOT.to_string()],
            from: ORCHESTRATOR.to_string(),
            priority: if required { Priority::P1 } else { Priority::P2 },
            title: format!("{} completed {}", receipt.task.from, receipt.task.id),
            signals,
            references,
        };
        self.store.deliver(&meta, &digest)?;

        if required && self.config.notify_operator_on_review_required && self.store.roster().contains(OPERATOR) {
            let mut op_signals = Signals::new(SignalKind::Status);
            op_signals.root_id = receipt.task.signals.root_id.clone();
            let op_meta = PacketMeta {
                id: self.store.next_id(),
                to: vec![OPERATOR.to_string()],
                from: ORCHESTRATOR.to_string(),
                priority: Priority::P2,
                title: format!("review required: {}", receipt.task.id),
                signals: op_signals,
                references: Default::default(),
            };
            let _ = self.store.deliver(&op_meta, &digest);
        }
        Ok(())
    }

    fn handle_review_action_required(&self, meta: &PacketMeta) -> Result<(), ForwarderError> {
        let digest = format!(
            "review action required from {} (root {})\n{}",
            meta.from,
            meta.signals.root_id.as_deref().unwrap_or("-"),
            meta.title,
        );

        if let Some(existing) = self.find_coalesce_target(meta)? {
            self.store.update(AUTOPILOT, existing.as_str(), &format!("\n---\n{digest}"), None, None)?;
            return Ok(());
        }

        let mut signals = Signals::new(SignalKind::OrchestratorUpdate);
        signals.root_id = meta.signals.root_id.clone();
        signals.parent_id = Some(meta.id.to_string());

        let mut references = agentbus_core::References::new();
        references.insert("sourceAgent".to_string(), meta.from.clone());

        let digest_meta = PacketMeta {
            id: self.store.next_id(),
            to: vec![AUTOPILOT.to_string()],
            from: ORCHESTRATOR.to_string(),
            priority: Priority::P1,
            title: format!("review action required: {}", meta.title),
            signals,
            references,
        };
        self.store.deliver(&digest_meta, &digest)?;
        Ok(())
    }

    /// Finds an existing digest task on autopilot's open inboxes sharing
    /// `rootId` and originating `sourceAgent`, so repeated review-action
    /// packets coalesce by `update` instead of piling up new packets.
    fn find_coalesce_target(&self, meta: &PacketMeta) -> Result<Option<TaskId>, ForwarderError> {
        let Some(root_id) = &meta.signals.root_id else {
            return Ok(None);
        };
        let mut candidates: Vec<(std::time::SystemTime, TaskId)> = Vec::new();
        for state in [InboxState::InProgress, InboxState::Seen, InboxState::New] {
            for id in self.store.list_inbox(AUTOPILOT, state)? {
                let Ok(opened) = self.store.open(AUTOPILOT, id.as_str(), false) else {
                    continue;
                };
                if opened.meta.signals.kind != SignalKind::OrchestratorUpdate {
                    continue;
                }
                if opened.meta.signals.root_id.as_deref() != Some(root_id.as_str()) {
                    continue;
                }
                if opened.meta.references.get("sourceAgent").map(String::as_str) != Some(meta.from.as_str()) {
                    continue;
                }
                if let Ok(mtime) = std::fs::metadata(&opened.path).and_then(|m| m.modified()) {
                    candidates.push((mtime, opened.meta.id));
                }
            }
        }
        candidates.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(candidates.into_iter().next().map(|(_, id)| id))
    }
}
