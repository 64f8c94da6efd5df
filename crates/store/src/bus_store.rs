// SPDX-License-Identifier: MIT

//! The Bus Store (spec §4.1): on-disk representation of tasks and
//! receipts. Every other component is a client of this module.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use agentbus_core::{
    BusError, Clock, IdGen, InboxState, PacketMeta, Priority, Receipt, References, Roster,
    SignalKind, Signals, SignalsPatch, TaskId,
};

use crate::atomic;
use crate::packet_file::Packet;

/// A packet together with the path it currently lives at.
#[derive(Debug, Clone)]
pub struct OpenedPacket {
    pub meta: PacketMeta,
    pub body: String,
    pub path: PathBuf,
    pub state: InboxState,
}

/// Per-agent inbox counts plus the most recent receipt outcome, as
/// returned by `statusSummary`.
#[derive(Debug, Clone, Default)]
pub struct AgentStatus {
    pub new: usize,
    pub seen: usize,
    pub in_progress: usize,
    pub processed: usize,
    pub latest_receipt: Option<Receipt>,
}

pub type StatusSummary = HashMap<String, AgentStatus>;

/// Bus Store: a filesystem root plus the roster it validates deliveries
/// against. Generic over id generation and clock so tests can run with
/// deterministic, sequential ids and a fake clock.
pub struct BusStore<G: IdGen, C: Clock> {
    root: PathBuf,
    roster: Roster,
    id_gen: G,
    clock: C,
}

/// Production alias: the shape every long-running process constructs.
pub type Store = BusStore<agentbus_core::RandomIdGen, agentbus_core::SystemClock>;

impl<G: IdGen, C: Clock> BusStore<G, C> {
    pub fn open(
        root: impl Into<PathBuf>,
        roster: Roster,
        id_gen: G,
        clock: C,
    ) -> Result<Self, BusError> {
        let root = root.into();
        for sub in ["inbox", "receipts", "artifacts", "state"] {
            fs::create_dir_all(root.join(sub))?;
        }
        Ok(Self {
            root,
            roster,
            id_gen,
            clock,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Mints a fresh task id, for callers that build packets outside of
    /// `close`'s own `TASK_COMPLETE` emission (follow-up dispatch, the
    /// forwarder's digest packets).
    pub fn next_id(&self) -> TaskId {
        TaskId::new(self.id_gen.next(self.clock.epoch_ms()))
    }

    fn inbox_state_dir(&self, agent: &str, state: InboxState) -> PathBuf {
        self.root
            .join("inbox")
            .join(agent)
            .join(state.dir_name())
    }

    fn receipts_dir(&self, agent: &str) -> PathBuf {
        self.root.join("receipts").join(agent)
    }

    fn receipt_path(&self, agent: &str, id: &str) -> PathBuf {
        self.receipts_dir(agent).join(format!("{id}.json"))
    }

    /// `{taskId}[__suffix].md`; the id prefix before `__` is authoritative.
    fn file_name(id: &str, suffix: Option<&str>) -> String {
        match suffix {
            Some(suffix) => format!("{id}__{suffix}.md"),
            None => format!("{id}.md"),
        }
    }

    /// Finds the single file for (agent, id) across every state directory,
    /// ignoring any `__suffix` decoration. Per the exactly-one-state
    /// invariant this must match at most one entry.
    fn locate(&self, agent: &str, id: &str) -> Result<(InboxState, PathBuf), BusError> {
        let prefix_bare = format!("{id}.md");
        let prefix_suffixed = format!("{id}__");
        for state in InboxState::ALL {
            let dir = self.inbox_state_dir(agent, state);
            let Ok(entries) = fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if name == prefix_bare || name.starts_with(&prefix_suffixed) {
                    return Ok((state, entry.path()));
                }
            }
        }
        Err(BusError::NotFound(format!("{agent}/{id}")))
    }

    fn read_packet(path: &Path) -> Result<Packet, BusError> {
        let bytes = fs::read(path)?;
        Packet::decode(&bytes)
    }

    /// Writes `packet` to a single recipient's `new` directory. Idempotent
    /// by id: an existing file with identical encoded bytes is a no-op; an
    /// existing file with different bytes under any state is `already_exists`.
    fn deliver_to(
        &self,
        agent: &str,
        meta: &PacketMeta,
        body: &str,
        suffix: Option<&str>,
    ) -> Result<PathBuf, BusError> {
        let packet = Packet::new(meta.clone(), body);
        let encoded = packet.encode()?;

        if let Ok((_, existing_path)) = self.locate(agent, meta.id.as_str()) {
            let existing_bytes = fs::read(&existing_path)?;
            if existing_bytes == encoded {
                return Ok(existing_path);
            }
            return Err(BusError::AlreadyExists(format!(
                "{agent}/{}",
                meta.id
            )));
        }

        let path = self
            .inbox_state_dir(agent, InboxState::New)
            .join(Self::file_name(meta.id.as_str(), suffix));
        atomic::write_atomic(&path, &encoded)?;
        tracing::debug!(agent, task_id = %meta.id, "delivered packet");
        Ok(path)
    }

    /// Writes one file per recipient in `meta.to` into `new`.
    pub fn deliver(&self, meta: &PacketMeta, body: &str) -> Result<Vec<PathBuf>, BusError> {
        meta.to
            .iter()
            .map(|agent| self.deliver_to(agent, meta, body, None))
            .collect()
    }

    /// Same as `deliver` but decorates every filename with `suffix`,
    /// allowing multiple logical copies of the same task id to coexist.
    pub fn deliver_with_suffix(
        &self,
        meta: &PacketMeta,
        body: &str,
        suffix: &str,
    ) -> Result<Vec<PathBuf>, BusError> {
        meta.to
            .iter()
            .map(|agent| self.deliver_to(agent, meta, body, Some(suffix)))
            .collect()
    }

    /// No ordering guarantee beyond mtime; callers sort when it matters.
    pub fn list_inbox(&self, agent: &str, state: InboxState) -> Result<Vec<TaskId>, BusError> {
        let dir = self.inbox_state_dir(agent, state);
        let Ok(entries) = fs::read_dir(&dir) else {
            return Ok(Vec::new());
        };
        let mut ids = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let Some(stem) = name.strip_suffix(".md") else {
                continue;
            };
            let id = stem.split("__").next().unwrap_or(stem);
            ids.push(TaskId::new(id));
        }
        Ok(ids)
    }

    /// Same as `list_inbox` but sorted by mtime ascending, the ordering
    /// the Supervisor's poll loop relies on.
    pub fn list_inbox_by_mtime(
        &self,
        agent: &str,
        state: InboxState,
    ) -> Result<Vec<TaskId>, BusError> {
        let dir = self.inbox_state_dir(agent, state);
        let Ok(entries) = fs::read_dir(&dir) else {
            return Ok(Vec::new());
        };
        let mut dated = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy().into_owned();
            let Some(stem) = name.strip_suffix(".md") else {
                continue;
            };
            let id = stem.split("__").next().unwrap_or(stem).to_string();
            let mtime = entry.metadata().and_then(|m| m.modified()).ok();
            dated.push((mtime, id));
        }
        dated.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(dated.into_iter().map(|(_, id)| TaskId::new(id)).collect())
    }

    /// Returns the current packet for (agent, taskId) regardless of state.
    /// If `mark_seen` and the packet is in `new`, renames it to `seen`
    /// before returning.
    pub fn open(
        &self,
        agent: &str,
        id: &str,
        mark_seen: bool,
    ) -> Result<OpenedPacket, BusError> {
        let (state, mut path) = self.locate(agent, id)?;
        let mut state = state;
        if mark_seen && state == InboxState::New {
            let dest = self
                .inbox_state_dir(agent, InboxState::Seen)
                .join(path.file_name().expect("packet path always has a file name"));
            fs::create_dir_all(dest.parent().expect("dest has a parent"))?;
            fs::rename(&path, &dest)?;
            path = dest;
            state = InboxState::Seen;
        }
        let packet = Self::read_packet(&path)?;
        Ok(OpenedPacket {
            meta: packet.meta,
            body: packet.body,
            path,
            state,
        })
    }

    /// Atomic rename from `new`/`seen`/`in_progress` to `in_progress`.
    /// Idempotent if already `in_progress`. Fails `claim_conflict` if a
    /// racing claim won first; `already_processed` if already closed.
    pub fn claim(&self, agent: &str, id: &str) -> Result<OpenedPacket, BusError> {
        let (state, path) = self.locate(agent, id)?;
        match state {
            InboxState::InProgress => {
                let packet = Self::read_packet(&path)?;
                Ok(OpenedPacket {
                    meta: packet.meta,
                    body: packet.body,
                    path,
                    state,
                })
            }
            InboxState::Processed => Err(BusError::AlreadyProcessed(format!("{agent}/{id}"))),
            InboxState::New | InboxState::Seen => {
                let dest = self
                    .inbox_state_dir(agent, InboxState::InProgress)
                    .join(path.file_name().expect("packet path always has a file name"));
                fs::create_dir_all(dest.parent().expect("dest has a parent"))?;
                match fs::rename(&path, &dest) {
                    Ok(()) => {
                        let packet = Self::read_packet(&dest)?;
                        Ok(OpenedPacket {
                            meta: packet.meta,
                            body: packet.body,
                            path: dest,
                            state: InboxState::InProgress,
                        })
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        // Another caller's rename already moved the source;
                        // this is the "no lost claim" property in practice.
                        Err(BusError::ClaimConflict(format!("{agent}/{id}")))
                    }
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    /// Rewrites the packet in place with an appended body fragment and a
    /// shallow-merged signals/references patch. Bumps mtime. Allowed in
    /// any non-`processed` state.
    pub fn update(
        &self,
        agent: &str,
        id: &str,
        append_body: &str,
        signals_patch: Option<SignalsPatch>,
        references_patch: Option<References>,
    ) -> Result<(), BusError> {
        let (state, path) = self.locate(agent, id)?;
        if state == InboxState::Processed {
            return Err(BusError::AlreadyProcessed(format!("{agent}/{id}")));
        }
        let mut packet = Self::read_packet(&path)?;
        packet.append_body(append_body);
        if let Some(patch) = signals_patch {
            packet.meta.signals.apply_patch(patch);
        }
        if let Some(patch) = references_patch {
            packet.meta.references.extend(patch);
        }
        let encoded = packet.encode()?;
        atomic::write_atomic(&path, &encoded)?;
        tracing::debug!(agent, task_id = id, "updated packet");
        Ok(())
    }

    /// Writes a receipt, renames the packet to `processed`, and — unless
    /// suppressed — delivers a `TASK_COMPLETE` packet to the orchestrator.
    #[allow(clippy::too_many_arguments)]
    pub fn close(
        &self,
        agent: &str,
        id: &str,
        mut receipt: Receipt,
        notify_orchestrator: bool,
    ) -> Result<Option<PathBuf>, BusError> {
        let (state, path) = self.locate(agent, id)?;
        if state == InboxState::Processed {
            return Err(BusError::AlreadyProcessed(format!("{agent}/{id}")));
        }

        let receipt_path = self.receipt_path(agent, id);
        receipt.task = Self::read_packet(&path)?.meta;
        atomic::write_json_atomic(&receipt_path, &receipt)?;

        let dest = self
            .inbox_state_dir(agent, InboxState::Processed)
            .join(path.file_name().expect("packet path always has a file name"));
        fs::create_dir_all(dest.parent().expect("dest has a parent"))?;
        fs::rename(&path, &dest)?;
        tracing::info!(agent, task_id = id, outcome = %receipt.outcome, "closed task");

        if !notify_orchestrator || !self.roster.contains("orchestrator") {
            return Ok(None);
        }

        let mut references = References::new();
        references.insert(
            "receiptPath".to_string(),
            receipt_path.to_string_lossy().into_owned(),
        );
        references.insert("sourceAgent".to_string(), agent.to_string());
        references.insert("taskId".to_string(), id.to_string());

        let new_id = TaskId::new(self.id_gen.next(self.clock.epoch_ms()));
        let mut signals = Signals::new(SignalKind::TaskComplete);
        signals.root_id = receipt.task.signals.root_id.clone();
        signals.parent_id = Some(id.to_string());

        let meta = PacketMeta {
            id: new_id,
            to: vec!["orchestrator".to_string()],
            from: agent.to_string(),
            priority: Priority::P2,
            title: format!("{agent} completed {id}"),
            signals,
            references,
        };
        let paths = self.deliver(&meta, &receipt.note)?;
        Ok(paths.into_iter().next())
    }

    pub fn read_receipt(&self, agent: &str, id: &str) -> Result<Receipt, BusError> {
        atomic::read_json(&self.receipt_path(agent, id))?
            .ok_or_else(|| BusError::NotFound(format!("{agent}/{id}")))
    }

    /// Most recent receipts across one agent (or every agent, if `agent`
    /// is absent), newest first.
    pub fn recent_receipts(
        &self,
        agent: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Receipt>, BusError> {
        let mut dated: Vec<(std::time::SystemTime, PathBuf)> = Vec::new();
        let agents: Vec<String> = match agent {
            Some(a) => vec![a.to_string()],
            None => self.roster.names().map(|s| s.to_string()).collect(),
        };
        for agent in agents {
            let dir = self.receipts_dir(&agent);
            let Ok(entries) = fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                if let Ok(metadata) = entry.metadata() {
                    if let Ok(mtime) = metadata.modified() {
                        dated.push((mtime, entry.path()));
                    }
                }
            }
        }
        dated.sort_by(|a, b| b.0.cmp(&a.0));
        dated
            .into_iter()
            .take(limit)
            .map(|(_, path)| {
                let bytes = fs::read(&path)?;
                Ok(serde_json::from_slice(&bytes)?)
            })
            .collect()
    }

    pub fn status_summary(&self) -> Result<StatusSummary, BusError> {
        let mut summary = StatusSummary::new();
        for agent in self.roster.names() {
            let mut status = AgentStatus {
                new: self.list_inbox(agent, InboxState::New)?.len(),
                seen: self.list_inbox(agent, InboxState::Seen)?.len(),
                in_progress: self.list_inbox(agent, InboxState::InProgress)?.len(),
                processed: self.list_inbox(agent, InboxState::Processed)?.len(),
                latest_receipt: None,
            };
            status.latest_receipt = self.recent_receipts(Some(agent), 1)?.into_iter().next();
            summary.insert(agent.to_string(), status);
        }
        Ok(summary)
    }
}
