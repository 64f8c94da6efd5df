// SPDX-License-Identifier: MIT

//! The Worker Supervisor event loop (spec §4.2): one instance per
//! roster agent, driving that agent's inbox through the Turn Runner
//! against the shared Rate Coordinator.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::mpsc::UnboundedSender;

use agentbus_core::{
    BusError, Clock, IdGen, InboxState, Outcome, PacketMeta, Priority, Receipt, SignalKind,
    Signals, TaskId,
};
use agentbus_coordinator::{CooldownCoordinator, Semaphore};
use agentbus_runner::{watch_channel, RunnerError, TurnOutcome, TurnRequest, TurnRunner};
use agentbus_skills::{assemble_prompt, SkillRegistry};
use agentbus_store::{BusStore, SessionPin, SessionPins};

use crate::config::SupervisorConfig;
use crate::context_builder;
use crate::error::SupervisorError;
use crate::events::SupervisorEvent;
use crate::followups::dispatch_follow_ups;
use crate::output::{parse_turn_output, TurnOutputPayload};
use crate::throttle::{StatusThrottle, DEFAULT_WINDOW};

/// Drives one agent's inbox. Holds no state beyond handles onto shared,
/// file-backed coordination primitives — two supervisors for different
/// agents may run in the same process or in separate ones.
pub struct WorkerSupervisor<R: TurnRunner, G: IdGen, C: Clock> {
    agent: String,
    cwd: PathBuf,
    store: Arc<BusStore<G, C>>,
    runner: R,
    cooldown: Arc<CooldownCoordinator<C>>,
    semaphore: Arc<Semaphore>,
    session_pins: SessionPins,
    registry: Arc<SkillRegistry>,
    throttle: StatusThrottle,
    config: SupervisorConfig,
    clock: C,
    events: Option<UnboundedSender<SupervisorEvent>>,
}

impl<R: TurnRunner, G: IdGen, C: Clock> WorkerSupervisor<R, G, C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        agent: impl Into<String>,
        cwd: impl Into<PathBuf>,
        store: Arc<BusStore<G, C>>,
        runner: R,
        cooldown: Arc<CooldownCoordinator<C>>,
        semaphore: Arc<Semaphore>,
        registry: Arc<SkillRegistry>,
        config: SupervisorConfig,
        clock: C,
    ) -> Self {
        let session_pins = SessionPins::new(store.root());
        Self {
            agent: agent.into(),
            cwd: cwd.into(),
            store,
            runner,
            cooldown,
            semaphore,
            session_pins,
            registry,
            throttle: StatusThrottle::new(DEFAULT_WINDOW),
            config,
            clock,
            events: None,
        }
    }

    pub fn with_events(mut self, tx: UnboundedSender<SupervisorEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    fn emit(&self, event: SupervisorEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    /// Acquires the per-agent Worker Lock and polls forever. Only
    /// returns on a lock-acquisition failure; every other error is
    /// logged and the loop continues to the next cycle.
    pub async fn run(&self) -> Result<(), SupervisorError> {
        let state_dir = self.store.root().join("state");
        let _lock = agentbus_store::WorkerLock::acquire(
            &state_dir,
            &self.agent,
            std::process::id(),
            self.clock.epoch_ms(),
        )?;
        tracing::info!(agent = %self.agent, "worker supervisor started");
        // `lock` lives for the whole loop below and releases on drop if
        // this function ever returns.
        loop {
            if let Err(e) = self.poll_once().await {
                tracing::warn!(agent = %self.agent, error = %e, "poll cycle failed");
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// One sweep: `in_progress` first (resume work interrupted by a
    /// restart), then `new`/`seen`, de-duplicated and mtime-sorted.
    pub async fn poll_once(&self) -> Result<usize, SupervisorError> {
        let mut ids = self
            .store
            .list_inbox_by_mtime(&self.agent, InboxState::InProgress)?;
        for state in [InboxState::New, InboxState::Seen] {
            for id in self.store.list_inbox_by_mtime(&self.agent, state)? {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        let count = ids.len();
        for id in ids {
            self.process_task(&id).await?;
        }
        Ok(count)
    }

    /// Claims and drives one task through to a close, looping internally
    /// on supersede and bounded transient retries.
    pub async fn process_task(&self, id: &TaskId) -> Result<(), SupervisorError> {
        match self.store.claim(&self.agent, id.as_str()) {
            Ok(_) => {}
            Err(BusError::ClaimConflict(_)) | Err(BusError::AlreadyProcessed(_)) => {
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        self.emit(SupervisorEvent::TurnStarted {
            task_id: id.clone(),
        });

        let mut attempt: u32 = 0;
        loop {
            self.cooldown.wait(self.config.retry_jitter_max_ms).await?;
            let lease = self
                .semaphore
                .acquire(&self.agent, self.clock.epoch_ms(), self.config.retry_jitter_max_ms)
                .await?;

            let fresh = match self.store.open(&self.agent, id.as_str(), false) {
                Ok(opened) => opened,
                Err(BusError::NotFound(_)) => {
                    lease.release();
                    tracing::warn!(agent = %self.agent, task_id = %id, "packet vanished mid-turn");
                    return Ok(());
                }
                Err(e) => {
                    lease.release();
                    return Err(e.into());
                }
            };

            let baseline_mtime = std::fs::metadata(&fresh.path).and_then(|m| m.modified()).ok();
            let agent_config = self.store.roster().require(&self.agent)?;
            let command = agent_config
                .command
                .clone()
                .ok_or_else(|| SupervisorError::MissingCommand(self.agent.clone()))?;

            let resume_thread_id = self
                .session_pins
                .task_pin(&self.agent, id.as_str())?
                .map(|pin| pin.thread_id);
            let warm_resumed =
                resume_thread_id.is_some() && fresh.meta.signals.kind == SignalKind::OrchestratorUpdate;

            let context = if agent_config.kind == agentbus_core::AgentKind::Autopilot {
                if warm_resumed {
                    context_builder::thin(&self.cwd).await
                } else {
                    context_builder::full(&self.cwd, &self.store, fresh.meta.signals.root_id.as_deref(), "")
                        .await
                }
            } else {
                context_builder::minimal(&self.cwd).await
            };

            let prompt = assemble_prompt(
                agent_config,
                &fresh.meta,
                &fresh.body,
                &self.registry,
                &context,
                &HashMap::new(),
            );

            let output_path = self
                .store
                .root()
                .join("artifacts")
                .join(&self.agent)
                .join(format!("{id}.turn-output.json"));
            if let Some(parent) = output_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let request = TurnRequest {
                agent: self.agent.clone(),
                command,
                prompt,
                output_path: output_path.clone(),
                output_schema_ref: "schema://turn-output".to_string(),
                cwd: self.cwd.clone(),
                resume_thread_id,
                timeout: self.config.turn_timeout,
                kill_grace: self.config.kill_grace,
            };

            let (controller, watch) = watch_channel();
            let packet_path = fresh.path.clone();
            let supersede_poll = self.config.supersede_poll_interval;
            let watcher = tokio::spawn(async move {
                loop {
                    tokio::time::sleep(supersede_poll).await;
                    let mtime = std::fs::metadata(&packet_path).and_then(|m| m.modified()).ok();
                    if mtime.is_some() && mtime != baseline_mtime {
                        controller.supersede();
                        return;
                    }
                }
            });

            let outcome = self.runner.run_turn(request, watch).await;
            watcher.abort();
            lease.release();

            match outcome {
                TurnOutcome::Completed(output) => {
                    self.session_pins.pin_task(
                        &self.agent,
                        id.as_str(),
                        &SessionPin {
                            thread_id: output.thread_id.clone(),
                            pinned_at_ms: self.clock.epoch_ms(),
                        },
                    )?;
                    if agent_config.kind == agentbus_core::AgentKind::Autopilot {
                        if let Some(root_id) = &fresh.meta.signals.root_id {
                            self.session_pins.pin_root_if_absent(
                                &self.agent,
                                root_id,
                                &SessionPin {
                                    thread_id: output.thread_id.clone(),
                                    pinned_at_ms: self.clock.epoch_ms(),
                                },
                            )?;
                        }
                    }
                    return match parse_turn_output(&output.value) {
                        Ok(payload) => self.finish_success(&fresh.meta, payload),
                        Err(e) => self.close_failed(&fresh.meta, format!("malformed turn output: {e}")),
                    };
                }
                TurnOutcome::Superseded { .. } => {
                    self.emit(SupervisorEvent::SupersedeObserved {
                        task_id: id.clone(),
                    });
                    attempt = 0;
                    continue;
                }
                TurnOutcome::TimedOut { .. } => {
                    self.emit(SupervisorEvent::TimeoutObserved {
                        task_id: id.clone(),
                    });
                    return self.close_timed_out(&fresh.meta);
                }
                TurnOutcome::Transient(e) => {
                    if let RunnerError::RateLimited { retry_after, .. } = &e {
                        let extra = retry_after
                            .map(|d| d.as_millis() as u64)
                            .unwrap_or(self.config.rate_limit_min_cooldown_ms)
                            .max(self.config.rate_limit_min_cooldown_ms);
                        let record = self.cooldown.record(
                            self.clock.epoch_ms() + extra,
                            e.to_string(),
                            self.agent.clone(),
                            id.to_string(),
                        )?;
                        self.emit(SupervisorEvent::CooldownRequired { record });
                    }
                    attempt += 1;
                    if attempt > self.config.max_transient_retries {
                        self.emit(SupervisorEvent::turn_failed(id.clone(), &e));
                        return self.close_failed(
                            &fresh.meta,
                            format!("transient error exceeded retry budget: {e}"),
                        );
                    }
                    let backoff = self.config.backoff_ms(attempt - 1);
                    let jitter = if self.config.retry_jitter_max_ms == 0 {
                        0
                    } else {
                        rand::random::<u64>() % self.config.retry_jitter_max_ms
                    };
                    tokio::time::sleep(std::time::Duration::from_millis(backoff + jitter)).await;
                    continue;
                }
                TurnOutcome::Fatal(e) => {
                    self.emit(SupervisorEvent::turn_failed(id.clone(), &e));
                    return self.close_failed(&fresh.meta, e.to_string());
                }
            }
        }
    }

    fn finish_success(
        &self,
        meta: &PacketMeta,
        payload: TurnOutputPayload,
    ) -> Result<(), SupervisorError> {
        let (_dispatched, errors) =
            dispatch_follow_ups(&self.store, &self.agent, meta, &payload.follow_ups);

        let mut outcome = payload.outcome;
        let mut extra = payload.receipt_extra;
        if !errors.is_empty() {
            if outcome.is_done() {
                outcome = Outcome::NeedsReview;
            }
            match &mut extra {
                serde_json::Value::Object(map) => {
                    map.insert("followUpDispatchErrors".to_string(), json!(errors));
                }
                _ => extra = json!({ "followUpDispatchErrors": errors }),
            }
        }

        let mut receipt = Receipt::new(outcome, payload.note, meta.clone()).with_receipt_extra(extra);
        if let Some(sha) = payload.commit_sha {
            receipt = receipt.with_commit_sha(sha);
        }
        self.store
            .close(&self.agent, meta.id.as_str(), receipt, meta.signals.notify_orchestrator)?;
        Ok(())
    }

    fn close_failed(&self, meta: &PacketMeta, error: String) -> Result<(), SupervisorError> {
        let receipt = Receipt::new(Outcome::Failed, "turn failed", meta.clone())
            .with_receipt_extra(json!({ "error": error }));
        self.store
            .close(&self.agent, meta.id.as_str(), receipt, meta.signals.notify_orchestrator)?;
        Ok(())
    }

    fn close_timed_out(&self, meta: &PacketMeta) -> Result<(), SupervisorError> {
        let receipt = Receipt::new(
            Outcome::Blocked,
            format!("turn timed out after {:?}", self.config.turn_timeout),
            meta.clone(),
        );
        self.store
            .close(&self.agent, meta.id.as_str(), receipt, meta.signals.notify_orchestrator)?;

        if self.store.roster().contains("operator")
            && self.throttle.try_send(&self.agent, &meta.title, self.clock.epoch_ms())
        {
            let mut signals = Signals::new(SignalKind::Status);
            signals.root_id = meta.signals.root_id.clone().or_else(|| Some(meta.id.to_string()));
            signals.parent_id = Some(meta.id.to_string());
            let status_meta = PacketMeta {
                id: self.store.next_id(),
                to: vec!["operator".to_string()],
                from: self.agent.clone(),
                priority: Priority::P2,
                title: format!("{} timed out", meta.title),
                signals,
                references: Default::default(),
            };
            let _ = self.store.deliver(
                &status_meta,
                &format!(
                    "turn for task {} ({}) timed out after {:?}",
                    meta.id, meta.title, self.config.turn_timeout
                ),
            );
        }
        Ok(())
    }
}
