// SPDX-License-Identifier: MIT

//! The Observer loop (spec §4.5): periodic read of an external review
//! source, diffed against per-source state, emitting
//! `REVIEW_ACTION_REQUIRED` packets for new items.

use std::sync::Arc;

use agentbus_core::{Clock, IdGen, PacketMeta, Priority, References, SignalKind, Signals};
use agentbus_store::BusStore;

use crate::config::ObserverConfig;
use crate::error::ObserverError;
use crate::filter::{allow_all, ReviewFilter};
use crate::source::ReviewSource;
use crate::state::{ObserverState, ObserverStateStore};

const ORCHESTRATOR: &str = "orchestrator";

pub struct Observer<G: IdGen, C: Clock, S: ReviewSource> {
    store: Arc<BusStore<G, C>>,
    state_store: ObserverStateStore,
    source: S,
    filters: Vec<Box<dyn ReviewFilter>>,
    config: ObserverConfig,
}

impl<G: IdGen, C: Clock, S: ReviewSource> Observer<G, C, S> {
    pub fn new(
        store: Arc<BusStore<G, C>>,
        source: S,
        filters: Vec<Box<dyn ReviewFilter>>,
        config: ObserverConfig,
    ) -> Self {
        let state_store = ObserverStateStore::new(store.root());
        Self {
            store,
            state_store,
            source,
            filters,
            config,
        }
    }

    pub async fn run(&self) -> Result<(), ObserverError> {
        loop {
            if let Err(e) = self.poll_once() {
                tracing::warn!(error = %e, source = self.source.name(), "observer poll failed");
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Returns the number of `REVIEW_ACTION_REQUIRED` packets emitted.
    pub fn poll_once(&self) -> Result<usize, ObserverError> {
        let source_name = self.source.name();
        let items = self.source.poll()?;
        let mut state = self
            .state_store
            .load(source_name)?
            .unwrap_or_else(|| ObserverState {
                mode: self.config.cold_start_mode,
                ..Default::default()
            });

        let cold_start = state.seen_ids.is_empty() && state.watermark.is_none();
        let emit_on_cold_start = matches!(state.mode, crate::state::ColdStartMode::Replay);

        let mut emitted = 0usize;
        for item in &items {
            if state.seen_ids.contains(&item.id) {
                continue;
            }
            state.seen_ids.insert(item.id.clone());
            state.watermark = Some(state.watermark.unwrap_or(0).max(item.created_at_ms));

            if cold_start && !emit_on_cold_start {
                continue;
            }
            if !allow_all(&self.filters, item) {
                continue;
            }
            self.emit(source_name, item)?;
            emitted += 1;
        }

        self.state_store.save(source_name, &state)?;
        Ok(emitted)
    }

    fn emit(&self, source_name: &str, item: &crate::source::ReviewItem) -> Result<(), ObserverError> {
        let mut references = References::new();
        references.insert("itemId".to_string(), item.id.clone());
        if let Some(url) = &item.url {
            references.insert("url".to_string(), url.clone());
        }

        let signals = Signals::new(SignalKind::ReviewActionRequired).with_root_id(item.id.clone());
        let meta = PacketMeta {
            id: self.store.next_id(),
            to: vec![ORCHESTRATOR.to_string()],
            from: format!("observer:{source_name}"),
            priority: Priority::P2,
            title: item.title.clone(),
            signals,
            references,
        };
        self.store.deliver(&meta, &item.body)?;
        Ok(())
    }
}
