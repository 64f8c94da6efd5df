// SPDX-License-Identifier: MIT

//! `agentbus inbox` — list the ids in one agent's inbox.

use anyhow::{bail, Result};
use clap::Args;

use agentbus_core::InboxState;
use agentbus_store::Store;

use crate::output::OutputFormat;

#[derive(Args)]
pub struct InboxArgs {
    pub agent: String,

    /// new, seen, in_progress, processed (default new)
    #[arg(long, default_value = "new")]
    pub state: String,
}

pub fn handle(store: &Store, args: InboxArgs, format: OutputFormat) -> Result<()> {
    let state = parse_state(&args.state)?;
    let ids = store.list_inbox(&args.agent, state)?;

    if matches!(format, OutputFormat::Json) {
        let ids: Vec<_> = ids.iter().map(|id| id.as_str()).collect();
        println!("{}", serde_json::to_string_pretty(&ids)?);
        return Ok(());
    }

    for id in ids {
        println!("{id}");
    }
    Ok(())
}

fn parse_state(s: &str) -> Result<InboxState> {
    Ok(match s.to_ascii_lowercase().as_str() {
        "new" => InboxState::New,
        "seen" => InboxState::Seen,
        "in_progress" => InboxState::InProgress,
        "processed" => InboxState::Processed,
        other => bail!("unknown inbox state: {other}"),
    })
}
