// SPDX-License-Identifier: MIT

//! `agentbus receipt` — show one agent's receipt for a task id.

use anyhow::Result;
use clap::Args;

use agentbus_store::Store;

use crate::output::OutputFormat;

#[derive(Args)]
pub struct ReceiptArgs {
    pub agent: String,
    pub task_id: String,
}

pub fn handle(store: &Store, args: ReceiptArgs, format: OutputFormat) -> Result<()> {
    let receipt = store.read_receipt(&args.agent, &args.task_id)?;

    if matches!(format, OutputFormat::Json) {
        println!("{}", serde_json::to_string_pretty(&receipt)?);
        return Ok(());
    }

    println!("outcome: {}", receipt.outcome);
    println!("note: {}", receipt.note);
    if let Some(sha) = &receipt.commit_sha {
        println!("commit: {sha}");
    }
    println!("task: {} ({})", receipt.task.title, receipt.task.id);
    Ok(())
}
