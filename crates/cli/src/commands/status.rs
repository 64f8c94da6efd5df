// SPDX-License-Identifier: MIT

//! `agentbus status` — per-agent inbox counts and latest receipt.

use std::io::IsTerminal;

use anyhow::Result;
use clap::Args;

use agentbus_store::Store;

use crate::output::OutputFormat;
use crate::table::{Align, CellStyle, Column, Table};

#[derive(Args)]
pub struct StatusArgs {
    /// Re-run the status display in a loop (Ctrl+C to exit)
    #[arg(long)]
    pub watch: bool,

    /// Refresh interval in seconds for `--watch`
    #[arg(long, default_value_t = 5)]
    pub interval: u64,
}

pub fn handle(store: &Store, args: StatusArgs, format: OutputFormat) -> Result<()> {
    if !args.watch {
        return render_once(store, format);
    }

    let is_tty = std::io::stdout().is_terminal();
    loop {
        if is_tty {
            print!("\x1B[H\x1B[J");
        }
        render_once(store, format)?;
        std::thread::sleep(std::time::Duration::from_secs(args.interval));
    }
}

fn render_once(store: &Store, format: OutputFormat) -> Result<()> {
    let summary = store.status_summary()?;

    if matches!(format, OutputFormat::Json) {
        println!("{}", serde_json::to_string_pretty(&summary_as_json(&summary))?);
        return Ok(());
    }

    let mut table = Table::new(vec![
        Column::left("AGENT"),
        Column::right("NEW"),
        Column::right("SEEN"),
        Column {
            name: "IN_PROGRESS",
            align: Align::Right,
            style: CellStyle::Plain,
            min_width: None,
            max_width: None,
        },
        Column::right("PROCESSED"),
        Column {
            name: "LATEST",
            align: Align::Left,
            style: CellStyle::Status,
            min_width: None,
            max_width: Some(40),
        },
    ]);

    let mut agents: Vec<_> = summary.iter().collect();
    agents.sort_by(|a, b| a.0.cmp(b.0));
    for (agent, status) in agents {
        let latest = status
            .latest_receipt
            .as_ref()
            .map(|r| format!("{} ({})", r.outcome, r.task.id.short(12)))
            .unwrap_or_else(|| "-".to_string());
        table.row(vec![
            agent.clone(),
            status.new.to_string(),
            status.seen.to_string(),
            status.in_progress.to_string(),
            status.processed.to_string(),
            latest,
        ]);
    }
    table.render(&mut std::io::stdout());
    Ok(())
}

fn summary_as_json(summary: &agentbus_store::StatusSummary) -> serde_json::Value {
    serde_json::json!(summary
        .iter()
        .map(|(agent, status)| {
            (
                agent.clone(),
                serde_json::json!({
                    "new": status.new,
                    "seen": status.seen,
                    "in_progress": status.in_progress,
                    "processed": status.processed,
                    "latest_outcome": status.latest_receipt.as_ref().map(|r| r.outcome.to_string()),
                }),
            )
        })
        .collect::<std::collections::BTreeMap<_, _>>())
}
