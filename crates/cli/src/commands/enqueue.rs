// SPDX-License-Identifier: MIT

//! `agentbus enqueue` — deliver a new packet to one or more agents.

use std::io::Read;

use anyhow::{bail, Context, Result};
use clap::Args;

use agentbus_core::{PacketMeta, Priority, References, SignalKind, Signals};
use agentbus_store::Store;

#[derive(Args)]
pub struct EnqueueArgs {
    /// Recipient agent names (repeat for multiple)
    #[arg(long = "to", required = true)]
    pub to: Vec<String>,

    /// Sending agent name
    #[arg(long = "from")]
    pub from: String,

    /// Signal kind, e.g. user_request, plan_request, execute,
    /// orchestrator_update, task_complete, review_action_required,
    /// status, opus_consult_request, opus_consult_response
    #[arg(long = "kind")]
    pub kind: String,

    /// Packet title
    #[arg(long)]
    pub title: String,

    /// Body file path, or `-` to read from stdin
    #[arg(long)]
    pub body: String,

    /// Priority: p1, p2, p3 (default p2)
    #[arg(long, default_value = "p2")]
    pub priority: String,

    #[arg(long = "root-id")]
    pub root_id: Option<String>,

    #[arg(long = "parent-id")]
    pub parent_id: Option<String>,
}

pub fn handle(store: &Store, args: EnqueueArgs) -> Result<()> {
    let kind = parse_kind(&args.kind)?;
    let priority = parse_priority(&args.priority)?;
    let body = read_body(&args.body)?;

    let mut signals = Signals::new(kind);
    signals.root_id = args.root_id;
    signals.parent_id = args.parent_id;

    let meta = PacketMeta {
        id: store.next_id(),
        to: args.to,
        from: args.from,
        priority,
        title: args.title,
        signals,
        references: References::new(),
    };

    let paths = store.deliver(&meta, &body)?;
    for path in paths {
        println!("{}", path.display());
    }
    Ok(())
}

fn read_body(body: &str) -> Result<String> {
    if body == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading body from stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(body).with_context(|| format!("reading body file {body}"))
    }
}

fn parse_kind(s: &str) -> Result<SignalKind> {
    Ok(match s.to_ascii_lowercase().as_str() {
        "user_request" => SignalKind::UserRequest,
        "plan_request" => SignalKind::PlanRequest,
        "execute" => SignalKind::Execute,
        "orchestrator_update" => SignalKind::OrchestratorUpdate,
        "task_complete" => SignalKind::TaskComplete,
        "review_action_required" => SignalKind::ReviewActionRequired,
        "status" => SignalKind::Status,
        "opus_consult_request" => SignalKind::OpusConsultRequest,
        "opus_consult_response" => SignalKind::OpusConsultResponse,
        other => bail!("unknown signal kind: {other}"),
    })
}

fn parse_priority(s: &str) -> Result<Priority> {
    Ok(match s.to_ascii_lowercase().as_str() {
        "p1" => Priority::P1,
        "p2" => Priority::P2,
        "p3" => Priority::P3,
        other => bail!("unknown priority: {other}"),
    })
}
