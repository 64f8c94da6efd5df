// SPDX-License-Identifier: MIT

//! agentbus - operator CLI for the bus store.
//!
//! Talks to the bus directly on disk (the bus is file-backed, not a
//! socket service), the way `agentbusd` itself does. Flag parsing stays
//! intentionally thin: this surface exists to drive the core, not to
//! offer a rich command language.

mod color;
mod commands;
mod output;
mod table;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use agentbus_core::{RandomIdGen, Roster, SystemClock};
use agentbus_daemon::{config::AgentBusConfig, load_roster};
use agentbus_store::BusStore;
use output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "agentbus",
    version,
    about = "Operator CLI for the AgentBus message bus"
)]
struct Cli {
    /// Override the bus root (defaults to the configured `bus_root`)
    #[arg(long, global = true)]
    bus_root: Option<PathBuf>,

    /// Override the roster file path
    #[arg(long, global = true)]
    roster_path: Option<PathBuf>,

    #[arg(short = 'o', long = "output", value_enum, default_value_t, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show per-agent inbox counts and the latest receipt
    Status(commands::status::StatusArgs),
    /// Deliver a new packet to one or more agents
    Enqueue(commands::enqueue::EnqueueArgs),
    /// List the ids in one agent's inbox, by state
    Inbox(commands::inbox::InboxArgs),
    /// Show one agent's receipt for a task id
    Receipt(commands::receipt::ReceiptArgs),
    /// Rate Coordinator maintenance
    #[command(subcommand)]
    Coordinator(commands::coordinator::CoordinatorCommand),
    /// Worker Lock maintenance
    #[command(subcommand)]
    Worker(commands::worker::WorkerCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AgentBusConfig::load()?;
    if let Some(bus_root) = cli.bus_root {
        config.bus_root = bus_root;
    }
    if let Some(roster_path) = cli.roster_path {
        config.roster_path = roster_path;
    }

    let roster = load_roster(&config.roster_path).unwrap_or_else(|_| Roster::new());
    let store = BusStore::open(config.bus_root.clone(), roster, RandomIdGen, SystemClock)?;

    match cli.command {
        Commands::Status(args) => commands::status::handle(&store, args, cli.output),
        Commands::Enqueue(args) => commands::enqueue::handle(&store, args),
        Commands::Inbox(args) => commands::inbox::handle(&store, args, cli.output),
        Commands::Receipt(args) => commands::receipt::handle(&store, args, cli.output),
        Commands::Coordinator(cmd) => commands::coordinator::handle(&config, cmd),
        Commands::Worker(cmd) => commands::worker::handle(&config, cmd),
    }
}
