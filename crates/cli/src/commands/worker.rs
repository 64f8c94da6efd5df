// SPDX-License-Identifier: MIT

//! `agentbus worker` — Worker Lock maintenance.

use anyhow::Result;
use clap::Subcommand;

use agentbus_daemon::config::AgentBusConfig;
use agentbus_store::WorkerLock;

#[derive(Subcommand)]
pub enum WorkerCommand {
    /// Force-release a stuck worker lock. Operator action only, same as
    /// the semaphore reap command — never done silently.
    Unlock { agent: String },
}

pub fn handle(config: &AgentBusConfig, command: WorkerCommand) -> Result<()> {
    match command {
        WorkerCommand::Unlock { agent } => {
            let state_dir = config.bus_root.join("state");
            WorkerLock::force_release(&state_dir, &agent)?;
            println!("released lock for {agent}");
            Ok(())
        }
    }
}
