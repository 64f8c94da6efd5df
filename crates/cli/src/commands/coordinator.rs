// SPDX-License-Identifier: MIT

//! `agentbus coordinator` — Rate Coordinator maintenance (§4.3). Stale
//! leases are reaped only by operator action, never silently by a
//! worker.

use anyhow::Result;
use clap::Subcommand;

use agentbus_coordinator::Semaphore;
use agentbus_daemon::config::AgentBusConfig;

#[derive(Subcommand)]
pub enum CoordinatorCommand {
    /// Reap semaphore leases older than `--ttl-ms` with no live holder
    Reap {
        #[arg(long, default_value_t = 6 * 3600 * 1000)]
        ttl_ms: u64,
    },
}

pub fn handle(config: &AgentBusConfig, command: CoordinatorCommand) -> Result<()> {
    match command {
        CoordinatorCommand::Reap { ttl_ms } => {
            let semaphore = Semaphore::new(config.bus_root.clone(), config.max_in_flight);
            let now_ms = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64;
            let reaped = semaphore.reap_stale(now_ms, ttl_ms)?;
            println!("reaped {reaped} stale lease(s)");
            Ok(())
        }
    }
}
