// SPDX-License-Identifier: MIT

//! agentbusd: spawns a Worker Supervisor per roster worker/autopilot
//! agent, an Orchestrator Forwarder if `orchestrator` is on the roster,
//! and an Observer per configured review source, then waits for
//! SIGTERM/SIGINT.

use std::sync::Arc;

use agentbus_core::{AgentKind, RandomIdGen, Roster, SystemClock};
use agentbus_coordinator::{CooldownCoordinator, Semaphore};
use agentbus_daemon::any_runner::AnyRunner;
use agentbus_daemon::config::AgentBusConfig;
use agentbus_daemon::{load_roster, logging};
use agentbus_forwarder::{DigestMode as ForwarderDigestMode, ForwarderConfig, ForwarderLoop};
use agentbus_observer::{ObserverConfig, ShellReviewSource};
use agentbus_skills::SkillRegistry;
use agentbus_store::BusStore;
use agentbus_supervisor::{SupervisorConfig, WorkerSupervisor};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    apply_cli_overrides();
    let config = AgentBusConfig::load()?;

    let log_path = config.bus_root.join("log").join("agentbusd.log");
    let _log_guard = logging::init(&log_path)?;

    info!(bus_root = %config.bus_root.display(), "starting agentbusd");

    let roster = load_roster_or_default(&config);
    let store = Arc::new(BusStore::open(
        config.bus_root.clone(),
        roster,
        RandomIdGen,
        SystemClock,
    )?);

    let cooldown = Arc::new(CooldownCoordinator::new(store.root(), SystemClock));
    let semaphore = Arc::new(Semaphore::new(store.root(), config.max_in_flight));
    let registry = Arc::new(SkillRegistry::new());
    let runner = AnyRunner::for_engine(config.turn_runner_engine);

    let supervisor_config = SupervisorConfig {
        poll_interval: config.poll_interval(),
        supersede_poll_interval: config.supersede_poll_interval(),
        turn_timeout: config.turn_timeout(),
        kill_grace: config.kill_grace(),
        rate_limit_min_cooldown_ms: config.rate_limit_min_cooldown_ms,
        retry_base_ms: config.retry_base_ms,
        retry_max_ms: config.retry_max_ms,
        retry_jitter_max_ms: config.retry_jitter_max_ms,
        ..Default::default()
    };

    let mut tasks = tokio::task::JoinSet::new();

    for agent in store
        .roster()
        .by_kind(AgentKind::Worker)
        .chain(store.roster().by_kind(AgentKind::Autopilot))
        .cloned()
        .collect::<Vec<_>>()
    {
        let worktree = config.worktrees_root.join(&agent.name);
        let supervisor = WorkerSupervisor::new(
            agent.name.clone(),
            worktree,
            store.clone(),
            runner.clone(),
            cooldown.clone(),
            semaphore.clone(),
            registry.clone(),
            supervisor_config.clone(),
            SystemClock,
        );
        let name = agent.name.clone();
        tasks.spawn(async move {
            if let Err(e) = supervisor.run().await {
                error!(agent = %name, error = %e, "supervisor loop exited");
            }
        });
    }

    if store.roster().contains("orchestrator") {
        let forwarder_config = ForwarderConfig {
            digest_mode: match config.digest_mode {
                agentbus_daemon::config::DigestMode::Compact => ForwarderDigestMode::Compact,
                agentbus_daemon::config::DigestMode::Verbose => ForwarderDigestMode::Verbose,
            },
            self_remediation_depth_cap: config.self_remediation_max_depth,
            notify_operator_on_review_required: config.forward_to_operator,
            ..Default::default()
        };
        let forwarder = ForwarderLoop::new(store.clone(), forwarder_config);
        tasks.spawn(async move {
            if let Err(e) = forwarder.run().await {
                error!(error = %e, "forwarder loop exited");
            }
        });
    }

    for agent in store.roster().by_kind(AgentKind::Observer).cloned().collect::<Vec<_>>() {
        let Some(command) = agent.command.clone() else {
            tracing::warn!(agent = %agent.name, "observer has no command configured, skipping");
            continue;
        };
        let observer_config = ObserverConfig {
            poll_interval: config.observer_poll_interval(),
            cold_start_mode: config.observer_cold_start_mode,
        };
        let source = ShellReviewSource::new(agent.name.clone(), command);
        let observer = agentbus_observer::Observer::new(store.clone(), source, vec![], observer_config);
        tasks.spawn(async move {
            if let Err(e) = observer.run().await {
                error!(error = %e, "observer loop exited");
            }
        });
    }

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
        Some(res) = tasks.join_next() => {
            if let Err(e) = res {
                error!(error = %e, "a supervisor task panicked");
            }
        }
    }

    tasks.shutdown().await;
    Ok(())
}

/// `--config <path>` is the one flag recognized directly by the daemon
/// binary; everything else in §6.2 goes through the TOML file or
/// `AGENTBUS_*` environment variables.
fn apply_cli_overrides() {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            if let Some(path) = args.next() {
                std::env::set_var("AGENTBUS_CONFIG", path);
            }
        }
    }
}

fn load_roster_or_default(config: &AgentBusConfig) -> Roster {
    match load_roster(&config.roster_path) {
        Ok(roster) => roster,
        Err(e) => {
            tracing::warn!(
                path = %config.roster_path.display(),
                error = %e,
                "falling back to an empty roster"
            );
            Roster::new()
        }
    }
}
