// SPDX-License-Identifier: MIT

//! Daemon configuration (spec §6.2): one struct, loaded once at startup
//! by layering built-in defaults, an optional TOML file, and
//! `AGENTBUS_*` environment overrides (Design Notes §9 — collapse
//! env-var configuration into a single structured pass, never re-read
//! mid-run).

use std::path::PathBuf;
use std::time::Duration;

use agentbus_observer::ColdStartMode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error reading {0}: {1}")]
    Io(PathBuf, std::io::Error),
    #[error("invalid TOML in {0}: {1}")]
    Toml(PathBuf, toml::de::Error),
    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestMode {
    Compact,
    Verbose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TurnEngine {
    OneShot,
    LongLived,
}

/// Every field in spec §6.2 has a named field here and a deterministic
/// default; nothing is re-read from the environment past `load()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentBusConfig {
    pub bus_root: PathBuf,
    pub roster_path: PathBuf,
    pub worktrees_root: PathBuf,

    pub poll_interval_ms: u64,
    pub turn_timeout_ms: u64,
    pub kill_grace_ms: u64,
    pub supersede_poll_interval_ms: u64,

    pub max_in_flight: usize,
    pub rate_limit_min_cooldown_ms: u64,
    pub retry_base_ms: u64,
    pub retry_max_ms: u64,
    pub retry_jitter_max_ms: u64,

    pub digest_mode: DigestMode,
    pub forward_to_operator: bool,
    pub self_remediation_max_depth: u32,

    pub observer_cold_start_mode: ColdStartMode,
    pub observer_poll_interval_ms: u64,
    /// Floor below which observer items are ignored even on replay.
    pub observer_min_item_id: Option<String>,
    /// When set, the observer polls this fixed list instead of a live
    /// source — used for dry runs and smoke tests.
    pub observer_item_list: Option<Vec<String>>,

    pub turn_runner_engine: TurnEngine,
}

impl Default for AgentBusConfig {
    fn default() -> Self {
        let bus_root = default_state_dir().join("bus");
        Self {
            roster_path: default_state_dir().join("roster.toml"),
            worktrees_root: default_state_dir().join("worktrees"),
            bus_root,
            poll_interval_ms: 300,
            turn_timeout_ms: 3 * 3600 * 1000,
            kill_grace_ms: 10_000,
            supersede_poll_interval_ms: 1_000,
            max_in_flight: 4,
            rate_limit_min_cooldown_ms: 30_000,
            retry_base_ms: 1_000,
            retry_max_ms: 60_000,
            retry_jitter_max_ms: 2_000,
            digest_mode: DigestMode::Compact,
            forward_to_operator: true,
            self_remediation_max_depth: 1,
            observer_cold_start_mode: ColdStartMode::Baseline,
            observer_poll_interval_ms: 60_000,
            observer_min_item_id: None,
            observer_item_list: None,
            turn_runner_engine: TurnEngine::OneShot,
        }
    }
}

impl AgentBusConfig {
    /// Layers built-in defaults, an optional TOML file at `AGENTBUS_CONFIG`
    /// (default `~/.config/agentbus/config.toml`), then `AGENTBUS_*`
    /// environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let config_path = std::env::var("AGENTBUS_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_config_home().join("config.toml"));
        if let Ok(contents) = std::fs::read_to_string(&config_path) {
            config = toml::from_str(&contents).map_err(|e| ConfigError::Toml(config_path, e))?;
        }

        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(v) = std::env::var("AGENTBUS_BUS_ROOT") {
            self.bus_root = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("AGENTBUS_ROSTER_PATH") {
            self.roster_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("AGENTBUS_WORKTREES_ROOT") {
            self.worktrees_root = PathBuf::from(v);
        }
        env_u64(&mut self.poll_interval_ms, "AGENTBUS_POLL_INTERVAL_MS")?;
        env_u64(&mut self.turn_timeout_ms, "AGENTBUS_TURN_TIMEOUT_MS")?;
        env_u64(&mut self.kill_grace_ms, "AGENTBUS_KILL_GRACE_MS")?;
        env_u64(
            &mut self.supersede_poll_interval_ms,
            "AGENTBUS_SUPERSEDE_POLL_INTERVAL_MS",
        )?;
        env_usize(&mut self.max_in_flight, "AGENTBUS_MAX_IN_FLIGHT")?;
        env_u64(
            &mut self.rate_limit_min_cooldown_ms,
            "AGENTBUS_RATE_LIMIT_MIN_COOLDOWN_MS",
        )?;
        env_u64(&mut self.retry_base_ms, "AGENTBUS_RETRY_BASE_MS")?;
        env_u64(&mut self.retry_max_ms, "AGENTBUS_RETRY_MAX_MS")?;
        env_u64(&mut self.retry_jitter_max_ms, "AGENTBUS_RETRY_JITTER_MAX_MS")?;

        if let Ok(v) = std::env::var("AGENTBUS_DIGEST_MODE") {
            self.digest_mode = match v.as_str() {
                "compact" => DigestMode::Compact,
                "verbose" => DigestMode::Verbose,
                other => {
                    return Err(ConfigError::InvalidValue("AGENTBUS_DIGEST_MODE", other.to_string()))
                }
            };
        }
        if let Ok(v) = std::env::var("AGENTBUS_FORWARD_TO_OPERATOR") {
            self.forward_to_operator = parse_bool("AGENTBUS_FORWARD_TO_OPERATOR", &v)?;
        }
        env_u32(
            &mut self.self_remediation_max_depth,
            "AGENTBUS_SELF_REMEDIATION_MAX_DEPTH",
        )?;

        if let Ok(v) = std::env::var("AGENTBUS_OBSERVER_COLD_START_MODE") {
            self.observer_cold_start_mode = match v.as_str() {
                "baseline" => ColdStartMode::Baseline,
                "replay" => ColdStartMode::Replay,
                other => {
                    return Err(ConfigError::InvalidValue(
                        "AGENTBUS_OBSERVER_COLD_START_MODE",
                        other.to_string(),
                    ))
                }
            };
        }
        env_u64(
            &mut self.observer_poll_interval_ms,
            "AGENTBUS_OBSERVER_POLL_INTERVAL_MS",
        )?;
        if let Ok(v) = std::env::var("AGENTBUS_OBSERVER_MIN_ITEM_ID") {
            self.observer_min_item_id = Some(v);
        }
        if let Ok(v) = std::env::var("AGENTBUS_TURN_RUNNER_ENGINE") {
            self.turn_runner_engine = match v.as_str() {
                "one-shot" => TurnEngine::OneShot,
                "long-lived" => TurnEngine::LongLived,
                other => {
                    return Err(ConfigError::InvalidValue(
                        "AGENTBUS_TURN_RUNNER_ENGINE",
                        other.to_string(),
                    ))
                }
            };
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn turn_timeout(&self) -> Duration {
        Duration::from_millis(self.turn_timeout_ms)
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }

    pub fn supersede_poll_interval(&self) -> Duration {
        Duration::from_millis(self.supersede_poll_interval_ms)
    }

    pub fn observer_poll_interval(&self) -> Duration {
        Duration::from_millis(self.observer_poll_interval_ms)
    }
}

fn env_u64(field: &mut u64, name: &'static str) -> Result<(), ConfigError> {
    if let Ok(v) = std::env::var(name) {
        *field = v
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name, v))?;
    }
    Ok(())
}

fn env_u32(field: &mut u32, name: &'static str) -> Result<(), ConfigError> {
    if let Ok(v) = std::env::var(name) {
        *field = v
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name, v))?;
    }
    Ok(())
}

fn env_usize(field: &mut usize, name: &'static str) -> Result<(), ConfigError> {
    if let Ok(v) = std::env::var(name) {
        *field = v
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name, v))?;
    }
    Ok(())
}

fn parse_bool(name: &'static str, v: &str) -> Result<bool, ConfigError> {
    match v {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(ConfigError::InvalidValue(name, other.to_string())),
    }
}

fn default_config_home() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".config"))
        .join("agentbus")
}

fn default_state_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".local/state/agentbus")
}
