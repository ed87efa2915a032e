//! Configuration types for credsync.
//!
//! `AppConfig` represents the optional `config.toml` in the data directory.
//! The master key is never part of this file; it comes from the environment.

use serde::{Deserialize, Serialize};

/// Top-level configuration, loaded from `~/.credsync/config.toml`.
///
/// All fields have defaults, so an empty file is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Override for the SQLite connection URL.
    #[serde(default)]
    pub database_url: Option<String>,

    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Dispatcher settings and per-job overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Upper bound on the dispatcher tick, in milliseconds.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    #[serde(default)]
    pub jobs: Vec<JobConfig>,
}

fn default_tick_ms() -> u64 {
    5_000
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            jobs: Vec::new(),
        }
    }
}

impl SchedulerConfig {
    /// Override for a catalogue job, if one is configured.
    pub fn job(&self, name: &str) -> Option<&JobConfig> {
        self.jobs.iter().find(|j| j.name == name)
    }
}

/// Override for one catalogue job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    /// Replaces the catalogue interval when set.
    #[serde(default)]
    pub interval_secs: Option<u64>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}
