//! Sync scheduler status types.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Derived scheduling state of a registered job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Toggled off; will not be dispatched.
    Disabled,
    /// Enabled and either due or currently running.
    Enabled,
    /// Enabled with `next_run_at` in the future.
    Waiting,
    /// The dispatcher has not started yet.
    Idle,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Disabled => write!(f, "disabled"),
            JobStatus::Enabled => write!(f, "enabled"),
            JobStatus::Waiting => write!(f, "waiting"),
            JobStatus::Idle => write!(f, "idle"),
        }
    }
}

/// Consistent read of one job descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub name: String,
    pub status: JobStatus,
    pub enabled: bool,
    pub running: bool,
    #[serde(with = "interval_secs")]
    pub interval: Duration,
    pub last_run_at: Option<DateTime<Utc>>,
    pub next_run_at: Option<DateTime<Utc>>,
    pub run_count: u64,
    pub error_count: u64,
    pub last_error: Option<String>,
}

/// Aggregate totals across every registered job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerTotals {
    pub total_jobs: usize,
    pub enabled_jobs: usize,
    pub running_jobs: usize,
    pub total_runs: u64,
    pub total_errors: u64,
}

impl SchedulerTotals {
    pub fn from_snapshots<'a>(snapshots: impl IntoIterator<Item = &'a JobSnapshot>) -> Self {
        snapshots
            .into_iter()
            .fold(SchedulerTotals::default(), |mut acc, snap| {
                acc.total_jobs += 1;
                if snap.enabled {
                    acc.enabled_jobs += 1;
                }
                if snap.running {
                    acc.running_jobs += 1;
                }
                acc.total_runs += snap.run_count;
                acc.total_errors += snap.error_count;
                acc
            })
    }
}

/// Serializes a `Duration` as fractional seconds.
mod interval_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
