//! Interval scheduler for the sync job catalogue.
//!
//! Provides:
//! - A registry of named jobs, each with its own interval and enabled flag
//! - One dispatcher task that launches due jobs into supervised workers
//! - Per-job run accounting (counts, last error, last/next run)
//! - Manual triggers that run a job on the next wake without moving its schedule
//!
//! A job never overlaps itself: it is not relaunched while a run is in
//! flight, and its next run is scheduled `interval` after the previous run
//! *finished*. Handler errors and panics are recorded on the job and never
//! reach the dispatcher.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use credsync_types::error::SchedulerError;
use credsync_types::job::{JobSnapshot, JobStatus};

use super::handler::{DynJobHandler, JobHandler};

/// Lower bound on the dispatcher wake period.
const MIN_TICK: Duration = Duration::from_millis(1);

/// Default upper bound on the dispatcher wake period.
pub const DEFAULT_TICK: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

/// Registration request for one named job.
pub struct JobDescriptor {
    pub name: String,
    pub interval: Duration,
    pub enabled: bool,
    pub handler: DynJobHandler,
}

impl JobDescriptor {
    /// A new, enabled job.
    pub fn new(name: impl Into<String>, interval: Duration, handler: impl JobHandler + 'static) -> Self {
        Self {
            name: name.into(),
            interval,
            enabled: true,
            handler: Arc::new(handler),
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Registry entry: the descriptor plus its run accounting.
struct JobEntry {
    interval: Duration,
    handler: DynJobHandler,
    enabled: bool,
    running: bool,
    triggered: bool,
    /// Monotonic due instant used for dispatch decisions.
    next_due: Instant,
    last_run_at: Option<DateTime<Utc>>,
    next_run_at: Option<DateTime<Utc>>,
    run_count: u64,
    error_count: u64,
    last_error: Option<String>,
}

impl JobEntry {
    fn is_due(&self, now: Instant) -> bool {
        self.enabled && !self.running && (self.triggered || self.next_due <= now)
    }

    fn snapshot(&self, name: &str, started: bool, now: Instant) -> JobSnapshot {
        let status = if !self.enabled {
            JobStatus::Disabled
        } else if !started {
            JobStatus::Idle
        } else if self.running || self.triggered || self.next_due <= now {
            JobStatus::Enabled
        } else {
            JobStatus::Waiting
        };

        JobSnapshot {
            name: name.to_string(),
            status,
            enabled: self.enabled,
            running: self.running,
            interval: self.interval,
            last_run_at: self.last_run_at,
            next_run_at: self.next_run_at,
            run_count: self.run_count,
            error_count: self.error_count,
            last_error: self.last_error.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// SyncScheduler
// ---------------------------------------------------------------------------

struct Shared {
    jobs: Mutex<HashMap<String, JobEntry>>,
    /// Wakes the dispatcher on registration, toggles, triggers and completions.
    wake: Notify,
    max_tick: Duration,
    /// Set once by `start`; its presence marks the scheduler as started.
    cancel: OnceLock<CancellationToken>,
}

/// Periodic dispatcher for a catalogue of named jobs.
///
/// Cheap to clone; clones share the same registry.
#[derive(Clone)]
pub struct SyncScheduler {
    shared: Arc<Shared>,
}

impl Default for SyncScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_TICK)
    }
}

impl SyncScheduler {
    /// Create a scheduler (not yet started).
    ///
    /// `max_tick` bounds how long the dispatcher sleeps between registry
    /// scans; it is further capped at half the shortest registered interval.
    pub fn new(max_tick: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                jobs: Mutex::new(HashMap::new()),
                wake: Notify::new(),
                max_tick: max_tick.max(MIN_TICK),
                cancel: OnceLock::new(),
            }),
        }
    }

    /// Add a job. Its first run is due one interval from now.
    pub async fn register(&self, descriptor: JobDescriptor) -> Result<(), SchedulerError> {
        if descriptor.interval.is_zero() {
            return Err(SchedulerError::InvalidInterval(descriptor.name));
        }

        let mut jobs = self.shared.jobs.lock().await;
        if jobs.contains_key(&descriptor.name) {
            return Err(SchedulerError::Duplicate(descriptor.name));
        }

        tracing::info!(
            job = %descriptor.name,
            interval_secs = descriptor.interval.as_secs_f64(),
            enabled = descriptor.enabled,
            "job registered"
        );
        jobs.insert(
            descriptor.name,
            JobEntry {
                interval: descriptor.interval,
                handler: descriptor.handler,
                enabled: descriptor.enabled,
                running: false,
                triggered: false,
                next_due: Instant::now() + descriptor.interval,
                last_run_at: None,
                next_run_at: wall_clock_after(descriptor.interval),
                run_count: 0,
                error_count: 0,
                last_error: None,
            },
        );
        drop(jobs);

        self.shared.wake.notify_one();
        Ok(())
    }

    /// Spawn the dispatcher task.
    ///
    /// The returned handle resolves once `cancel` fires and every in-flight
    /// run has completed. A panic inside the dispatcher surfaces through it.
    pub fn start(&self, cancel: CancellationToken) -> Result<JoinHandle<()>, SchedulerError> {
        self.shared
            .cancel
            .set(cancel.clone())
            .map_err(|_| SchedulerError::AlreadyStarted)?;

        tracing::info!("sync scheduler started");
        let shared = Arc::clone(&self.shared);
        Ok(tokio::spawn(dispatch_loop(shared, cancel)))
    }

    /// Cancel the dispatcher. Running handlers see their token fire and are
    /// left to finish on their own.
    pub fn stop(&self) {
        if let Some(cancel) = self.shared.cancel.get() {
            cancel.cancel();
        }
    }

    pub fn is_started(&self) -> bool {
        self.shared.cancel.get().is_some()
    }

    /// Enable or disable a job.
    ///
    /// A run already in flight is left alone; no new run starts while the
    /// job is disabled.
    pub async fn set_enabled(&self, name: &str, enabled: bool) -> Result<(), SchedulerError> {
        let mut jobs = self.shared.jobs.lock().await;
        let entry = jobs
            .get_mut(name)
            .ok_or_else(|| SchedulerError::NotRegistered(name.to_string()))?;

        if entry.enabled != enabled {
            tracing::info!(job = %name, enabled, "job toggled");
        }
        entry.enabled = enabled;
        drop(jobs);

        self.shared.wake.notify_one();
        Ok(())
    }

    /// Ask for a run on the dispatcher's next wake without touching
    /// `next_run_at`. A disabled job keeps the request until re-enabled.
    pub async fn trigger(&self, name: &str) -> Result<(), SchedulerError> {
        let mut jobs = self.shared.jobs.lock().await;
        let entry = jobs
            .get_mut(name)
            .ok_or_else(|| SchedulerError::NotRegistered(name.to_string()))?;
        entry.triggered = true;
        drop(jobs);

        tracing::info!(job = %name, "job triggered manually");
        self.shared.wake.notify_one();
        Ok(())
    }

    /// Snapshot of one job.
    pub async fn status(&self, name: &str) -> Result<JobSnapshot, SchedulerError> {
        let started = self.is_started();
        let jobs = self.shared.jobs.lock().await;
        jobs.get(name)
            .map(|entry| entry.snapshot(name, started, Instant::now()))
            .ok_or_else(|| SchedulerError::NotRegistered(name.to_string()))
    }

    /// Snapshots of every job, ordered by name.
    pub async fn status_all(&self) -> BTreeMap<String, JobSnapshot> {
        let started = self.is_started();
        let now = Instant::now();
        let jobs = self.shared.jobs.lock().await;
        jobs.iter()
            .map(|(name, entry)| (name.clone(), entry.snapshot(name, started, now)))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

async fn dispatch_loop(shared: Arc<Shared>, cancel: CancellationToken) {
    let mut workers: JoinSet<()> = JoinSet::new();

    loop {
        let wake_at = launch_due(&shared, &mut workers, &cancel).await;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = shared.wake.notified() => {}
            _ = tokio::time::sleep_until(wake_at) => {}
            Some(_) = workers.join_next(), if !workers.is_empty() => {}
        }
    }

    tracing::info!(in_flight = workers.len(), "sync scheduler stopping");
    while workers.join_next().await.is_some() {}
    tracing::info!("sync scheduler stopped");
}

/// Launch every due job and return when the dispatcher should next wake.
async fn launch_due(
    shared: &Arc<Shared>,
    workers: &mut JoinSet<()>,
    cancel: &CancellationToken,
) -> Instant {
    let now = Instant::now();
    let mut jobs = shared.jobs.lock().await;

    let tick = jobs
        .values()
        .map(|entry| entry.interval / 2)
        .min()
        .map_or(shared.max_tick, |half| half.min(shared.max_tick))
        .max(MIN_TICK);
    let mut wake_at = now + tick;

    for (name, entry) in jobs.iter_mut() {
        if entry.is_due(now) {
            entry.running = true;
            entry.triggered = false;

            tracing::debug!(job = %name, "dispatching job");
            workers.spawn(supervise(
                Arc::clone(shared),
                name.clone(),
                Arc::clone(&entry.handler),
                cancel.child_token(),
            ));
        } else if entry.enabled && !entry.running {
            wake_at = wake_at.min(entry.next_due);
        }
    }

    wake_at
}

/// Run one handler invocation inside a fault boundary and record the outcome.
async fn supervise(
    shared: Arc<Shared>,
    name: String,
    handler: DynJobHandler,
    cancel: CancellationToken,
) {
    let started_at = Utc::now();
    let started = Instant::now();

    let outcome = tokio::spawn(async move { handler.run_boxed(cancel).await }).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    let result = match outcome {
        Ok(Ok(())) => {
            tracing::debug!(job = %name, elapsed_ms, "job completed");
            Ok(())
        }
        Ok(Err(e)) => {
            tracing::warn!(job = %name, elapsed_ms, error = %e, "job failed");
            Err(format!("{e:#}"))
        }
        Err(join_error) => {
            let reason = describe_join_error(join_error);
            tracing::error!(job = %name, elapsed_ms, reason = %reason, "job aborted");
            Err(reason)
        }
    };

    let mut jobs = shared.jobs.lock().await;
    if let Some(entry) = jobs.get_mut(&name) {
        entry.running = false;
        entry.run_count += 1;
        entry.last_run_at = Some(started_at);
        entry.next_due = Instant::now() + entry.interval;
        entry.next_run_at = wall_clock_after(entry.interval);
        if let Err(reason) = result {
            entry.error_count += 1;
            entry.last_error = Some(reason);
        }
    }
    drop(jobs);

    shared.wake.notify_one();
}

fn describe_join_error(err: JoinError) -> String {
    if err.is_panic() {
        let panic = err.into_panic();
        let message = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        format!("handler panicked: {message}")
    } else {
        "handler task was cancelled".to_string()
    }
}

fn wall_clock_after(interval: Duration) -> Option<DateTime<Utc>> {
    chrono::Duration::from_std(interval)
        .ok()
        .and_then(|delta| Utc::now().checked_add_signed(delta))
}
