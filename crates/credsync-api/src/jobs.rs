//! Background job catalogue.
//!
//! Five fixed jobs drive the credential-dependent sync work. Their default
//! cadence can be overridden per job in `config.toml`; names outside the
//! catalogue are ignored with a warning.
//!
//! The ad-platform clients and the attribution/ROI processors live outside
//! this service. The handlers here resolve which tenants have usable
//! credentials and load them through the vault, which is where a rotated,
//! expired or tampered credential first shows up.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use credsync_core::repository::cipher::PayloadCipher;
use credsync_core::repository::credential::CredentialStore;
use credsync_core::service::vault::CredentialVault;
use credsync_core::sync::handler::JobHandler;
use credsync_core::sync::scheduler::{JobDescriptor, SyncScheduler};
use credsync_types::config::SchedulerConfig;
use credsync_types::credential::CredentialType;
use credsync_types::error::{SchedulerError, VaultError};

const HOUR: u64 = 60 * 60;

/// Credential types that identify a tenant as an advertiser.
const AD_CREDENTIALS: [CredentialType; 2] = [CredentialType::GoogleAds, CredentialType::MetaAds];

/// What a catalogue job does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// Pull campaign metrics for every tenant holding this ad credential.
    MetricsSync(CredentialType),
    /// Multi-touch attribution over advertiser tenants.
    Attribution,
    /// ROI rollup over advertiser tenants.
    Roi,
    /// Deactivate credentials past their expiry.
    RetentionCleanup,
}

/// A fixed catalogue entry.
#[derive(Debug, Clone, Copy)]
pub struct CatalogueJob {
    pub name: &'static str,
    pub kind: JobKind,
    pub default_interval: Duration,
    pub summary: &'static str,
}

pub const CATALOGUE: [CatalogueJob; 5] = [
    CatalogueJob {
        name: "sync-google-ads-metrics",
        kind: JobKind::MetricsSync(CredentialType::GoogleAds),
        default_interval: Duration::from_secs(6 * HOUR),
        summary: "Sync Google Ads campaign metrics",
    },
    CatalogueJob {
        name: "sync-meta-ads-metrics",
        kind: JobKind::MetricsSync(CredentialType::MetaAds),
        default_interval: Duration::from_secs(6 * HOUR),
        summary: "Sync Meta Ads campaign metrics",
    },
    CatalogueJob {
        name: "process-attribution",
        kind: JobKind::Attribution,
        default_interval: Duration::from_secs(4 * HOUR),
        summary: "Process lead attribution",
    },
    CatalogueJob {
        name: "calculate-roi",
        kind: JobKind::Roi,
        default_interval: Duration::from_secs(24 * HOUR),
        summary: "Calculate campaign ROI",
    },
    CatalogueJob {
        name: "cleanup-retention",
        kind: JobKind::RetentionCleanup,
        default_interval: Duration::from_secs(24 * HOUR),
        summary: "Deactivate expired credentials",
    },
];

/// A catalogue job with configuration applied.
#[derive(Debug, Clone)]
pub struct PlannedJob {
    pub job: CatalogueJob,
    pub interval: Duration,
    pub enabled: bool,
}

/// Apply `config` overrides to the catalogue.
///
/// Overrides naming unknown jobs are logged and skipped. A zero interval is
/// rejected, since a job that never waits cannot be scheduled.
pub fn plan(config: &SchedulerConfig) -> Result<Vec<PlannedJob>, SchedulerError> {
    for over in &config.jobs {
        if !CATALOGUE.iter().any(|job| job.name == over.name) {
            tracing::warn!(job = %over.name, "ignoring override for unknown job");
        }
    }

    CATALOGUE
        .iter()
        .map(|job| {
            let over = config.job(job.name);
            let interval = match over.and_then(|o| o.interval_secs) {
                Some(0) => return Err(SchedulerError::InvalidInterval(job.name.to_string())),
                Some(secs) => Duration::from_secs(secs),
                None => job.default_interval,
            };
            Ok(PlannedJob {
                job: *job,
                interval,
                enabled: over.is_none_or(|o| o.enabled),
            })
        })
        .collect()
}

/// Register every catalogue job on `scheduler`.
pub async fn register_catalogue<S, C>(
    scheduler: &SyncScheduler,
    vault: Arc<CredentialVault<S, C>>,
    config: &SchedulerConfig,
) -> Result<(), SchedulerError>
where
    S: CredentialStore + 'static,
    C: PayloadCipher + 'static,
{
    for planned in plan(config)? {
        let vault = Arc::clone(&vault);
        let descriptor = match planned.job.kind {
            JobKind::MetricsSync(credential_type) => JobDescriptor::new(
                planned.job.name,
                planned.interval,
                MetricsSync {
                    vault,
                    credential_type,
                },
            ),
            JobKind::Attribution | JobKind::Roi => JobDescriptor::new(
                planned.job.name,
                planned.interval,
                AdvertiserSweep {
                    vault,
                    stage: planned.job.name,
                },
            ),
            JobKind::RetentionCleanup => {
                JobDescriptor::new(planned.job.name, planned.interval, RetentionCleanup { vault })
            }
        };
        scheduler.register(descriptor.enabled(planned.enabled)).await?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Loads the ad credential of every tenant that has one.
///
/// A tampered credential fails the run (after the other tenants are
/// processed) so it shows up in the job's error count.
pub struct MetricsSync<S, C> {
    vault: Arc<CredentialVault<S, C>>,
    credential_type: CredentialType,
}

impl<S: CredentialStore, C: PayloadCipher> JobHandler for MetricsSync<S, C> {
    async fn run(&self, cancel: CancellationToken) -> anyhow::Result<()> {
        let tenants = self.vault.tenants_with(self.credential_type).await?;
        let mut loaded = 0usize;
        let mut tampered = 0usize;

        for tenant_id in &tenants {
            if cancel.is_cancelled() {
                tracing::info!(credential_type = %self.credential_type, "metrics sync cancelled");
                return Ok(());
            }

            match self.vault.get(tenant_id, self.credential_type).await {
                Ok(_credentials) => {
                    loaded += 1;
                    tracing::debug!(
                        tenant_id = %tenant_id,
                        credential_type = %self.credential_type,
                        "credentials loaded for metrics sync"
                    );
                }
                Err(VaultError::Tampered) => tampered += 1,
                Err(e) if e.is_absent() => {}
                Err(e) => {
                    tracing::warn!(tenant_id = %tenant_id, error = %e, "skipping tenant");
                }
            }
        }

        tracing::info!(
            credential_type = %self.credential_type,
            tenants = tenants.len(),
            loaded,
            "metrics sync pass complete"
        );
        if tampered > 0 {
            bail!("{tampered} tenant credential(s) failed integrity check");
        }
        Ok(())
    }
}

/// Collects tenants holding any ad credential for a downstream stage.
pub struct AdvertiserSweep<S, C> {
    vault: Arc<CredentialVault<S, C>>,
    stage: &'static str,
}

impl<S: CredentialStore, C: PayloadCipher> AdvertiserSweep<S, C> {
    async fn advertisers(&self) -> Result<BTreeSet<String>, VaultError> {
        let mut tenants = BTreeSet::new();
        for credential_type in AD_CREDENTIALS {
            tenants.extend(self.vault.tenants_with(credential_type).await?);
        }
        Ok(tenants)
    }
}

impl<S: CredentialStore, C: PayloadCipher> JobHandler for AdvertiserSweep<S, C> {
    async fn run(&self, cancel: CancellationToken) -> anyhow::Result<()> {
        if cancel.is_cancelled() {
            return Ok(());
        }
        let tenants = self.advertisers().await?;
        tracing::info!(stage = self.stage, tenants = tenants.len(), "advertiser sweep complete");
        Ok(())
    }
}

pub struct RetentionCleanup<S, C> {
    vault: Arc<CredentialVault<S, C>>,
}

impl<S: CredentialStore, C: PayloadCipher> JobHandler for RetentionCleanup<S, C> {
    async fn run(&self, _cancel: CancellationToken) -> anyhow::Result<()> {
        let purged = self.vault.purge_expired(Utc::now()).await?;
        tracing::debug!(purged, "retention cleanup complete");
        Ok(())
    }
}
