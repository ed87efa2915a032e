//! Application state wiring the vault, injector and scheduler together.
//!
//! The core services are generic over store and cipher; AppState pins them to
//! the SQLite store and the AES-256-GCM cipher.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use credsync_core::credential::injector::CredentialInjector;
use credsync_core::sync::scheduler::SyncScheduler;
use credsync_infra::config::resolve_database_url;
use credsync_infra::crypto::cipher::AesGcmCipher;
use credsync_infra::sqlite::credential::SqliteCredentialStore;
use credsync_infra::vault::{SqliteVault, open_vault};
use credsync_types::config::AppConfig;
use credsync_types::credential::CredentialType;

/// Injector pinned to the deployed vault.
pub type ConcreteInjector = CredentialInjector<SqliteCredentialStore, AesGcmCipher>;

/// Shared application state.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub vault: Arc<SqliteVault>,
    /// Loads every credential type for the request's tenant.
    pub injector: Arc<ConcreteInjector>,
    pub scheduler: SyncScheduler,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Open the vault and build the (unstarted) scheduler.
    ///
    /// Fails on a missing or invalid master key before touching the database.
    pub async fn init(
        data_dir: PathBuf,
        config: AppConfig,
        master_key: &SecretString,
    ) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&data_dir).await?;

        let db_url = resolve_database_url(&config, &data_dir);
        let vault = open_vault(&db_url, master_key).await?;
        tracing::debug!(data_dir = %data_dir.display(), "vault opened");

        Ok(Self::from_vault(vault, config))
    }

    /// Assemble state around an already opened vault.
    pub fn from_vault(vault: SqliteVault, config: AppConfig) -> Self {
        let vault = Arc::new(vault);
        let injector = CredentialInjector::new(Arc::clone(&vault), CredentialType::ALL);
        let scheduler = SyncScheduler::new(Duration::from_millis(config.scheduler.tick_ms));

        Self {
            vault,
            injector: Arc::new(injector),
            scheduler,
            config: Arc::new(config),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A fixed test master key (32 bytes of 0x07, base64).
    pub const TEST_MASTER_KEY: &str = "BwcHBwcHBwcHBwcHBwcHBwcHBwcHBwcHBwcHBwcHBwc=";

    /// State over a fresh database in a temp directory.
    pub async fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::init(
            dir.path().to_path_buf(),
            AppConfig::default(),
            &SecretString::from(TEST_MASTER_KEY.to_string()),
        )
        .await
        .unwrap();
        (state, dir)
    }

    #[tokio::test]
    async fn test_init_creates_database_in_data_dir() {
        let (state, dir) = test_state().await;
        assert!(dir.path().join("credsync.db").exists());
        assert_eq!(state.injector.required().len(), CredentialType::ALL.len());
        assert!(!state.scheduler.is_started());
    }

    #[tokio::test]
    async fn test_init_rejects_bad_master_key() {
        let dir = tempfile::tempdir().unwrap();
        let result = AppState::init(
            dir.path().to_path_buf(),
            AppConfig::default(),
            &SecretString::from("too-short".to_string()),
        )
        .await;
        assert!(result.is_err());
        assert!(!dir.path().join("credsync.db").exists());
    }
}
