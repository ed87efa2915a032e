//! Configuration loader for credsync.
//!
//! Resolves the data directory and reads `config.toml` from it into
//! [`AppConfig`]. Falls back to defaults when the file is missing or
//! malformed. The master key is not read here; it arrives through the CLI
//! or the `MASTER_KEY` environment variable.

use std::path::{Path, PathBuf};

use credsync_types::config::AppConfig;

use crate::sqlite::pool::database_url_in;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "CREDSYNC_DATA_DIR";

/// Resolve the data directory.
///
/// Priority:
/// 1. An explicit path (from the CLI)
/// 2. `CREDSYNC_DATA_DIR` environment variable
/// 3. `~/.credsync`
pub fn resolve_data_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }

    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".credsync");
    }

    // Last resort: current directory
    PathBuf::from(".credsync")
}

/// Load configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`AppConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
pub async fn load_app_config(data_dir: &Path) -> AppConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return AppConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return AppConfig::default();
        }
    };

    match toml::from_str::<AppConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            AppConfig::default()
        }
    }
}

/// The configured database URL, or `credsync.db` inside the data directory.
pub fn resolve_database_url(config: &AppConfig, data_dir: &Path) -> String {
    config
        .database_url
        .clone()
        .unwrap_or_else(|| database_url_in(data_dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_app_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_app_config(tmp.path()).await;
        assert!(config.database_url.is_none());
        assert_eq!(config.scheduler.tick_ms, 5_000);
    }

    #[tokio::test]
    async fn load_app_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
[scheduler]
tick_ms = 250

[[scheduler.jobs]]
name = "calculate-roi"
interval_secs = 60
"#,
        )
        .await
        .unwrap();

        let config = load_app_config(tmp.path()).await;
        assert_eq!(config.scheduler.tick_ms, 250);
        assert_eq!(
            config.scheduler.job("calculate-roi").unwrap().interval_secs,
            Some(60)
        );
    }

    #[tokio::test]
    async fn load_app_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_app_config(tmp.path()).await;
        assert_eq!(config.scheduler.tick_ms, 5_000);
        assert!(config.scheduler.jobs.is_empty());
    }

    #[test]
    fn explicit_data_dir_wins() {
        let dir = resolve_data_dir(Some(Path::new("/srv/credsync")));
        assert_eq!(dir, PathBuf::from("/srv/credsync"));
    }

    #[test]
    fn database_url_prefers_config_override() {
        let mut config = AppConfig::default();
        let data_dir = Path::new("/srv/credsync");
        assert_eq!(
            resolve_database_url(&config, data_dir),
            "sqlite:///srv/credsync/credsync.db"
        );

        config.database_url = Some("sqlite::memory:".to_string());
        assert_eq!(resolve_database_url(&config, data_dir), "sqlite::memory:");
    }
}
