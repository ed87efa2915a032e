//! Production wiring of the credential vault: SQLite store + AES-256-GCM.

use secrecy::SecretString;
use thiserror::Error;

use credsync_core::service::vault::CredentialVault;
use credsync_types::error::CipherError;

use crate::crypto::cipher::AesGcmCipher;
use crate::sqlite::credential::SqliteCredentialStore;
use crate::sqlite::pool::DatabasePool;

/// The vault as deployed.
pub type SqliteVault = CredentialVault<SqliteCredentialStore, AesGcmCipher>;

/// Fatal errors while bringing the vault up.
#[derive(Debug, Error)]
pub enum VaultInitError {
    #[error("master key rejected: {0}")]
    MasterKey(#[from] CipherError),

    #[error("database unavailable: {0}")]
    Database(#[from] sqlx::Error),
}

/// Validate the master key, open the database and build the vault.
///
/// The key is checked first so a bad key never touches the database.
pub async fn open_vault(
    database_url: &str,
    master_key: &SecretString,
) -> Result<SqliteVault, VaultInitError> {
    let cipher = AesGcmCipher::from_base64_key(master_key)?;
    let pool = DatabasePool::new(database_url).await?;
    Ok(CredentialVault::new(SqliteCredentialStore::new(pool), cipher))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use credsync_types::credential::{
        CredentialPayload, CredentialType, EmailSmtpCredential, RazorpayCredential,
    };
    use credsync_types::error::VaultError;
    use credsync_types::secret::Redacted;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn master_key() -> SecretString {
        SecretString::from(STANDARD.encode([7u8; 32]))
    }

    async fn test_vault() -> (SqliteVault, DatabasePool, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("vault.db").display());
        let pool = DatabasePool::new(&url).await.unwrap();
        let cipher = AesGcmCipher::from_base64_key(&master_key()).unwrap();
        let vault = CredentialVault::new(SqliteCredentialStore::new(pool.clone()), cipher);
        (vault, pool, dir)
    }

    fn smtp() -> CredentialPayload {
        CredentialPayload::EmailSmtp(EmailSmtpCredential {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: "u".to_string(),
            password: Redacted::new("p"),
            from_name: "N".to_string(),
            from_email: "n@x".to_string(),
            tls: true,
        })
    }

    fn razorpay(key_id: &str, key_secret: &str) -> CredentialPayload {
        CredentialPayload::Razorpay(RazorpayCredential {
            key_id: key_id.to_string(),
            key_secret: Redacted::new(key_secret),
        })
    }

    #[tokio::test]
    async fn test_open_vault_rejects_bad_key_before_database() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("never.db").display());
        let err = open_vault(&url, &SecretString::from("short".to_string()))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, VaultInitError::MasterKey(_)));
        assert!(!dir.path().join("never.db").exists());
    }

    #[tokio::test]
    async fn test_store_then_get_is_tenant_scoped() {
        let (vault, _pool, _dir) = test_vault().await;
        vault.store("t1", &smtp(), "", None).await.unwrap();

        let payload = vault.get("t1", CredentialType::EmailSmtp).await.unwrap();
        assert_eq!(payload, smtp());

        let err = vault.get("t2", CredentialType::EmailSmtp).await.unwrap_err();
        assert!(matches!(err, VaultError::NotFound));
    }

    #[tokio::test]
    async fn test_rotation_keeps_one_active_and_history() {
        let (vault, pool, _dir) = test_vault().await;
        vault
            .store("t1", &razorpay("k1", "s1"), "gateway", None)
            .await
            .unwrap();
        vault
            .rotate("t1", &razorpay("k2", "s2"), None, None)
            .await
            .unwrap();

        assert_eq!(
            vault.get("t1", CredentialType::Razorpay).await.unwrap(),
            razorpay("k2", "s2")
        );

        let active: Vec<_> = vault
            .list("t1")
            .await
            .unwrap()
            .into_iter()
            .filter(|m| m.is_active && m.credential_type == CredentialType::Razorpay)
            .collect();
        assert_eq!(active.len(), 1);
        assert!(active[0].last_rotated_at.is_some());

        let (total, inactive): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), SUM(CASE WHEN is_active = 0 THEN 1 ELSE 0 END) FROM tenant_credentials",
        )
        .fetch_one(&pool.reader)
        .await
        .unwrap();
        assert_eq!((total, inactive), (2, 1));
    }

    #[tokio::test]
    async fn test_bit_flip_reports_tampered() {
        let (vault, pool, _dir) = test_vault().await;
        vault.store("t1", &smtp(), "", None).await.unwrap();

        let (id, envelope): (String, String) =
            sqlx::query_as("SELECT id, encrypted_value FROM tenant_credentials")
                .fetch_one(&pool.reader)
                .await
                .unwrap();
        let mut raw = STANDARD.decode(&envelope).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        sqlx::query("UPDATE tenant_credentials SET encrypted_value = ? WHERE id = ?")
            .bind(STANDARD.encode(&raw))
            .bind(&id)
            .execute(&pool.writer)
            .await
            .unwrap();

        let err = vault.get("t1", CredentialType::EmailSmtp).await.unwrap_err();
        assert!(matches!(err, VaultError::Tampered));
    }

    #[tokio::test]
    async fn test_any_text_mutation_reports_tampered() {
        let (vault, pool, _dir) = test_vault().await;
        vault.store("t1", &razorpay("k", "s"), "", None).await.unwrap();

        let (id, envelope): (String, String) =
            sqlx::query_as("SELECT id, encrypted_value FROM tenant_credentials")
                .fetch_one(&pool.reader)
                .await
                .unwrap();

        for i in [0, envelope.len() / 2, envelope.len() - 1] {
            let mut bytes = envelope.clone().into_bytes();
            bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
            let mutated = String::from_utf8(bytes).unwrap();
            sqlx::query("UPDATE tenant_credentials SET encrypted_value = ? WHERE id = ?")
                .bind(&mutated)
                .bind(&id)
                .execute(&pool.writer)
                .await
                .unwrap();

            let err = vault.get("t1", CredentialType::Razorpay).await.unwrap_err();
            assert!(matches!(err, VaultError::Tampered), "position {i} not detected");
        }
    }

    #[tokio::test]
    async fn test_revoke_twice_then_not_found() {
        let (vault, _pool, _dir) = test_vault().await;
        vault.store("t1", &smtp(), "", None).await.unwrap();

        assert!(vault.revoke("t1", CredentialType::EmailSmtp).await.is_ok());
        assert!(vault.revoke("t1", CredentialType::EmailSmtp).await.is_ok());
        let err = vault.get("t1", CredentialType::EmailSmtp).await.unwrap_err();
        assert!(matches!(err, VaultError::NotFound));
    }

    #[tokio::test]
    async fn test_list_never_leaks_payload_values() {
        let (vault, _pool, _dir) = test_vault().await;
        vault.store("t1", &smtp(), "mail", None).await.unwrap();
        vault
            .store("t1", &razorpay("rzp_key_id_1", "rzp_secret_1"), "pay", None)
            .await
            .unwrap();

        let listed = serde_json::to_string(&vault.list("t1").await.unwrap()).unwrap();
        for value in ["smtp.example.com", "n@x", "rzp_key_id_1", "rzp_secret_1"] {
            assert!(!listed.contains(value), "list leaked {value}");
        }
    }

    #[tokio::test]
    async fn test_concurrent_writes_leave_one_active() {
        let (vault, _pool, _dir) = test_vault().await;
        let vault = Arc::new(vault);

        let mut tasks = Vec::new();
        for i in 0..8 {
            let vault = Arc::clone(&vault);
            tasks.push(tokio::spawn(async move {
                let payload = razorpay(&format!("k{i}"), &format!("s{i}"));
                if i % 2 == 0 {
                    vault.store("t1", &payload, "", None).await
                } else {
                    vault.rotate("t1", &payload, None, None).await
                }
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let history = vault.history("t1", CredentialType::Razorpay).await.unwrap();
        assert_eq!(history.len(), 8);
        assert_eq!(history.iter().filter(|m| m.is_active).count(), 1);
        assert!(vault.get("t1", CredentialType::Razorpay).await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_reads_during_rotation_always_find_a_credential() {
        let (vault, _pool, _dir) = test_vault().await;
        let vault = Arc::new(vault);
        vault.store("t1", &razorpay("k0", "s0"), "", None).await.unwrap();
        let done = Arc::new(AtomicBool::new(false));

        let reader = {
            let vault = Arc::clone(&vault);
            let done = Arc::clone(&done);
            tokio::spawn(async move {
                let mut reads = 0u32;
                loop {
                    let finished = done.load(Ordering::SeqCst);
                    match vault.get("t1", CredentialType::Razorpay).await {
                        Ok(CredentialPayload::Razorpay(c)) => assert!(c.key_id.starts_with('k')),
                        Ok(other) => panic!("unexpected payload {other:?}"),
                        Err(e) => panic!("read during rotation failed: {e}"),
                    }
                    reads += 1;
                    if finished {
                        return reads;
                    }
                }
            })
        };

        for i in 1..=30 {
            let payload = razorpay(&format!("k{i}"), &format!("s{i}"));
            vault.rotate("t1", &payload, None, None).await.unwrap();
        }
        done.store(true, Ordering::SeqCst);

        assert!(reader.await.unwrap() > 0);
        let history = vault.history("t1", CredentialType::Razorpay).await.unwrap();
        assert_eq!(history.len(), 31);
        assert_eq!(history.iter().filter(|m| m.is_active).count(), 1);
    }

    #[tokio::test]
    async fn test_stored_envelopes_are_unique() {
        let (vault, pool, _dir) = test_vault().await;
        vault.store("t1", &smtp(), "", None).await.unwrap();
        vault.store("t1", &smtp(), "", None).await.unwrap();

        let rows: Vec<(String,)> = sqlx::query_as("SELECT encrypted_value FROM tenant_credentials")
            .fetch_all(&pool.reader)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_ne!(rows[0].0, rows[1].0);
    }

    #[tokio::test]
    async fn test_purge_expired_through_store() {
        let (vault, pool, _dir) = test_vault().await;
        let tomorrow = chrono::Utc::now() + chrono::Duration::days(1);
        vault.store("t1", &smtp(), "", Some(tomorrow)).await.unwrap();

        let past = chrono::Utc::now() - chrono::Duration::days(1);
        sqlx::query("UPDATE tenant_credentials SET expires_at = ?")
            .bind(past.to_rfc3339_opts(chrono::SecondsFormat::Micros, true))
            .execute(&pool.writer)
            .await
            .unwrap();

        let err = vault.get("t1", CredentialType::EmailSmtp).await.unwrap_err();
        assert!(matches!(err, VaultError::Expired));

        assert_eq!(vault.purge_expired(chrono::Utc::now()).await.unwrap(), 1);
        let store_view = vault.tenants_with(CredentialType::EmailSmtp).await.unwrap();
        assert!(store_view.is_empty());
    }
}
