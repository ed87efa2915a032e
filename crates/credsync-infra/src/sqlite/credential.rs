//! SQLite credential store implementation.
//!
//! Implements `CredentialStore` from `credsync-core` using sqlx with split
//! read/write pools. `encrypted_value` is stored as the cipher's base64
//! envelope and never interpreted or logged here.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use credsync_core::repository::credential::CredentialStore;
use credsync_types::credential::{
    CredentialId, CredentialMetadata, CredentialRecord, CredentialType,
};
use credsync_types::error::RepositoryError;

use super::pool::DatabasePool;

const METADATA_COLUMNS: &str = "id, tenant_id, credential_type, description, is_active, \
     last_rotated_at, expires_at, created_at, updated_at";

const RECORD_COLUMNS: &str = "id, tenant_id, credential_type, encrypted_value, description, \
     is_active, last_rotated_at, expires_at, created_at, updated_at";

/// SQLite-backed implementation of `CredentialStore`.
pub struct SqliteCredentialStore {
    pool: DatabasePool,
}

impl SqliteCredentialStore {
    /// Create a new store backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn parse_optional_datetime(s: Option<String>) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    s.as_deref().map(parse_datetime).transpose()
}

/// Fixed-width UTC timestamps so that text comparison in SQL orders correctly.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn query_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

fn insert_error(e: sqlx::Error) -> RepositoryError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::Conflict("an active credential already exists".to_string())
        }
        _ => query_error(e),
    }
}

fn row_to_metadata(row: &SqliteRow) -> Result<CredentialMetadata, RepositoryError> {
    let id: String = row.try_get("id").map_err(query_error)?;
    let credential_type: String = row.try_get("credential_type").map_err(query_error)?;
    let created_at: String = row.try_get("created_at").map_err(query_error)?;
    let updated_at: String = row.try_get("updated_at").map_err(query_error)?;

    Ok(CredentialMetadata {
        id: id
            .parse::<CredentialId>()
            .map_err(|e| RepositoryError::Query(format!("invalid credential id: {e}")))?,
        tenant_id: row.try_get("tenant_id").map_err(query_error)?,
        credential_type: credential_type
            .parse::<CredentialType>()
            .map_err(RepositoryError::Query)?,
        description: row.try_get("description").map_err(query_error)?,
        is_active: row.try_get("is_active").map_err(query_error)?,
        last_rotated_at: parse_optional_datetime(
            row.try_get("last_rotated_at").map_err(query_error)?,
        )?,
        expires_at: parse_optional_datetime(row.try_get("expires_at").map_err(query_error)?)?,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

fn row_to_record(row: &SqliteRow) -> Result<CredentialRecord, RepositoryError> {
    let meta = row_to_metadata(row)?;
    Ok(CredentialRecord {
        id: meta.id,
        tenant_id: meta.tenant_id,
        credential_type: meta.credential_type,
        encrypted_value: row.try_get("encrypted_value").map_err(query_error)?,
        description: meta.description,
        is_active: meta.is_active,
        last_rotated_at: meta.last_rotated_at,
        expires_at: meta.expires_at,
        created_at: meta.created_at,
        updated_at: meta.updated_at,
    })
}

impl CredentialStore for SqliteCredentialStore {
    async fn insert_active(&self, record: &CredentialRecord) -> Result<(), RepositoryError> {
        let now = format_datetime(&record.updated_at);
        let mut tx = self.pool.writer.begin().await.map_err(query_error)?;

        sqlx::query(
            "UPDATE tenant_credentials SET is_active = 0, updated_at = ?
             WHERE tenant_id = ? AND credential_type = ? AND is_active = 1",
        )
        .bind(&now)
        .bind(&record.tenant_id)
        .bind(record.credential_type.as_str())
        .execute(&mut *tx)
        .await
        .map_err(query_error)?;

        sqlx::query(
            "INSERT INTO tenant_credentials (id, tenant_id, credential_type, encrypted_value, description,
                is_active, last_rotated_at, expires_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, 1, ?, ?, ?, ?)",
        )
        .bind(record.id.to_string())
        .bind(&record.tenant_id)
        .bind(record.credential_type.as_str())
        .bind(&record.encrypted_value)
        .bind(&record.description)
        .bind(record.last_rotated_at.as_ref().map(format_datetime))
        .bind(record.expires_at.as_ref().map(format_datetime))
        .bind(format_datetime(&record.created_at))
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(insert_error)?;

        tx.commit().await.map_err(query_error)?;
        Ok(())
    }

    async fn find_active(
        &self,
        tenant_id: &str,
        credential_type: CredentialType,
    ) -> Result<Option<CredentialRecord>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM tenant_credentials
             WHERE tenant_id = ? AND credential_type = ? AND is_active = 1"
        ))
        .bind(tenant_id)
        .bind(credential_type.as_str())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(query_error)?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn deactivate_active(
        &self,
        tenant_id: &str,
        credential_type: CredentialType,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE tenant_credentials SET is_active = 0, updated_at = ?
             WHERE tenant_id = ? AND credential_type = ? AND is_active = 1",
        )
        .bind(format_datetime(&Utc::now()))
        .bind(tenant_id)
        .bind(credential_type.as_str())
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(result.rows_affected())
    }

    async fn list_by_tenant(
        &self,
        tenant_id: &str,
    ) -> Result<Vec<CredentialMetadata>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {METADATA_COLUMNS} FROM tenant_credentials
             WHERE tenant_id = ?
             ORDER BY credential_type ASC, updated_at DESC"
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        rows.iter().map(row_to_metadata).collect()
    }

    async fn tenants_with_active(
        &self,
        credential_type: CredentialType,
    ) -> Result<Vec<String>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT DISTINCT tenant_id FROM tenant_credentials
             WHERE credential_type = ? AND is_active = 1
             ORDER BY tenant_id",
        )
        .bind(credential_type.as_str())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        rows.iter()
            .map(|row| row.try_get("tenant_id").map_err(query_error))
            .collect()
    }

    async fn deactivate_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let now = format_datetime(&now);
        let result = sqlx::query(
            "UPDATE tenant_credentials SET is_active = 0, updated_at = ?
             WHERE is_active = 1 AND expires_at IS NOT NULL AND expires_at <= ?",
        )
        .bind(&now)
        .bind(&now)
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(result.rows_affected())
    }

    async fn history(
        &self,
        tenant_id: &str,
        credential_type: CredentialType,
    ) -> Result<Vec<CredentialMetadata>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {METADATA_COLUMNS} FROM tenant_credentials
             WHERE tenant_id = ? AND credential_type = ?
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(tenant_id)
        .bind(credential_type.as_str())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_error)?;

        rows.iter().map(row_to_metadata).collect()
    }
}
