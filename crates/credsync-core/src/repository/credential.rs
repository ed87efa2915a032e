//! Credential store trait definition.

use chrono::{DateTime, Utc};

use credsync_types::credential::{CredentialMetadata, CredentialRecord, CredentialType};
use credsync_types::error::RepositoryError;

/// Repository trait for persisted credential rows.
///
/// The store never interprets `encrypted_value`. It owns row lifetime;
/// rows are never physically deleted.
pub trait CredentialStore: Send + Sync {
    /// Deactivate any active row for the record's `(tenant, type)` and insert
    /// the record as the new active row, in a single transaction.
    fn insert_active(
        &self,
        record: &CredentialRecord,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// The single active row for `(tenant, type)`, if any.
    fn find_active(
        &self,
        tenant_id: &str,
        credential_type: CredentialType,
    ) -> impl std::future::Future<Output = Result<Option<CredentialRecord>, RepositoryError>> + Send;

    /// Clear the active flag. Returns the number of rows changed (0 or 1).
    fn deactivate_active(
        &self,
        tenant_id: &str,
        credential_type: CredentialType,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// Metadata for every row of a tenant, ordered by `(type, updated_at desc)`.
    fn list_by_tenant(
        &self,
        tenant_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<CredentialMetadata>, RepositoryError>> + Send;

    /// Tenants that currently hold an active row of `credential_type`.
    fn tenants_with_active(
        &self,
        credential_type: CredentialType,
    ) -> impl std::future::Future<Output = Result<Vec<String>, RepositoryError>> + Send;

    /// Deactivate every active row whose `expires_at` is at or before `now`.
    fn deactivate_expired(
        &self,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// All versions (active and inactive) of one `(tenant, type)`, newest first.
    fn history(
        &self,
        tenant_id: &str,
        credential_type: CredentialType,
    ) -> impl std::future::Future<Output = Result<Vec<CredentialMetadata>, RepositoryError>> + Send;
}
