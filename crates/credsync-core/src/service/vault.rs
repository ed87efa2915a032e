//! Credential vault service.
//!
//! `CredentialVault` composes a [`PayloadCipher`] and a [`CredentialStore`]
//! into the tenant-scoped credential contract: store, get, rotate, revoke and
//! list. Every operation takes the tenant explicitly and rejects a blank one.
//!
//! The active-uniqueness invariant per `(tenant, type)` is held by the store's
//! `insert_active` transaction; the vault never writes rows any other way.

use chrono::{DateTime, Utc};

use credsync_types::credential::{
    CredentialId, CredentialKind, CredentialMetadata, CredentialPayload, CredentialRecord,
    CredentialType, MAX_DESCRIPTION_CHARS, MAX_PAYLOAD_BYTES,
};
use credsync_types::error::{CipherError, RepositoryError, VaultError};

use crate::repository::cipher::PayloadCipher;
use crate::repository::credential::CredentialStore;

/// Tenant-scoped credential vault over a store and a cipher.
pub struct CredentialVault<S, C> {
    store: S,
    cipher: C,
}

impl<S: CredentialStore, C: PayloadCipher> CredentialVault<S, C> {
    pub fn new(store: S, cipher: C) -> Self {
        Self { store, cipher }
    }

    /// Encrypt and persist `payload` as the active credential of its type.
    ///
    /// Any previously active credential of the same type is superseded in the
    /// same transaction. `last_rotated_at` is left unset.
    pub async fn store(
        &self,
        tenant_id: &str,
        payload: &CredentialPayload,
        description: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<CredentialMetadata, VaultError> {
        let tenant_id = require_tenant(tenant_id)?;
        let record = self.seal(tenant_id, payload, description, expires_at, false)?;
        self.store
            .insert_active(&record)
            .await
            .map_err(persist_error)?;

        tracing::info!(
            tenant_id = %tenant_id,
            credential_type = %record.credential_type,
            credential_id = %record.id,
            "credential stored"
        );
        Ok(record.metadata())
    }

    /// Fetch and decrypt the active credential of `credential_type`.
    pub async fn get(
        &self,
        tenant_id: &str,
        credential_type: CredentialType,
    ) -> Result<CredentialPayload, VaultError> {
        let tenant_id = require_tenant(tenant_id)?;
        let record = self
            .store
            .find_active(tenant_id, credential_type)
            .await
            .map_err(persist_error)?
            .ok_or(VaultError::NotFound)?;

        if record.is_expired_at(Utc::now()) {
            return Err(VaultError::Expired);
        }

        match self.cipher.decrypt(&record.encrypted_value, credential_type) {
            Ok(payload) => Ok(payload),
            // Stored envelopes are produced by this vault, so a malformed
            // envelope is corruption of the same kind as a failed tag.
            Err(CipherError::Tampered | CipherError::Malformed) => {
                tracing::error!(
                    target: "security",
                    tenant_id = %tenant_id,
                    credential_type = %credential_type,
                    credential_id = %record.id,
                    "credential ciphertext failed authentication"
                );
                Err(VaultError::Tampered)
            }
            Err(e) => Err(VaultError::Decode(e.to_string())),
        }
    }

    /// Typed variant of [`get`](Self::get).
    pub async fn get_as<T: CredentialKind + Clone>(&self, tenant_id: &str) -> Result<T, VaultError> {
        let payload = self.get(tenant_id, T::TYPE).await?;
        T::from_payload(&payload)
            .cloned()
            .ok_or_else(|| VaultError::Decode(format!("payload is not {}", T::TYPE)))
    }

    /// Replace the active credential with `payload`, stamping `last_rotated_at`.
    ///
    /// The previous version stays in the store as inactive history. When
    /// `description` is `None` the previous description carries over.
    pub async fn rotate(
        &self,
        tenant_id: &str,
        payload: &CredentialPayload,
        description: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<CredentialMetadata, VaultError> {
        let tenant_id = require_tenant(tenant_id)?;
        let description = match description {
            Some(d) => d.to_string(),
            None => self
                .store
                .find_active(tenant_id, payload.credential_type())
                .await
                .map_err(persist_error)?
                .map(|previous| previous.description)
                .unwrap_or_default(),
        };

        let record = self.seal(tenant_id, payload, &description, expires_at, true)?;
        self.store
            .insert_active(&record)
            .await
            .map_err(persist_error)?;

        tracing::info!(
            tenant_id = %tenant_id,
            credential_type = %record.credential_type,
            credential_id = %record.id,
            "credential rotated"
        );
        Ok(record.metadata())
    }

    /// Deactivate the active credential, if any.
    ///
    /// Idempotent: returns `Ok(false)` when nothing was active.
    pub async fn revoke(
        &self,
        tenant_id: &str,
        credential_type: CredentialType,
    ) -> Result<bool, VaultError> {
        let tenant_id = require_tenant(tenant_id)?;
        let changed = self
            .store
            .deactivate_active(tenant_id, credential_type)
            .await
            .map_err(persist_error)?;

        if changed > 0 {
            tracing::info!(
                tenant_id = %tenant_id,
                credential_type = %credential_type,
                "credential revoked"
            );
        }
        Ok(changed > 0)
    }

    /// Metadata for every credential version of the tenant. Never decrypts.
    pub async fn list(&self, tenant_id: &str) -> Result<Vec<CredentialMetadata>, VaultError> {
        let tenant_id = require_tenant(tenant_id)?;
        self.store
            .list_by_tenant(tenant_id)
            .await
            .map_err(persist_error)
    }

    /// Every stored version of one credential type, newest first.
    pub async fn history(
        &self,
        tenant_id: &str,
        credential_type: CredentialType,
    ) -> Result<Vec<CredentialMetadata>, VaultError> {
        let tenant_id = require_tenant(tenant_id)?;
        self.store
            .history(tenant_id, credential_type)
            .await
            .map_err(persist_error)
    }

    /// Tenants holding an active credential of `credential_type`.
    pub async fn tenants_with(
        &self,
        credential_type: CredentialType,
    ) -> Result<Vec<String>, VaultError> {
        self.store
            .tenants_with_active(credential_type)
            .await
            .map_err(persist_error)
    }

    /// Deactivate every credential whose expiry has passed at `now`.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, VaultError> {
        let count = self
            .store
            .deactivate_expired(now)
            .await
            .map_err(persist_error)?;
        if count > 0 {
            tracing::info!(count, "expired credentials deactivated");
        }
        Ok(count)
    }

    /// Validate bounds, encrypt and build the row to insert.
    fn seal(
        &self,
        tenant_id: &str,
        payload: &CredentialPayload,
        description: &str,
        expires_at: Option<DateTime<Utc>>,
        rotated: bool,
    ) -> Result<CredentialRecord, VaultError> {
        let now = Utc::now();
        // Sealing replaces the active row, so an already expired credential
        // would switch off a working one.
        if expires_at.is_some_and(|at| at <= now) {
            return Err(VaultError::InvalidExpiry);
        }

        let description_chars = description.chars().count();
        if description_chars > MAX_DESCRIPTION_CHARS {
            return Err(VaultError::Oversize {
                field: "description",
                limit: MAX_DESCRIPTION_CHARS,
                actual: description_chars,
            });
        }

        let payload_bytes = payload
            .canonical_bytes()
            .map_err(|e| VaultError::Encrypt(e.to_string()))?
            .len();
        if payload_bytes > MAX_PAYLOAD_BYTES {
            return Err(VaultError::Oversize {
                field: "payload",
                limit: MAX_PAYLOAD_BYTES,
                actual: payload_bytes,
            });
        }

        let encrypted_value = self
            .cipher
            .encrypt(payload)
            .map_err(|e| VaultError::Encrypt(e.to_string()))?;

        Ok(CredentialRecord {
            id: CredentialId::new(),
            tenant_id: tenant_id.to_string(),
            credential_type: payload.credential_type(),
            encrypted_value,
            description: description.to_string(),
            is_active: true,
            last_rotated_at: rotated.then_some(now),
            expires_at,
            created_at: now,
            updated_at: now,
        })
    }
}

fn require_tenant(tenant_id: &str) -> Result<&str, VaultError> {
    if tenant_id.trim().is_empty() {
        Err(VaultError::MissingTenant)
    } else {
        Ok(tenant_id)
    }
}

fn persist_error(e: RepositoryError) -> VaultError {
    VaultError::Persist(e.to_string())
}
