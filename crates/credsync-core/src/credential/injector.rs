//! Context injector: loads the credentials a request needs into its context.
//!
//! Degradation rules:
//! - no tenant on the request: nothing is loaded, the request proceeds
//! - credential absent or expired: the key is omitted and logged
//! - ciphertext fails authentication: the whole injection fails
//!
//! Other vault errors (store unavailable, decode mismatch) are logged and the
//! key is omitted. No state is cached between calls.

use std::sync::Arc;

use futures_util::future::join_all;

use credsync_types::credential::CredentialType;
use credsync_types::error::VaultError;

use super::context::CredentialContext;
use crate::repository::cipher::PayloadCipher;
use crate::repository::credential::CredentialStore;
use crate::service::vault::CredentialVault;

pub struct CredentialInjector<S, C> {
    vault: Arc<CredentialVault<S, C>>,
    required: Vec<CredentialType>,
}

impl<S: CredentialStore, C: PayloadCipher> CredentialInjector<S, C> {
    /// Create an injector that loads `required` on every call to [`inject`](Self::inject).
    pub fn new(
        vault: Arc<CredentialVault<S, C>>,
        required: impl IntoIterator<Item = CredentialType>,
    ) -> Self {
        let mut required: Vec<CredentialType> = required.into_iter().collect();
        required.sort();
        required.dedup();
        Self { vault, required }
    }

    pub fn required(&self) -> &[CredentialType] {
        &self.required
    }

    /// Load the injector's configured types for `tenant_id` into `ctx`.
    ///
    /// Returns how many credentials were published.
    pub async fn inject(
        &self,
        tenant_id: Option<&str>,
        ctx: &mut CredentialContext,
    ) -> Result<usize, VaultError> {
        self.inject_types(tenant_id, &self.required, ctx).await
    }

    /// Load an explicit set of types, for callers that decide per request.
    pub async fn inject_types(
        &self,
        tenant_id: Option<&str>,
        types: &[CredentialType],
        ctx: &mut CredentialContext,
    ) -> Result<usize, VaultError> {
        let Some(tenant_id) = tenant_id.filter(|t| !t.trim().is_empty()) else {
            tracing::debug!("no tenant on request, skipping credential injection");
            return Ok(0);
        };

        let fetches = types.iter().map(|&credential_type| async move {
            (credential_type, self.vault.get(tenant_id, credential_type).await)
        });

        let mut published = 0;
        for (credential_type, result) in join_all(fetches).await {
            match result {
                Ok(payload) => {
                    ctx.insert(payload);
                    published += 1;
                }
                Err(VaultError::Tampered) => return Err(VaultError::Tampered),
                Err(e) if e.is_absent() => {
                    tracing::debug!(
                        tenant_id = %tenant_id,
                        credential_type = %credential_type,
                        reason = %e,
                        "credential not configured, omitting from context"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        tenant_id = %tenant_id,
                        credential_type = %credential_type,
                        error = %e,
                        "failed to load credential, omitting from context"
                    );
                }
            }
        }

        Ok(published)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::vault::tests::{corrupt_envelopes, insert_expired, smtp_payload, vault};
    use credsync_types::credential::{AwsS3Credential, EmailSmtpCredential};

    #[tokio::test]
    async fn test_injects_present_and_omits_missing() {
        let vault = Arc::new(vault());
        vault.store("t1", &smtp_payload(), "", None).await.unwrap();

        let injector = CredentialInjector::new(
            vault,
            [CredentialType::EmailSmtp, CredentialType::AwsS3],
        );
        let mut ctx = CredentialContext::new();
        let published = injector.inject(Some("t1"), &mut ctx).await.unwrap();

        assert_eq!(published, 1);
        assert!(ctx.get::<EmailSmtpCredential>().is_some());
        assert!(ctx.get::<AwsS3Credential>().is_none());
    }

    #[tokio::test]
    async fn test_missing_tenant_is_noop() {
        let vault = Arc::new(vault());
        vault.store("t1", &smtp_payload(), "", None).await.unwrap();

        let injector = CredentialInjector::new(vault, [CredentialType::EmailSmtp]);
        let mut ctx = CredentialContext::new();

        assert_eq!(injector.inject(None, &mut ctx).await.unwrap(), 0);
        assert_eq!(injector.inject(Some("  "), &mut ctx).await.unwrap(), 0);
        assert!(ctx.is_empty());
    }

    #[tokio::test]
    async fn test_tampered_credential_fails_injection() {
        let vault = Arc::new(vault());
        vault.store("t1", &smtp_payload(), "", None).await.unwrap();
        corrupt_envelopes(&vault);

        let injector = CredentialInjector::new(vault, [CredentialType::EmailSmtp]);
        let mut ctx = CredentialContext::new();
        let err = injector.inject(Some("t1"), &mut ctx).await.unwrap_err();
        assert!(matches!(err, VaultError::Tampered));
    }

    #[tokio::test]
    async fn test_expired_credential_omitted() {
        let vault = Arc::new(vault());
        insert_expired(&vault, "t1", &smtp_payload()).await;

        let injector = CredentialInjector::new(vault, [CredentialType::EmailSmtp]);
        let mut ctx = CredentialContext::new();
        assert_eq!(injector.inject(Some("t1"), &mut ctx).await.unwrap(), 0);
        assert!(ctx.is_empty());
    }

    #[tokio::test]
    async fn test_required_types_deduplicated() {
        let injector = CredentialInjector::new(
            Arc::new(vault()),
            [
                CredentialType::Slack,
                CredentialType::EmailSmtp,
                CredentialType::Slack,
            ],
        );
        assert_eq!(
            injector.required(),
            &[CredentialType::EmailSmtp, CredentialType::Slack]
        );
    }
}
