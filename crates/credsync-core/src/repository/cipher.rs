//! Payload cipher trait definition.

use credsync_types::credential::{CredentialPayload, CredentialType};
use credsync_types::error::CipherError;

/// Authenticated encryption of credential payloads under a process-wide key.
///
/// Implementations are CPU-only and hold the key read-only after construction,
/// so a single instance is shared across every task.
pub trait PayloadCipher: Send + Sync {
    /// Canonicalize `payload`, encrypt under a fresh nonce and return the
    /// text-encoded envelope.
    fn encrypt(&self, payload: &CredentialPayload) -> Result<String, CipherError>;

    /// Authenticate and decrypt an envelope, then decode it into the shape
    /// associated with `credential_type`.
    fn decrypt(
        &self,
        envelope: &str,
        credential_type: CredentialType,
    ) -> Result<CredentialPayload, CipherError>;
}
