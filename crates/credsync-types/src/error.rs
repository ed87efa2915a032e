use thiserror::Error;

/// Errors from the payload cipher.
///
/// Messages never carry key material or plaintext.
#[derive(Debug, Error)]
pub enum CipherError {
    #[error("invalid master key: {0}")]
    InvalidKey(String),

    #[error("encryption failed")]
    EncryptionFailed,

    #[error("malformed ciphertext envelope")]
    Malformed,

    #[error("ciphertext failed authentication")]
    Tampered,

    #[error("payload decode error: {0}")]
    Decode(String),
}

/// Errors from repository operations (used by trait definitions in credsync-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("query error: {0}")]
    Query(String),

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors surfaced by the credential vault.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("tenant context is missing")]
    MissingTenant,

    #[error("credential not found")]
    NotFound,

    #[error("credential has expired")]
    Expired,

    #[error("credential failed integrity check")]
    Tampered,

    #[error("encryption error: {0}")]
    Encrypt(String),

    #[error("persistence error: {0}")]
    Persist(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("expires_at must be in the future")]
    InvalidExpiry,

    #[error("{field} exceeds {limit} (got {actual})")]
    Oversize {
        field: &'static str,
        limit: usize,
        actual: usize,
    },
}

impl VaultError {
    /// Stable machine-readable code for the management surface.
    pub fn code(&self) -> &'static str {
        match self {
            VaultError::MissingTenant => "MISSING_TENANT",
            VaultError::NotFound => "CREDENTIAL_NOT_FOUND",
            VaultError::Expired => "CREDENTIAL_EXPIRED",
            VaultError::Tampered => "CREDENTIAL_TAMPERED",
            VaultError::Encrypt(_) => "ENCRYPT_FAILED",
            VaultError::Persist(_) => "PERSIST_FAILED",
            VaultError::Decode(_) => "DECODE_FAILED",
            VaultError::InvalidExpiry => "INVALID_EXPIRY",
            VaultError::Oversize { .. } => "PAYLOAD_TOO_LARGE",
        }
    }

    /// `NotFound` and `Expired` both mean "not configured" to most callers.
    pub fn is_absent(&self) -> bool {
        matches!(self, VaultError::NotFound | VaultError::Expired)
    }
}

/// Errors from the sync scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("job '{0}' is already registered")]
    Duplicate(String),

    #[error("job '{0}' is not registered")]
    NotRegistered(String),

    #[error("job '{0}' must have a positive interval")]
    InvalidInterval(String),

    #[error("scheduler dispatcher already started")]
    AlreadyStarted,
}
