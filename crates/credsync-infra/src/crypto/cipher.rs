//! AES-256-GCM payload cipher.
//!
//! AesGcmCipher encrypts canonical credential payloads under a single
//! process-wide 256-bit master key, supplied as base64 at startup.
//!
//! Envelope format: `base64(nonce (12 bytes) || ciphertext || tag (16 bytes))`
//!
//! SECURITY: Error types never contain plaintext or key material.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use secrecy::{ExposeSecret, SecretString};

use credsync_core::repository::cipher::PayloadCipher;
use credsync_types::credential::{CredentialPayload, CredentialType};
use credsync_types::error::CipherError;

/// Nonce size for AES-256-GCM (96 bits / 12 bytes).
const NONCE_SIZE: usize = 12;

/// Authentication tag size for AES-256-GCM.
const TAG_SIZE: usize = 16;

/// Master key length in bytes.
pub const KEY_SIZE: usize = 32;

/// AES-256-GCM encryption for credential payloads at rest.
///
/// Each encryption call generates a random 12-byte nonce, prepended to the
/// ciphertext, so encrypting the same payload twice produces different output.
pub struct AesGcmCipher {
    cipher: Aes256Gcm,
}

impl AesGcmCipher {
    /// Create a cipher from a raw 32-byte key.
    pub fn new(key: &[u8; KEY_SIZE]) -> Self {
        Self {
            cipher: Aes256Gcm::new(key.into()),
        }
    }

    /// Create a cipher from a base64-encoded 32-byte key.
    ///
    /// Empty, non-base64 or wrong-length keys are rejected.
    pub fn from_base64_key(key: &SecretString) -> Result<Self, CipherError> {
        let encoded = key.expose_secret().trim();
        if encoded.is_empty() {
            return Err(CipherError::InvalidKey("key is empty".to_string()));
        }

        let bytes = STANDARD
            .decode(encoded)
            .map_err(|_| CipherError::InvalidKey("key is not valid base64".to_string()))?;
        let key: [u8; KEY_SIZE] = bytes.as_slice().try_into().map_err(|_| {
            CipherError::InvalidKey(format!(
                "expected {KEY_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;

        Ok(Self::new(&key))
    }

    /// Generate a fresh random master key, base64-encoded.
    pub fn generate_key() -> SecretString {
        let mut key = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        SecretString::from(STANDARD.encode(key))
    }

    /// Encrypt raw bytes. Returns `nonce || ciphertext`.
    pub fn encrypt_bytes(&self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| CipherError::EncryptionFailed)?;

        let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        result.extend_from_slice(&nonce);
        result.extend_from_slice(&ciphertext);
        Ok(result)
    }

    /// Decrypt data produced by [`encrypt_bytes`](Self::encrypt_bytes).
    pub fn decrypt_bytes(&self, data: &[u8]) -> Result<Vec<u8>, CipherError> {
        if data.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CipherError::Malformed);
        }

        let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CipherError::Tampered)
    }
}

impl PayloadCipher for AesGcmCipher {
    fn encrypt(&self, payload: &CredentialPayload) -> Result<String, CipherError> {
        let plaintext = payload
            .canonical_bytes()
            .map_err(|e| CipherError::Decode(e.to_string()))?;
        let sealed = self.encrypt_bytes(&plaintext)?;
        Ok(STANDARD.encode(sealed))
    }

    fn decrypt(
        &self,
        envelope: &str,
        credential_type: CredentialType,
    ) -> Result<CredentialPayload, CipherError> {
        let sealed = STANDARD
            .decode(envelope)
            .map_err(|_| CipherError::Malformed)?;
        let plaintext = self.decrypt_bytes(&sealed)?;
        // Type-mismatch errors quote the offending value, so only the shape is reported.
        CredentialPayload::from_canonical_bytes(credential_type, &plaintext)
            .map_err(|_| CipherError::Decode(format!("plaintext is not a {credential_type} payload")))
    }
}
