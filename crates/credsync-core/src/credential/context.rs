//! Typed per-request credential map.

use std::collections::BTreeMap;

use credsync_types::credential::{CredentialKind, CredentialPayload, CredentialType};

/// Decrypted credentials published for one request, keyed by type.
///
/// Built fresh for every request and never shared across requests. Fetch
/// through [`get`](Self::get) with the payload struct as the key:
///
/// ```ignore
/// if let Some(smtp) = ctx.get::<EmailSmtpCredential>() { /* ... */ }
/// ```
#[derive(Debug, Clone, Default)]
pub struct CredentialContext {
    entries: BTreeMap<CredentialType, CredentialPayload>,
}

impl CredentialContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a payload under its own type, replacing any earlier entry.
    pub fn insert(&mut self, payload: CredentialPayload) {
        self.entries.insert(payload.credential_type(), payload);
    }

    pub fn get<T: CredentialKind>(&self) -> Option<&T> {
        self.entries.get(&T::TYPE).and_then(T::from_payload)
    }

    pub fn contains(&self, credential_type: CredentialType) -> bool {
        self.entries.contains_key(&credential_type)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
