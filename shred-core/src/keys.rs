// Key id -> key material resolution

use crate::error::KeyError;
use std::collections::BTreeMap;

/// Resolves the key id carried by a message to the passphrase used to build
/// its cipher.
pub trait KeyProvider {
    fn key(&self, key_id: &str) -> Result<String, KeyError>;
}

/// Uses the key id itself as key material. Handy for tests and demos where
/// the id is already a per-subject secret.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityKeyProvider;

impl KeyProvider for IdentityKeyProvider {
    fn key(&self, key_id: &str) -> Result<String, KeyError> {
        Ok(key_id.to_string())
    }
}

/// A fixed table of keys, typically loaded from configuration.
///
/// Removing an entry shreds every message encrypted under it.
#[derive(Debug, Clone, Default)]
pub struct StaticKeyProvider {
    keys: BTreeMap<String, String>,
}

impl StaticKeyProvider {
    pub fn new(keys: BTreeMap<String, String>) -> Self {
        StaticKeyProvider { keys }
    }

    pub fn insert(&mut self, key_id: impl Into<String>, key: impl Into<String>) {
        self.keys.insert(key_id.into(), key.into());
    }

    pub fn forget(&mut self, key_id: &str) -> bool {
        self.keys.remove(key_id).is_some()
    }
}

impl KeyProvider for StaticKeyProvider {
    fn key(&self, key_id: &str) -> Result<String, KeyError> {
        self.keys
            .get(key_id)
            .cloned()
            .ok_or_else(|| KeyError::NotFound(key_id.to_string()))
    }
}
