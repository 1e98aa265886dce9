// Configuration for the pipeline adapters and the CLI

use crate::keys::StaticKeyProvider;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Header carrying the key id of a message, unless configured otherwise.
pub const DEFAULT_KEY_HEADER: &str = "crypto-shredding-key";

/// Settings shared by the producer/consumer adapters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShredConfig {
    /// Message header holding the key id.
    pub key_header: String,
    /// Key id -> passphrase, for [`StaticKeyProvider`].
    pub keys: BTreeMap<String, String>,
}

impl Default for ShredConfig {
    fn default() -> Self {
        Self {
            key_header: DEFAULT_KEY_HEADER.to_string(),
            keys: BTreeMap::new(),
        }
    }
}

impl ShredConfig {
    pub fn from_json_str(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    pub fn key_provider(&self) -> StaticKeyProvider {
        StaticKeyProvider::new(self.keys.clone())
    }
}
