// Producer/consumer adapters that shred messages in flight

use crate::binary;
use crate::cipher::AesKeyedEncryptor;
use crate::config::ShredConfig;
use crate::data::Value;
use crate::error::Result;
use crate::keys::KeyProvider;
use crate::schema::Schema;
use crate::shredder::Shredder;
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// A message travelling through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub headers: BTreeMap<String, String>,
    pub value: Value,
}

impl Message {
    pub fn new(value: Value) -> Self {
        Message {
            headers: BTreeMap::new(),
            value,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Encrypts outgoing record values under the key named by the message header.
///
/// Messages without the header, or whose value is not a record, pass through
/// unchanged.
pub struct EncryptionProducer<P> {
    provider: P,
    config: ShredConfig,
}

/// Decrypts incoming record values; the mirror of [`EncryptionProducer`].
pub struct EncryptionConsumer<P> {
    provider: P,
    config: ShredConfig,
}

impl<P: KeyProvider> EncryptionProducer<P> {
    pub fn new(provider: P, config: ShredConfig) -> Self {
        EncryptionProducer { provider, config }
    }

    pub fn process(&self, message: &mut Message) -> Result<()> {
        let Some(cipher) = resolve_cipher(&self.provider, &self.config, message)? else {
            return Ok(());
        };
        if let Value::Record(record) = &mut message.value {
            Shredder::global().encrypt(&cipher, record)?;
        }
        Ok(())
    }

    /// Process the message, then serialize its value.
    pub fn encode(&self, message: &mut Message, schema: &Schema) -> Result<Vec<u8>> {
        self.process(message)?;
        binary::encode(schema, &message.value)
    }
}

impl<P: KeyProvider> EncryptionConsumer<P> {
    pub fn new(provider: P, config: ShredConfig) -> Self {
        EncryptionConsumer { provider, config }
    }

    pub fn process(&self, message: &mut Message) -> Result<()> {
        let Some(cipher) = resolve_cipher(&self.provider, &self.config, message)? else {
            return Ok(());
        };
        if let Value::Record(record) = &mut message.value {
            Shredder::global().decrypt(&cipher, record)?;
        }
        Ok(())
    }

    /// Deserialize a payload, then process the resulting message.
    pub fn decode(
        &self,
        headers: BTreeMap<String, String>,
        schema: &Schema,
        payload: &[u8],
    ) -> Result<Message> {
        let value = binary::decode(schema, payload)?;
        let mut message = Message { headers, value };
        self.process(&mut message)?;
        Ok(message)
    }
}

fn resolve_cipher<P: KeyProvider>(
    provider: &P,
    config: &ShredConfig,
    message: &Message,
) -> Result<Option<AesKeyedEncryptor>> {
    if message.value.as_record().is_none() {
        trace!(kind = message.value.kind_name(), "value is not a record, passing through");
        return Ok(None);
    }
    let Some(key_id) = message.headers.get(&config.key_header) else {
        debug!(header = %config.key_header, "no key header, passing through");
        return Ok(None);
    };
    let key = provider.key(key_id)?;
    Ok(Some(AesKeyedEncryptor::new(&key)))
}
