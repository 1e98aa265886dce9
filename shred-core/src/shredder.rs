// Public encrypt/decrypt entrypoints

use crate::cache::FieldIndexCache;
use crate::cipher::KeyedTransform;
use crate::data::{Record, Value};
use crate::error::Result;
use crate::schema::Schema;
use crate::transform::{self, Mode};

/// Encrypt every sensitive field of `record` in place.
pub fn encrypt<C: KeyedTransform + ?Sized>(cipher: &C, record: &mut Record) -> Result<()> {
    Shredder::global().encrypt(cipher, record)
}

/// Decrypt every sensitive field of `record` in place.
///
/// `inline-encrypted-string` values that fail to decrypt are left untouched;
/// failures on `encrypted-string` values are returned.
pub fn decrypt<C: KeyedTransform + ?Sized>(cipher: &C, record: &mut Record) -> Result<()> {
    Shredder::global().decrypt(cipher, record)
}

pub fn encrypt_value<C: KeyedTransform + ?Sized>(
    cipher: &C,
    schema: &Schema,
    value: &mut Value,
) -> Result<()> {
    Shredder::global().encrypt_value(cipher, schema, value)
}

pub fn decrypt_value<C: KeyedTransform + ?Sized>(
    cipher: &C,
    schema: &Schema,
    value: &mut Value,
) -> Result<()> {
    Shredder::global().decrypt_value(cipher, schema, value)
}

/// Encrypt/decrypt bound to a particular field-index cache.
#[derive(Debug, Clone, Copy)]
pub struct Shredder<'c> {
    cache: &'c FieldIndexCache,
}

impl Shredder<'static> {
    pub fn global() -> Self {
        Shredder {
            cache: FieldIndexCache::global(),
        }
    }
}

impl<'c> Shredder<'c> {
    pub fn with_cache(cache: &'c FieldIndexCache) -> Self {
        Shredder { cache }
    }

    pub fn cache(&self) -> &'c FieldIndexCache {
        self.cache
    }

    pub fn encrypt<C: KeyedTransform + ?Sized>(&self, cipher: &C, record: &mut Record) -> Result<()> {
        transform::transform_record(self.cache, record, Mode::Encrypt, |s| cipher.encrypt(s))
    }

    pub fn decrypt<C: KeyedTransform + ?Sized>(&self, cipher: &C, record: &mut Record) -> Result<()> {
        transform::transform_record(self.cache, record, Mode::Decrypt, |s| cipher.decrypt(s))
    }

    pub fn encrypt_value<C: KeyedTransform + ?Sized>(
        &self,
        cipher: &C,
        schema: &Schema,
        value: &mut Value,
    ) -> Result<()> {
        transform::transform(self.cache, schema, value, Mode::Encrypt, |s| cipher.encrypt(s))
    }

    pub fn decrypt_value<C: KeyedTransform + ?Sized>(
        &self,
        cipher: &C,
        schema: &Schema,
        value: &mut Value,
    ) -> Result<()> {
        transform::transform(self.cache, schema, value, Mode::Decrypt, |s| cipher.decrypt(s))
    }
}
