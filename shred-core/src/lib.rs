//! Schema-directed crypto-shredding for Avro records.
//!
//! Fields whose schema is a `string` tagged with the `inline-encrypted-string`
//! or `encrypted-string` logical type are encrypted under a per-subject key
//! before a record leaves the process and decrypted on the way back in.
//! Forgetting the key shreds every copy of the data.
//!
//! ```no_run
//! use shred_core::{decrypt, encrypt, AesKeyedEncryptor, Schema};
//!
//! # fn main() -> Result<(), shred_core::ShredError> {
//! let schema = Schema::parse_str(
//!     r#"{"type": "record", "name": "User", "fields": [
//!         {"name": "email", "type": {"type": "string", "logicalType": "inline-encrypted-string"}}
//!     ]}"#,
//! )?;
//! # let Schema::Record(user) = schema else { unreachable!() };
//! let mut record = shred_core::Record::new(user);
//! record.put(0, "a@b.com".into());
//!
//! let cipher = AesKeyedEncryptor::new("subject-key");
//! encrypt(&cipher, &mut record)?;
//! decrypt(&cipher, &mut record)?;
//! # Ok(())
//! # }
//! ```

pub mod binary;
pub mod cache;
pub mod cipher;
pub mod config;
pub mod data;
pub mod error;
pub mod json;
pub mod keys;
pub mod logical;
pub mod pipeline;
pub mod schema;
pub mod shredder;
pub mod transform;

pub use cache::FieldIndexCache;
pub use cipher::{AesKeyedEncryptor, KeyedTransform};
pub use config::ShredConfig;
pub use data::{Record, TaggedString, Value};
pub use error::{CipherError, CodecError, KeyError, Result, SchemaTypeError, ShredError};
pub use json::Rendering;
pub use keys::{IdentityKeyProvider, KeyProvider, StaticKeyProvider};
pub use logical::LogicalType;
pub use pipeline::{EncryptionConsumer, EncryptionProducer, Message};
pub use schema::{FieldSchema, RecordSchema, Schema};
pub use shredder::{decrypt, decrypt_value, encrypt, encrypt_value, Shredder};
pub use transform::Mode;
