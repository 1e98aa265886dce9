// Error types for shred

use thiserror::Error;

/// Convenience alias used across the library.
pub type Result<T> = std::result::Result<T, ShredError>;

/// Core errors across shred layers
#[derive(Debug, Error)]
pub enum ShredError {
    #[error("Schema type error: {0}")]
    SchemaType(#[from] SchemaTypeError),
    #[error("Leaf transform failed: {0}")]
    LeafTransform(#[from] CipherError),
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("Key lookup failed: {0}")]
    Key(#[from] KeyError),
}

/// Schema construction and logical type errors.
///
/// These are raised while a schema is being registered and are meant to abort
/// startup, with the exception of [`SchemaTypeError::PlainSerialization`],
/// which fires when a caller tries to put a not-yet-encrypted value on the
/// wire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaTypeError {
    #[error("'{logical}' can only be used with an underlying string type, got {base}")]
    LogicalTypeMismatch { logical: String, base: String },
    #[error("only encrypted values may be serialized")]
    PlainSerialization,
    #[error("Invalid schema: {0}")]
    Invalid(String),
    #[error("Unknown type: {0}")]
    UnknownType(String),
    #[error("Duplicate name: {0}")]
    DuplicateName(String),
    #[error("Recursive reference to '{0}' is not supported")]
    RecursiveReference(String),
}

/// Failures of the keyed string transform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    #[error("ciphertext is not well formed: {0}")]
    Format(String),
    #[error("decryption failed")]
    Crypto,
    #[error("plaintext is not valid utf-8")]
    Utf8,
}

/// Wire encoding/decoding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },
    #[error("Missing field: {0}")]
    MissingField(String),
    #[error("Unexpected end of input")]
    UnexpectedEof,
    #[error("Invalid varint")]
    InvalidVarint,
    #[error("Collection of {0} items exceeds the decode limit")]
    CollectionTooLarge(u64),
    #[error("Invalid union branch: {0}")]
    InvalidUnionBranch(String),
    #[error("Unknown enum symbol: {0}")]
    UnknownSymbol(String),
    #[error("Invalid utf-8 in string payload")]
    InvalidUtf8,
    #[error("Non-finite float {0} has no JSON representation")]
    NonFiniteFloat(String),
    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for CodecError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::UnexpectedEof => CodecError::UnexpectedEof,
            _ => CodecError::Io(error.to_string()),
        }
    }
}

/// Key material resolution errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("no key registered for id '{0}'")]
    NotFound(String),
}
