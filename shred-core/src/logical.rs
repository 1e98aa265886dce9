// Logical type registry - the two sensitivity tags understood by shred

use crate::data::{TaggedString, Value};
use crate::error::SchemaTypeError;
use crate::schema::Schema;
use std::fmt;

/// Sensitivity tags that can be attached to a `string` schema.
///
/// Both tags are Avro logical types. A schema marks a field as sensitive by
/// writing `{"type": "string", "logicalType": "<name>"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalType {
    /// `inline-encrypted-string`: the runtime value stays a plain string and
    /// the tag is a pure schema annotation.
    InlineEncryptedString,
    /// `encrypted-string`: the runtime value is a [`TaggedString`] that tracks
    /// whether the text is plaintext or ciphertext.
    EncryptedString,
}

impl LogicalType {
    pub const INLINE_ENCRYPTED_STRING: &'static str = "inline-encrypted-string";
    pub const ENCRYPTED_STRING: &'static str = "encrypted-string";

    /// Look up a tag by its `logicalType` name. Names other than the two
    /// sensitivity tags are not ours and yield `None`.
    pub fn from_name(name: &str) -> Option<LogicalType> {
        match name {
            Self::INLINE_ENCRYPTED_STRING => Some(LogicalType::InlineEncryptedString),
            Self::ENCRYPTED_STRING => Some(LogicalType::EncryptedString),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LogicalType::InlineEncryptedString => Self::INLINE_ENCRYPTED_STRING,
            LogicalType::EncryptedString => Self::ENCRYPTED_STRING,
        }
    }

    /// Check that the tag sits on a string base schema.
    pub fn validate_schema(&self, base: &Schema) -> Result<(), SchemaTypeError> {
        match base {
            Schema::String { .. } => Ok(()),
            other => Err(SchemaTypeError::LogicalTypeMismatch {
                logical: self.name().to_string(),
                base: other.type_name(),
            }),
        }
    }

    /// Convert a string read off the wire into its logical value.
    ///
    /// Anything read off the wire under `encrypted-string` is assumed to be
    /// ciphertext.
    pub fn to_logical(&self, wire: String) -> Value {
        match self {
            LogicalType::InlineEncryptedString => Value::String(wire),
            LogicalType::EncryptedString => Value::Tagged(TaggedString::Encrypted(wire)),
        }
    }

    /// Convert a logical value into the string written on the wire.
    ///
    /// A `Plain` tagged value is refused: serialization itself is the last
    /// line that keeps an un-shredded secret off the wire.
    pub fn to_wire<'a>(&self, value: &'a Value) -> Result<&'a str, SchemaTypeError> {
        match (self, value) {
            (LogicalType::InlineEncryptedString, Value::String(s)) => Ok(s.as_str()),
            (LogicalType::EncryptedString, Value::Tagged(TaggedString::Encrypted(s))) => Ok(s.as_str()),
            (LogicalType::EncryptedString, Value::Tagged(TaggedString::Plain(_))) => {
                Err(SchemaTypeError::PlainSerialization)
            }
            (logical, other) => Err(SchemaTypeError::Invalid(format!(
                "value {} is not an instance of '{}'",
                other.kind_name(),
                logical.name()
            ))),
        }
    }

    /// Whether `value` has the runtime shape this tag produces.
    pub fn is_instance(&self, value: &Value) -> bool {
        match self {
            LogicalType::InlineEncryptedString => matches!(value, Value::String(_)),
            LogicalType::EncryptedString => matches!(value, Value::Tagged(_)),
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classification helpers used by the cache and the transformer.
impl Schema {
    /// The sensitivity tag on this node, if it is a tagged string leaf.
    pub fn logical_type(&self) -> Option<LogicalType> {
        match self {
            Schema::String { logical } => *logical,
            _ => None,
        }
    }

    pub fn is_inline_tagged(&self) -> bool {
        self.logical_type() == Some(LogicalType::InlineEncryptedString)
    }

    pub fn is_typed_tagged(&self) -> bool {
        self.logical_type() == Some(LogicalType::EncryptedString)
    }

    pub fn is_tagged_leaf(&self) -> bool {
        self.logical_type().is_some()
    }
}
