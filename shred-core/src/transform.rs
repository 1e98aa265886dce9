// Recursive transformer - applies a leaf transform to every tagged string
//
// The walk is driven by the schema. The field-index cache prunes record
// fields with nothing sensitive underneath, so those are never read.

use crate::cache::FieldIndexCache;
use crate::data::{Record, TaggedString, Value};
use crate::error::{CipherError, Result};
use crate::logical::LogicalType;
use crate::schema::{RecordSchema, Schema};
use std::sync::Arc;
use tracing::debug;

/// Direction of a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Encrypt,
    Decrypt,
}

/// Transform every tagged leaf of `value` in place.
///
/// `leaf` is the keyed encrypt or decrypt function matching `mode`. Its
/// errors propagate, except when decrypting an `inline-encrypted-string`:
/// such values carry no plaintext/ciphertext marker, so a value that fails
/// to decrypt is assumed to be plaintext already and is left as is.
pub fn transform<F>(
    cache: &FieldIndexCache,
    schema: &Schema,
    value: &mut Value,
    mode: Mode,
    leaf: F,
) -> Result<()>
where
    F: Fn(&str) -> std::result::Result<String, CipherError>,
{
    Transformer::new(cache, mode, &leaf).visit(schema, value)
}

/// Like [`transform`], for a record using its own schema.
pub fn transform_record<F>(
    cache: &FieldIndexCache,
    record: &mut Record,
    mode: Mode,
    leaf: F,
) -> Result<()>
where
    F: Fn(&str) -> std::result::Result<String, CipherError>,
{
    let schema = Arc::clone(record.schema());
    Transformer::new(cache, mode, &leaf).visit_record(&schema, record)
}

struct Transformer<'a, F> {
    cache: &'a FieldIndexCache,
    mode: Mode,
    leaf: &'a F,
}

impl<'a, F> Transformer<'a, F>
where
    F: Fn(&str) -> std::result::Result<String, CipherError>,
{
    fn new(cache: &'a FieldIndexCache, mode: Mode, leaf: &'a F) -> Self {
        Transformer { cache, mode, leaf }
    }

    fn visit(&self, schema: &Schema, value: &mut Value) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        // Leaves first: a tagged string inside a union is caught here.
        if self.visit_leaf(schema, value)? {
            return Ok(());
        }

        match schema {
            Schema::Record(record_schema) => match value.as_record_mut() {
                Some(record) => self.visit_record(record_schema, record),
                None => Ok(()),
            },
            Schema::Array(items) => match value {
                Value::Array(elements) => self.visit_elements(items, elements.iter_mut()),
                _ => Ok(()),
            },
            Schema::Map(values) => match value {
                Value::Map(entries) => self.visit_elements(values, entries.values_mut()),
                _ => Ok(()),
            },
            Schema::Union(members) => self.visit_union(members, value),
            _ => Ok(()),
        }
    }

    /// Apply the leaf transform if `schema` is tagged and `value` is in the
    /// state `mode` acts on. Returns whether the value was handled.
    fn visit_leaf(&self, schema: &Schema, value: &mut Value) -> Result<bool> {
        match (schema.logical_type(), self.mode, value) {
            (Some(LogicalType::InlineEncryptedString), _, Value::String(text)) => {
                self.apply_inline(text)?;
                Ok(true)
            }
            (Some(LogicalType::EncryptedString), Mode::Encrypt, Value::Tagged(tagged)) => {
                match tagged {
                    TaggedString::Plain(text) => {
                        *tagged = TaggedString::Encrypted((self.leaf)(text.as_str())?);
                        Ok(true)
                    }
                    TaggedString::Encrypted(_) => Ok(false),
                }
            }
            (Some(LogicalType::EncryptedString), Mode::Decrypt, Value::Tagged(tagged)) => {
                match tagged {
                    TaggedString::Encrypted(text) => {
                        *tagged = TaggedString::Plain((self.leaf)(text.as_str())?);
                        Ok(true)
                    }
                    TaggedString::Plain(_) => Ok(false),
                }
            }
            _ => Ok(false),
        }
    }

    fn apply_inline(&self, text: &mut String) -> Result<()> {
        match self.mode {
            Mode::Encrypt => *text = (self.leaf)(text.as_str())?,
            Mode::Decrypt => match (self.leaf)(text.as_str()) {
                Ok(plain) => *text = plain,
                Err(error) => {
                    debug!(%error, "inline value did not decrypt, keeping it unchanged");
                }
            },
        }
        Ok(())
    }

    fn visit_record(&self, schema: &RecordSchema, record: &mut Record) -> Result<()> {
        let positions = self.cache.positions_for(schema);
        for &position in positions.iter() {
            let Some(field_schema) = schema.fields.get(position) else {
                continue;
            };
            if let Some(field) = record.get_mut(position) {
                self.visit(&field_schema.schema, field)?;
            }
        }
        Ok(())
    }

    /// Shared by arrays and map values. Keys are never transformed.
    fn visit_elements<'v>(
        &self,
        item_schema: &Schema,
        elements: impl Iterator<Item = &'v mut Value>,
    ) -> Result<()> {
        if item_schema.is_inline_tagged() {
            for element in elements {
                if let Value::String(text) = element {
                    self.apply_inline(text)?;
                }
            }
            return Ok(());
        }
        if !self.cache.is_sensitive_subtree(item_schema) {
            return Ok(());
        }
        for element in elements {
            self.visit(item_schema, element)?;
        }
        Ok(())
    }

    /// Unions dispatch on the runtime shape of the value, not on the order of
    /// the member list.
    fn visit_union(&self, members: &[Schema], value: &mut Value) -> Result<()> {
        match value {
            Value::Record(record) => {
                let schema = Arc::clone(record.schema());
                self.visit_record(&schema, record)
            }
            Value::String(text) if members.iter().any(Schema::is_inline_tagged) => {
                self.apply_inline(text)
            }
            Value::Tagged(_) => match members.iter().find(|m| m.is_typed_tagged()) {
                Some(member) => self.visit(member, value),
                None => Ok(()),
            },
            Value::Map(_) => match members.iter().find(|m| matches!(m, Schema::Map(_))) {
                Some(member) => self.visit(member, value),
                None => Ok(()),
            },
            Value::Array(_) => match members.iter().find(|m| matches!(m, Schema::Array(_))) {
                Some(member) => self.visit(member, value),
                None => Ok(()),
            },
            _ => Ok(()),
        }
    }
}
