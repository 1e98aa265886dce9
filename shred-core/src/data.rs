// Runtime value model for shred

use crate::schema::RecordSchema;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A string whose schema is tagged `encrypted-string`.
///
/// The variant records which side of the shredder the text is on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaggedString {
    Plain(String),
    Encrypted(String),
}

impl TaggedString {
    pub fn plain(value: impl Into<String>) -> Self {
        TaggedString::Plain(value.into())
    }

    pub fn encrypted(value: impl Into<String>) -> Self {
        TaggedString::Encrypted(value.into())
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self, TaggedString::Encrypted(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            TaggedString::Plain(s) | TaggedString::Encrypted(s) => s,
        }
    }
}

/// Runtime values, one variant per schema kind.
///
/// Union positions hold the member value directly; which member it belongs to
/// is recovered from its shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bytes(Vec<u8>),
    /// An untagged or `inline-encrypted-string` string.
    String(String),
    /// An `encrypted-string` string.
    Tagged(TaggedString),
    Record(Record),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// Enum symbol.
    Enum(String),
    Fixed(Vec<u8>),
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Bytes(_) => "bytes",
            Value::String(_) => "string",
            Value::Tagged(_) => "tagged string",
            Value::Record(_) => "record",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Enum(_) => "enum",
            Value::Fixed(_) => "fixed",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            Value::Tagged(t) => Some(t.as_str()),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<TaggedString> for Value {
    fn from(t: TaggedString) -> Self {
        Value::Tagged(t)
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Record(r)
    }
}

/// A record instance. Fields are addressed by position.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: Arc<RecordSchema>,
    fields: Vec<Value>,
}

impl Record {
    /// A record with every field set to `Null`.
    pub fn new(schema: Arc<RecordSchema>) -> Self {
        let fields = vec![Value::Null; schema.fields.len()];
        Record { schema, fields }
    }

    /// Build a record from field values in schema order.
    ///
    /// Returns `None` when the number of values does not match the schema.
    pub fn with_values(schema: Arc<RecordSchema>, fields: Vec<Value>) -> Option<Self> {
        (fields.len() == schema.fields.len()).then_some(Record { schema, fields })
    }

    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    pub fn get(&self, position: usize) -> Option<&Value> {
        self.fields.get(position)
    }

    pub fn get_mut(&mut self, position: usize) -> Option<&mut Value> {
        self.fields.get_mut(position)
    }

    /// Replace the value at `position`, returning the previous one.
    ///
    /// Out-of-range positions leave the record untouched and return `None`.
    pub fn put(&mut self, position: usize, value: Value) -> Option<Value> {
        self.fields
            .get_mut(position)
            .map(|slot| std::mem::replace(slot, value))
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.schema.field(name).and_then(|f| self.get(f.position))
    }

    pub fn put_by_name(&mut self, name: &str, value: Value) -> Option<Value> {
        let position = self.schema.field(name)?.position;
        self.put(position, value)
    }

    pub fn values(&self) -> &[Value] {
        &self.fields
    }
}
