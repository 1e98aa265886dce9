// JSON layer - Avro JSON encoding of schema-typed values

use crate::data::{Record, TaggedString, Value};
use crate::error::{CodecError, Result, ShredError};
use crate::logical::LogicalType;
use crate::schema::Schema;
use serde_json::{Map as JsonMap, Number, Value as JsonValue};
use std::collections::BTreeMap;
use std::sync::Arc;

/// How `encrypted-string` values cross the JSON boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rendering {
    /// The wire form. Only encrypted values may be written; everything read is
    /// taken to be ciphertext.
    Wire,
    /// Local authoring and display. Values read are plaintext; both states
    /// render their text.
    Plaintext,
}

/// Render a value as Avro JSON.
///
/// Unions render `null` as `null` and every other branch as a single-key
/// object `{"<type name>": value}`. Bytes and fixed values map each byte to
/// the code point of the same number.
pub fn to_json(schema: &Schema, value: &Value, rendering: Rendering) -> Result<JsonValue> {
    let json = match (schema, value) {
        (Schema::Null, Value::Null) => JsonValue::Null,
        (Schema::Boolean, Value::Boolean(b)) => JsonValue::Bool(*b),
        (Schema::Int, Value::Int(n)) => JsonValue::from(*n),
        (Schema::Long, Value::Long(n)) => JsonValue::from(*n),
        (Schema::Float, Value::Float(f)) => float(f64::from(*f))?,
        (Schema::Double, Value::Double(f)) => float(*f)?,
        (Schema::Bytes, Value::Bytes(bytes)) => JsonValue::String(latin1(bytes)),
        (Schema::String { logical: Some(logical) }, value) => match rendering {
            Rendering::Wire => JsonValue::String(logical.to_wire(value)?.to_string()),
            Rendering::Plaintext => match (logical, value) {
                (LogicalType::InlineEncryptedString, Value::String(s))
                | (LogicalType::EncryptedString, Value::Tagged(TaggedString::Plain(s)))
                | (LogicalType::EncryptedString, Value::Tagged(TaggedString::Encrypted(s))) => {
                    JsonValue::String(s.clone())
                }
                _ => return Err(mismatch(schema, value.kind_name())),
            },
        },
        (Schema::String { logical: None }, Value::String(s)) => JsonValue::String(s.clone()),
        (Schema::Record(record_schema), Value::Record(record)) => {
            if record.schema().fullname() != record_schema.fullname() {
                return Err(mismatch(schema, value.kind_name()));
            }
            let mut object = JsonMap::new();
            for field in &record_schema.fields {
                let field_value = record
                    .get(field.position)
                    .ok_or_else(|| CodecError::MissingField(field.name.clone()))?;
                object.insert(
                    field.name.clone(),
                    to_json(&field.schema, field_value, rendering)?,
                );
            }
            JsonValue::Object(object)
        }
        (Schema::Array(items), Value::Array(elements)) => JsonValue::Array(
            elements
                .iter()
                .map(|element| to_json(items, element, rendering))
                .collect::<Result<Vec<_>>>()?,
        ),
        (Schema::Map(values), Value::Map(entries)) => {
            let mut object = JsonMap::new();
            for (key, entry) in entries {
                object.insert(key.clone(), to_json(values, entry, rendering)?);
            }
            JsonValue::Object(object)
        }
        (Schema::Union(members), value) => {
            let member = members
                .iter()
                .find(|member| member.accepts(value))
                .ok_or_else(|| CodecError::InvalidUnionBranch(value.kind_name().to_string()))?;
            match member {
                Schema::Null => JsonValue::Null,
                member => {
                    let mut object = JsonMap::new();
                    object.insert(member.type_name(), to_json(member, value, rendering)?);
                    JsonValue::Object(object)
                }
            }
        }
        (Schema::Enum(enum_schema), Value::Enum(symbol)) => {
            if !enum_schema.symbols.contains(symbol) {
                return Err(CodecError::UnknownSymbol(symbol.clone()).into());
            }
            JsonValue::String(symbol.clone())
        }
        (Schema::Fixed(fixed), Value::Fixed(bytes)) if bytes.len() == fixed.size => {
            JsonValue::String(latin1(bytes))
        }
        (schema, value) => return Err(mismatch(schema, value.kind_name())),
    };
    Ok(json)
}

/// Read a value from Avro JSON.
pub fn from_json(schema: &Schema, json: &JsonValue, rendering: Rendering) -> Result<Value> {
    let value = match (schema, json) {
        (Schema::Null, JsonValue::Null) => Value::Null,
        (Schema::Boolean, JsonValue::Bool(b)) => Value::Boolean(*b),
        (Schema::Int, JsonValue::Number(n)) => {
            let n = n
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .ok_or_else(|| mismatch(schema, "number"))?;
            Value::Int(n)
        }
        (Schema::Long, JsonValue::Number(n)) => {
            Value::Long(n.as_i64().ok_or_else(|| mismatch(schema, "number"))?)
        }
        (Schema::Float, JsonValue::Number(n)) => {
            Value::Float(n.as_f64().ok_or_else(|| mismatch(schema, "number"))? as f32)
        }
        (Schema::Double, JsonValue::Number(n)) => {
            Value::Double(n.as_f64().ok_or_else(|| mismatch(schema, "number"))?)
        }
        (Schema::Bytes, JsonValue::String(s)) => Value::Bytes(from_latin1(schema, s)?),
        (Schema::String { logical }, JsonValue::String(s)) => match (logical, rendering) {
            (None, _) => Value::String(s.clone()),
            (Some(logical), Rendering::Wire) => logical.to_logical(s.clone()),
            (Some(LogicalType::InlineEncryptedString), Rendering::Plaintext) => {
                Value::String(s.clone())
            }
            (Some(LogicalType::EncryptedString), Rendering::Plaintext) => {
                Value::Tagged(TaggedString::plain(s.clone()))
            }
        },
        (Schema::Record(record_schema), JsonValue::Object(object)) => {
            let fields = record_schema
                .fields
                .iter()
                .map(|field| {
                    let field_json = object
                        .get(&field.name)
                        .ok_or_else(|| CodecError::MissingField(field.name.clone()))?;
                    from_json(&field.schema, field_json, rendering)
                })
                .collect::<Result<Vec<_>>>()?;
            let record = Record::with_values(Arc::clone(record_schema), fields)
                .ok_or_else(|| CodecError::MissingField(record_schema.fullname()))?;
            Value::Record(record)
        }
        (Schema::Array(items), JsonValue::Array(elements)) => Value::Array(
            elements
                .iter()
                .map(|element| from_json(items, element, rendering))
                .collect::<Result<Vec<_>>>()?,
        ),
        (Schema::Map(values), JsonValue::Object(object)) => {
            let mut entries = BTreeMap::new();
            for (key, entry) in object {
                entries.insert(key.clone(), from_json(values, entry, rendering)?);
            }
            Value::Map(entries)
        }
        (Schema::Union(members), JsonValue::Null) if members.contains(&Schema::Null) => {
            Value::Null
        }
        (Schema::Union(members), JsonValue::Object(object)) if object.len() == 1 => {
            let (branch, inner) = object
                .iter()
                .next()
                .ok_or_else(|| CodecError::InvalidUnionBranch("{}".to_string()))?;
            let member = members
                .iter()
                .find(|member| member.type_name() == *branch)
                .ok_or_else(|| CodecError::InvalidUnionBranch(branch.clone()))?;
            from_json(member, inner, rendering)?
        }
        (Schema::Union(_), other) => {
            return Err(CodecError::InvalidUnionBranch(json_kind(other).to_string()).into())
        }
        (Schema::Enum(enum_schema), JsonValue::String(symbol)) => {
            if !enum_schema.symbols.contains(symbol) {
                return Err(CodecError::UnknownSymbol(symbol.clone()).into());
            }
            Value::Enum(symbol.clone())
        }
        (Schema::Fixed(fixed), JsonValue::String(s)) => {
            let bytes = from_latin1(schema, s)?;
            if bytes.len() != fixed.size {
                return Err(mismatch(schema, &format!("{} bytes", bytes.len())));
            }
            Value::Fixed(bytes)
        }
        (schema, other) => return Err(mismatch(schema, json_kind(other))),
    };
    Ok(value)
}

fn float(f: f64) -> Result<JsonValue> {
    Number::from_f64(f)
        .map(JsonValue::Number)
        .ok_or_else(|| CodecError::NonFiniteFloat(f.to_string()).into())
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn from_latin1(schema: &Schema, s: &str) -> Result<Vec<u8>> {
    s.chars()
        .map(|c| u8::try_from(c).map_err(|_| mismatch(schema, "code point above U+00FF")))
        .collect()
}

fn json_kind(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

fn mismatch(schema: &Schema, actual: &str) -> ShredError {
    CodecError::TypeMismatch {
        expected: schema.type_name(),
        actual: actual.to_string(),
    }
    .into()
}
