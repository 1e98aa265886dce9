// Schema layer - the Avro type model and its JSON document parser

use crate::data::Value;
use crate::error::SchemaTypeError;
use crate::logical::LogicalType;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Schema definition for values
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Schema {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String { logical: Option<LogicalType> },
    Record(Arc<RecordSchema>),
    Array(Box<Schema>),
    Map(Box<Schema>),
    Union(Vec<Schema>),
    Enum(Arc<EnumSchema>),
    Fixed(Arc<FixedSchema>),
}

/// Schema for records
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordSchema {
    pub name: String,
    pub namespace: Option<String>,
    pub fields: Vec<FieldSchema>,
}

/// Schema for record fields
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldSchema {
    pub name: String,
    pub position: usize,
    pub schema: Schema,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumSchema {
    pub name: String,
    pub namespace: Option<String>,
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FixedSchema {
    pub name: String,
    pub namespace: Option<String>,
    pub size: usize,
}

impl RecordSchema {
    /// Namespace-qualified name.
    pub fn fullname(&self) -> String {
        fullname(&self.name, self.namespace.as_deref())
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, position: usize, schema: Schema) -> Self {
        FieldSchema {
            name: name.into(),
            position,
            schema,
        }
    }
}

impl EnumSchema {
    pub fn fullname(&self) -> String {
        fullname(&self.name, self.namespace.as_deref())
    }
}

impl FixedSchema {
    pub fn fullname(&self) -> String {
        fullname(&self.name, self.namespace.as_deref())
    }
}

impl Schema {
    /// Parse an Avro JSON schema document.
    pub fn parse_str(input: &str) -> Result<Schema, SchemaTypeError> {
        let json: JsonValue =
            serde_json::from_str(input).map_err(|e| SchemaTypeError::Invalid(e.to_string()))?;
        Schema::parse(&json)
    }

    /// Parse an already-decoded Avro JSON schema.
    pub fn parse(json: &JsonValue) -> Result<Schema, SchemaTypeError> {
        Parser::default().parse(json, None)
    }

    /// A plain, untagged string schema.
    pub fn string() -> Schema {
        Schema::String { logical: None }
    }

    /// A string schema carrying the given sensitivity tag.
    pub fn tagged(logical: LogicalType) -> Schema {
        Schema::String {
            logical: Some(logical),
        }
    }

    /// The Avro type name. Named types report their full name, which is also
    /// the branch name used by the JSON encoding of unions.
    pub fn type_name(&self) -> String {
        match self {
            Schema::Null => "null".to_string(),
            Schema::Boolean => "boolean".to_string(),
            Schema::Int => "int".to_string(),
            Schema::Long => "long".to_string(),
            Schema::Float => "float".to_string(),
            Schema::Double => "double".to_string(),
            Schema::Bytes => "bytes".to_string(),
            Schema::String { .. } => "string".to_string(),
            Schema::Record(r) => r.fullname(),
            Schema::Array(_) => "array".to_string(),
            Schema::Map(_) => "map".to_string(),
            Schema::Union(_) => "union".to_string(),
            Schema::Enum(e) => e.fullname(),
            Schema::Fixed(f) => f.fullname(),
        }
    }

    /// Shallow shape check: does `value` look like an instance of this schema?
    ///
    /// Nested values are not inspected. Used to pick union branches.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Schema::Null, Value::Null)
            | (Schema::Boolean, Value::Boolean(_))
            | (Schema::Int, Value::Int(_))
            | (Schema::Long, Value::Long(_))
            | (Schema::Float, Value::Float(_))
            | (Schema::Double, Value::Double(_))
            | (Schema::Bytes, Value::Bytes(_))
            | (Schema::Array(_), Value::Array(_))
            | (Schema::Map(_), Value::Map(_)) => true,
            (Schema::String { logical: None }, Value::String(_)) => true,
            (Schema::String { logical: Some(logical) }, value) => logical.is_instance(value),
            (Schema::Record(schema), Value::Record(record)) => {
                record.schema().fullname() == schema.fullname()
            }
            (Schema::Enum(schema), Value::Enum(symbol)) => schema.symbols.contains(symbol),
            (Schema::Fixed(schema), Value::Fixed(bytes)) => bytes.len() == schema.size,
            (Schema::Union(members), value) => members.iter().any(|m| m.accepts(value)),
            _ => false,
        }
    }

    /// Every record schema reachable from this node, depth first, each once.
    pub fn records(&self) -> Vec<Arc<RecordSchema>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        collect_records(self, &mut seen, &mut out);
        out
    }
}

fn collect_records(
    schema: &Schema,
    seen: &mut HashSet<String>,
    out: &mut Vec<Arc<RecordSchema>>,
) {
    match schema {
        Schema::Record(record) => {
            if seen.insert(record.fullname()) {
                out.push(Arc::clone(record));
                for field in &record.fields {
                    collect_records(&field.schema, seen, out);
                }
            }
        }
        Schema::Array(inner) | Schema::Map(inner) => collect_records(inner, seen, out),
        Schema::Union(members) => {
            for member in members {
                collect_records(member, seen, out);
            }
        }
        _ => {}
    }
}

fn fullname(name: &str, namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => format!("{}.{}", ns, name),
        _ => name.to_string(),
    }
}

fn primitive(name: &str) -> Option<Schema> {
    Some(match name {
        "null" => Schema::Null,
        "boolean" => Schema::Boolean,
        "int" => Schema::Int,
        "long" => Schema::Long,
        "float" => Schema::Float,
        "double" => Schema::Double,
        "bytes" => Schema::Bytes,
        "string" => Schema::string(),
        _ => return None,
    })
}

/// Tracks named types while a document is parsed.
///
/// Named types may be referenced once fully defined. A reference to a type
/// whose definition is still open is a recursive schema, which shred does not
/// support.
#[derive(Default)]
struct Parser {
    named: HashMap<String, Schema>,
    open: HashSet<String>,
}

impl Parser {
    fn parse(
        &mut self,
        json: &JsonValue,
        namespace: Option<&str>,
    ) -> Result<Schema, SchemaTypeError> {
        match json {
            JsonValue::String(name) => self.resolve(name, namespace),
            JsonValue::Array(members) => members
                .iter()
                .map(|member| self.parse(member, namespace))
                .collect::<Result<Vec<_>, _>>()
                .map(Schema::Union),
            JsonValue::Object(object) => self.parse_object(object, namespace),
            other => Err(SchemaTypeError::Invalid(format!(
                "unexpected schema element: {}",
                other
            ))),
        }
    }

    fn resolve(&self, name: &str, namespace: Option<&str>) -> Result<Schema, SchemaTypeError> {
        if let Some(schema) = primitive(name) {
            return Ok(schema);
        }
        let qualified = if name.contains('.') {
            name.to_string()
        } else {
            fullname(name, namespace)
        };
        for candidate in [qualified.as_str(), name] {
            if self.open.contains(candidate) {
                return Err(SchemaTypeError::RecursiveReference(candidate.to_string()));
            }
            if let Some(schema) = self.named.get(candidate) {
                return Ok(schema.clone());
            }
        }
        Err(SchemaTypeError::UnknownType(name.to_string()))
    }

    fn parse_object(
        &mut self,
        object: &JsonMap<String, JsonValue>,
        namespace: Option<&str>,
    ) -> Result<Schema, SchemaTypeError> {
        let type_json = object
            .get("type")
            .ok_or_else(|| SchemaTypeError::Invalid("schema object without 'type'".to_string()))?;

        let base = match type_json {
            JsonValue::String(kind) => match kind.as_str() {
                "record" | "error" => self.parse_record(object, namespace)?,
                "enum" => self.parse_enum(object, namespace)?,
                "fixed" => self.parse_fixed(object, namespace)?,
                "array" => {
                    let items = required(object, "items")?;
                    Schema::Array(Box::new(self.parse(items, namespace)?))
                }
                "map" => {
                    let values = required(object, "values")?;
                    Schema::Map(Box::new(self.parse(values, namespace)?))
                }
                other => self.resolve(other, namespace)?,
            },
            nested => self.parse(nested, namespace)?,
        };

        match object.get("logicalType").and_then(JsonValue::as_str) {
            Some(name) => attach_logical(name, base),
            None => Ok(base),
        }
    }

    fn parse_record(
        &mut self,
        object: &JsonMap<String, JsonValue>,
        namespace: Option<&str>,
    ) -> Result<Schema, SchemaTypeError> {
        let (name, ns) = self.declare(object, namespace)?;
        let qualified = fullname(&name, ns.as_deref());

        let fields_json = required(object, "fields")?
            .as_array()
            .ok_or_else(|| SchemaTypeError::Invalid(format!("fields of {} must be a list", qualified)))?;

        let mut fields = Vec::with_capacity(fields_json.len());
        let mut field_names = HashSet::new();
        for (position, field_json) in fields_json.iter().enumerate() {
            let field_object = field_json.as_object().ok_or_else(|| {
                SchemaTypeError::Invalid(format!(
                    "field {} of {} must be an object",
                    position, qualified
                ))
            })?;
            let field_name = required(field_object, "name")?
                .as_str()
                .ok_or_else(|| SchemaTypeError::Invalid("field name must be a string".to_string()))?
                .to_string();

            if !field_names.insert(field_name.clone()) {
                return Err(SchemaTypeError::DuplicateName(format!(
                    "{}.{}",
                    qualified, field_name
                )));
            }

            let field_type = field_object
                .get("type")
                .ok_or_else(|| SchemaTypeError::Invalid(format!("field {} has no type", field_name)))?;
            let schema = self.parse(field_type, ns.as_deref())?;
            fields.push(FieldSchema::new(field_name, position, schema));
        }

        let schema = Schema::Record(Arc::new(RecordSchema {
            name,
            namespace: ns,
            fields,
        }));
        self.define(qualified, schema.clone());
        Ok(schema)
    }

    fn parse_enum(
        &mut self,
        object: &JsonMap<String, JsonValue>,
        namespace: Option<&str>,
    ) -> Result<Schema, SchemaTypeError> {
        let (name, ns) = self.declare(object, namespace)?;
        let symbols = required(object, "symbols")?
            .as_array()
            .and_then(|symbols| {
                symbols
                    .iter()
                    .map(|s| s.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
            })
            .ok_or_else(|| SchemaTypeError::Invalid(format!("symbols of {} must be strings", name)))?;

        let qualified = fullname(&name, ns.as_deref());
        let schema = Schema::Enum(Arc::new(EnumSchema {
            name,
            namespace: ns,
            symbols,
        }));
        self.define(qualified, schema.clone());
        Ok(schema)
    }

    fn parse_fixed(
        &mut self,
        object: &JsonMap<String, JsonValue>,
        namespace: Option<&str>,
    ) -> Result<Schema, SchemaTypeError> {
        let (name, ns) = self.declare(object, namespace)?;
        let size = required(object, "size")?
            .as_u64()
            .ok_or_else(|| SchemaTypeError::Invalid(format!("size of {} must be a number", name)))?;

        let qualified = fullname(&name, ns.as_deref());
        let schema = Schema::Fixed(Arc::new(FixedSchema {
            name,
            namespace: ns,
            size: size as usize,
        }));
        self.define(qualified, schema.clone());
        Ok(schema)
    }

    /// Read the name/namespace of a named type and mark it open.
    fn declare(
        &mut self,
        object: &JsonMap<String, JsonValue>,
        enclosing: Option<&str>,
    ) -> Result<(String, Option<String>), SchemaTypeError> {
        let raw = required(object, "name")?
            .as_str()
            .ok_or_else(|| SchemaTypeError::Invalid("name must be a string".to_string()))?;

        let (name, namespace) = match raw.rsplit_once('.') {
            Some((ns, name)) => (name.to_string(), Some(ns.to_string())),
            None => {
                let ns = object
                    .get("namespace")
                    .and_then(JsonValue::as_str)
                    .or(enclosing)
                    .filter(|ns| !ns.is_empty())
                    .map(str::to_string);
                (raw.to_string(), ns)
            }
        };

        let qualified = fullname(&name, namespace.as_deref());
        if self.named.contains_key(&qualified) || !self.open.insert(qualified.clone()) {
            return Err(SchemaTypeError::DuplicateName(qualified));
        }
        Ok((name, namespace))
    }

    fn define(&mut self, qualified: String, schema: Schema) {
        self.open.remove(&qualified);
        self.named.insert(qualified, schema);
    }
}

fn required<'a>(
    object: &'a JsonMap<String, JsonValue>,
    key: &str,
) -> Result<&'a JsonValue, SchemaTypeError> {
    object
        .get(key)
        .ok_or_else(|| SchemaTypeError::Invalid(format!("missing '{}'", key)))
}

/// Attach a `logicalType` annotation. Names other than the sensitivity tags
/// are ignored and the base schema is kept.
fn attach_logical(name: &str, base: Schema) -> Result<Schema, SchemaTypeError> {
    match LogicalType::from_name(name) {
        Some(logical) => {
            logical.validate_schema(&base)?;
            Ok(Schema::tagged(logical))
        }
        None => Ok(base),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_primitives() {
        assert_eq!(Schema::parse_str("\"long\"").unwrap(), Schema::Long);
        assert_eq!(
            Schema::parse_str(r#"{"type": "string"}"#).unwrap(),
            Schema::string()
        );
    }

    #[test]
    fn test_parse_record_with_namespace() {
        let schema = Schema::parse_str(
            r#"{
                "type": "record",
                "name": "User",
                "namespace": "com.example",
                "fields": [
                    {"name": "id", "type": "string"},
                    {"name": "email", "type": {"type": "string", "logicalType": "encrypted-string"}}
                ]
            }"#,
        )
        .unwrap();

        let Schema::Record(record) = schema else {
            panic!("Expected record");
        };
        assert_eq!(record.fullname(), "com.example.User");
        assert_eq!(record.fields[1].position, 1);
        assert!(record.fields[1].schema.is_typed_tagged());
    }

    #[test]
    fn test_named_reference_reuses_definition() {
        let schema = Schema::parse_str(
            r#"{
                "type": "record",
                "name": "Pair",
                "fields": [
                    {"name": "left", "type": {"type": "record", "name": "Secret", "fields": [
                        {"name": "value", "type": {"type": "string", "logicalType": "inline-encrypted-string"}}
                    ]}},
                    {"name": "right", "type": "Secret"}
                ]
            }"#,
        )
        .unwrap();

        let Schema::Record(pair) = schema else {
            panic!("Expected record");
        };
        assert_eq!(pair.fields[0].schema, pair.fields[1].schema);
    }

    #[test]
    fn test_unknown_logical_type_is_ignored() {
        let schema =
            Schema::parse_str(r#"{"type": "long", "logicalType": "timestamp-millis"}"#).unwrap();
        assert_eq!(schema, Schema::Long);
    }

    #[test]
    fn test_records_are_collected_once() {
        let schema = Schema::parse_str(
            r#"{"type": "record", "name": "Outer", "fields": [
                {"name": "a", "type": {"type": "record", "name": "Inner", "fields": [{"name": "x", "type": "int"}]}},
                {"name": "b", "type": {"type": "array", "items": "Inner"}},
                {"name": "c", "type": ["null", "Inner"]}
            ]}"#,
        )
        .unwrap();

        let names: Vec<_> = schema.records().iter().map(|r| r.fullname()).collect();
        assert_eq!(names, vec!["Outer".to_string(), "Inner".to_string()]);
    }

    #[test]
    fn test_accepts_distinguishes_tagged_strings() {
        let typed = Schema::tagged(LogicalType::EncryptedString);
        let inline = Schema::tagged(LogicalType::InlineEncryptedString);
        let tagged = Value::Tagged(crate::data::TaggedString::plain("x"));

        assert!(typed.accepts(&tagged));
        assert!(!typed.accepts(&Value::from("x")));
        assert!(inline.accepts(&Value::from("x")));
        assert!(!inline.accepts(&tagged));
    }
}
