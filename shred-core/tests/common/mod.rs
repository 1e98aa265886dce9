// Test utilities and generators for shred property-based testing

#![allow(dead_code)]

use proptest::prelude::*;
use shred_core::{CipherError, KeyedTransform, Record, RecordSchema, Schema, TaggedString, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const USER_SCHEMA: &str = r#"{
    "type": "record",
    "name": "User",
    "namespace": "com.example",
    "fields": [
        {"name": "id", "type": "string"},
        {"name": "email", "type": {"type": "string", "logicalType": "encrypted-string"}},
        {"name": "tags", "type": {"type": "array", "items": {"type": "string", "logicalType": "inline-encrypted-string"}}}
    ]
}"#;

/// Exercises every container kind with both tags underneath.
pub const PROFILE_SCHEMA: &str = r#"{
    "type": "record",
    "name": "Profile",
    "namespace": "com.example",
    "fields": [
        {"name": "id", "type": "string"},
        {"name": "age", "type": "int"},
        {"name": "email", "type": {"type": "string", "logicalType": "encrypted-string"}},
        {"name": "nickname", "type": ["null", {"type": "string", "logicalType": "inline-encrypted-string"}]},
        {"name": "tags", "type": {"type": "array", "items": {"type": "string", "logicalType": "inline-encrypted-string"}}},
        {"name": "notes", "type": {"type": "map", "values": {"type": "string", "logicalType": "encrypted-string"}}},
        {"name": "address", "type": ["null", {
            "type": "record",
            "name": "Address",
            "fields": [
                {"name": "street", "type": {"type": "string", "logicalType": "inline-encrypted-string"}},
                {"name": "city", "type": "string"},
                {"name": "zip", "type": {"type": "string", "logicalType": "encrypted-string"}}
            ]
        }]},
        {"name": "visits", "type": {"type": "array", "items": {
            "type": "record",
            "name": "Visit",
            "fields": [
                {"name": "page", "type": "string"},
                {"name": "referrer", "type": {"type": "string", "logicalType": "inline-encrypted-string"}}
            ]
        }}},
        {"name": "recovery", "type": ["null", {"type": "string", "logicalType": "encrypted-string"}]}
    ]
}"#;

pub fn user_schema() -> Schema {
    Schema::parse_str(USER_SCHEMA).expect("user schema parses")
}

pub fn profile_schema() -> Schema {
    Schema::parse_str(PROFILE_SCHEMA).expect("profile schema parses")
}

pub fn record_schema(schema: &Schema) -> Arc<RecordSchema> {
    match schema {
        Schema::Record(record) => Arc::clone(record),
        other => panic!("Expected record schema, got {}", other.type_name()),
    }
}

/// The record schema named `name` somewhere under `schema`.
pub fn named_record(schema: &Schema, name: &str) -> Arc<RecordSchema> {
    schema
        .records()
        .into_iter()
        .find(|r| r.name == name)
        .unwrap_or_else(|| panic!("no record named {}", name))
}

pub fn user(id: &str, email: &str, tags: &[&str]) -> Record {
    Record::with_values(
        record_schema(&user_schema()),
        vec![
            Value::from(id),
            Value::Tagged(TaggedString::plain(email)),
            Value::Array(tags.iter().map(|&t| Value::from(t)).collect()),
        ],
    )
    .expect("user arity")
}

/// A deterministic cipher whose decrypt never fails.
///
/// Rotates printable ASCII by `key` positions; anything else is kept. Under
/// the wrong key it yields garbage instead of an error.
#[derive(Debug, Clone, Copy)]
pub struct ShiftCipher {
    pub key: u8,
}

const PRINTABLE_START: u8 = 0x20;
const PRINTABLE_SPAN: u8 = 95;

fn rotate(text: &str, by: u8) -> String {
    text.chars()
        .map(|c| {
            if (' '..='~').contains(&c) {
                let offset = (c as u8 - PRINTABLE_START + by) % PRINTABLE_SPAN;
                char::from(offset + PRINTABLE_START)
            } else {
                c
            }
        })
        .collect()
}

impl KeyedTransform for ShiftCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        Ok(rotate(plaintext, self.key % PRINTABLE_SPAN))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        Ok(rotate(ciphertext, PRINTABLE_SPAN - self.key % PRINTABLE_SPAN))
    }
}

/// Every string reachable under a tagged leaf of `value`, in visiting order.
pub fn tagged_texts(schema: &Schema, value: &Value, out: &mut Vec<String>) {
    match (schema, value) {
        (Schema::String { logical: Some(_) }, v) => {
            if let Some(s) = v.as_str() {
                out.push(s.to_string());
            }
        }
        (Schema::Record(rs), Value::Record(record)) => {
            for field in &rs.fields {
                if let Some(v) = record.get(field.position) {
                    tagged_texts(&field.schema, v, out);
                }
            }
        }
        (Schema::Array(items), Value::Array(elements)) => {
            for element in elements {
                tagged_texts(items, element, out);
            }
        }
        (Schema::Map(values), Value::Map(entries)) => {
            for entry in entries.values() {
                tagged_texts(values, entry, out);
            }
        }
        (Schema::Union(members), v) => {
            if let Some(member) = members.iter().find(|m| m.accepts(v)) {
                tagged_texts(member, v, out);
            }
        }
        _ => {}
    }
}

/// Printable text, as authored by a user.
pub fn arb_text() -> impl Strategy<Value = String> {
    "[ -~]{0,24}"
}

/// Text that cannot occur inside standard base64 output.
pub fn arb_secret() -> impl Strategy<Value = String> {
    "[a-z]{6,12}".prop_map(|s| format!("secret-{}", s))
}

pub fn arb_user() -> impl Strategy<Value = Record> {
    (
        arb_text(),
        arb_secret(),
        prop::collection::vec(arb_secret(), 0..5),
    )
        .prop_map(|(id, email, tags)| {
            let tags: Vec<&str> = tags.iter().map(String::as_str).collect();
            user(&id, &email, &tags)
        })
}

pub fn arb_address(schema: Arc<RecordSchema>) -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        (arb_secret(), arb_text(), arb_secret()).prop_map(move |(street, city, zip)| {
            let record = Record::with_values(
                Arc::clone(&schema),
                vec![
                    Value::from(street),
                    Value::from(city),
                    Value::Tagged(TaggedString::plain(zip)),
                ],
            )
            .expect("address arity");
            Value::Record(record)
        }),
    ]
}

pub fn arb_visits(schema: Arc<RecordSchema>) -> impl Strategy<Value = Value> {
    prop::collection::vec((arb_text(), arb_secret()), 0..4).prop_map(move |visits| {
        let visits = visits
            .into_iter()
            .map(|(page, referrer)| {
                let record = Record::with_values(
                    Arc::clone(&schema),
                    vec![Value::from(page), Value::from(referrer)],
                )
                .expect("visit arity");
                Value::Record(record)
            })
            .collect();
        Value::Array(visits)
    })
}

/// A plaintext profile: every typed value is `Plain`.
pub fn arb_profile() -> impl Strategy<Value = Record> {
    let schema = profile_schema();
    let profile = record_schema(&schema);
    let address = named_record(&schema, "Address");
    let visit = named_record(&schema, "Visit");

    (
        arb_text(),
        any::<i32>(),
        arb_secret(),
        prop::option::of(arb_secret()),
        prop::collection::vec(arb_secret(), 0..5),
        prop::collection::btree_map("[a-z]{1,6}", arb_secret(), 0..4),
        arb_address(address),
        arb_visits(visit),
        prop::option::of(arb_secret()),
    )
        .prop_map(
            move |(id, age, email, nickname, tags, notes, address, visits, recovery)| {
                let notes: BTreeMap<String, Value> = notes
                    .into_iter()
                    .map(|(k, v)| (k, Value::Tagged(TaggedString::plain(v))))
                    .collect();
                Record::with_values(
                    Arc::clone(&profile),
                    vec![
                        Value::from(id),
                        Value::Int(age),
                        Value::Tagged(TaggedString::plain(email)),
                        nickname.map(Value::from).unwrap_or(Value::Null),
                        Value::Array(tags.into_iter().map(Value::from).collect()),
                        Value::Map(notes),
                        address,
                        visits,
                        recovery
                            .map(|r| Value::Tagged(TaggedString::plain(r)))
                            .unwrap_or(Value::Null),
                    ],
                )
                .expect("profile arity")
            },
        )
}

pub fn arb_shift_cipher() -> impl Strategy<Value = ShiftCipher> {
    (1u8..PRINTABLE_SPAN).prop_map(|key| ShiftCipher { key })
}
