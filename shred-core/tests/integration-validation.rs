// End-to-end scenarios: the user record, unions of records, wrong keys and
// the producer/consumer pipeline

mod common;

use common::*;
use shred_core::error::{KeyError, ShredError};
use shred_core::{
    binary, decrypt, encrypt, AesKeyedEncryptor, CipherError, EncryptionConsumer,
    EncryptionProducer, IdentityKeyProvider, KeyedTransform, Message, Record, Schema,
    ShredConfig, StaticKeyProvider, TaggedString, Value,
};
use std::sync::Arc;

fn tags(record: &Record) -> Vec<String> {
    match record.get_by_name("tags") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| v.as_str().unwrap_or_default().to_string())
            .collect(),
        other => panic!("Expected tags array, got {:?}", other),
    }
}

#[test]
fn test_user_scenario() {
    let original = user("u1", "a@b.com", &["x", "y"]);
    let cipher = AesKeyedEncryptor::new("k1");

    let mut record = original.clone();
    encrypt(&cipher, &mut record).unwrap();

    assert_eq!(record.get_by_name("id"), Some(&Value::from("u1")));
    let Some(Value::Tagged(TaggedString::Encrypted(email))) = record.get_by_name("email") else {
        panic!("Expected encrypted email");
    };
    assert_eq!(cipher.decrypt(email).unwrap(), "a@b.com");
    let sealed_tags = tags(&record);
    assert_eq!(cipher.decrypt(&sealed_tags[0]).unwrap(), "x");
    assert_eq!(cipher.decrypt(&sealed_tags[1]).unwrap(), "y");

    decrypt(&cipher, &mut record).unwrap();
    assert_eq!(record, original);
}

#[test]
fn test_wrong_key_with_tolerant_cipher_yields_garbage() {
    let original = user("u1", "a@b.com", &["x", "y"]);
    let mut record = original.clone();

    encrypt(&ShiftCipher { key: 3 }, &mut record).unwrap();
    decrypt(&ShiftCipher { key: 5 }, &mut record).unwrap();

    // Both leaves were decrypted, just not back to the original.
    let Some(Value::Tagged(TaggedString::Plain(email))) = record.get_by_name("email") else {
        panic!("Expected plain email");
    };
    assert_ne!(email, "a@b.com");
    assert_ne!(tags(&record), vec!["x".to_string(), "y".to_string()]);
    assert_eq!(record.get_by_name("id"), original.get_by_name("id"));
}

#[test]
fn test_wrong_key_with_aes_propagates_typed_error() {
    let mut record = user("u1", "a@b.com", &["x", "y"]);
    encrypt(&AesKeyedEncryptor::new("k1"), &mut record).unwrap();

    let err = decrypt(&AesKeyedEncryptor::new("k2"), &mut record).unwrap_err();
    assert!(matches!(err, ShredError::LeafTransform(CipherError::Crypto)));
}

#[test]
fn test_wrong_key_with_aes_keeps_inline_ciphertext() {
    let schema = Schema::parse_str(
        r#"{"type": "record", "name": "Tags", "fields": [
            {"name": "tags", "type": {"type": "array", "items": {"type": "string", "logicalType": "inline-encrypted-string"}}}
        ]}"#,
    )
    .unwrap();
    let mut record = Record::with_values(
        record_schema(&schema),
        vec![Value::Array(vec!["x".into(), "y".into()])],
    )
    .unwrap();

    encrypt(&AesKeyedEncryptor::new("k1"), &mut record).unwrap();
    let sealed = record.clone();

    decrypt(&AesKeyedEncryptor::new("k2"), &mut record).unwrap();
    assert_eq!(record, sealed);
}

#[test]
fn test_union_of_null_and_record() {
    let schema = Schema::parse_str(
        r#"{"type": "record", "name": "Holder", "fields": [
            {"name": "field", "type": ["null", {"type": "record", "name": "Secret", "fields": [
                {"name": "value", "type": {"type": "string", "logicalType": "encrypted-string"}},
                {"name": "label", "type": "string"}
            ]}]}
        ]}"#,
    )
    .unwrap();
    let holder = record_schema(&schema);
    let secret_schema = named_record(&schema, "Secret");
    let cipher = AesKeyedEncryptor::new("k1");

    let mut empty = Record::new(Arc::clone(&holder));
    encrypt(&cipher, &mut empty).unwrap();
    assert_eq!(empty.get(0), Some(&Value::Null));

    let secret = Record::with_values(
        secret_schema,
        vec![TaggedString::plain("s3cr3t").into(), "public".into()],
    )
    .unwrap();
    let original = Record::with_values(holder, vec![Value::Record(secret)]).unwrap();

    let mut record = original.clone();
    encrypt(&cipher, &mut record).unwrap();
    let inner = record.get(0).and_then(Value::as_record).unwrap();
    assert!(matches!(
        inner.get(0),
        Some(Value::Tagged(TaggedString::Encrypted(_)))
    ));
    assert_eq!(inner.get(1), Some(&Value::from("public")));

    decrypt(&cipher, &mut record).unwrap();
    assert_eq!(record, original);
}

#[test]
fn test_pipeline_roundtrip() {
    let schema = user_schema();
    let mut keys = StaticKeyProvider::default();
    keys.insert("subject-1", "hunter2");

    let producer = EncryptionProducer::new(keys.clone(), ShredConfig::default());
    let consumer = EncryptionConsumer::new(keys, ShredConfig::default());

    let original = Value::Record(user("u1", "a@b.com", &["x"]));
    let mut outgoing = Message::new(original.clone()).with_header("crypto-shredding-key", "subject-1");
    let payload = producer.encode(&mut outgoing, &schema).unwrap();

    let received = consumer
        .decode(outgoing.headers.clone(), &schema, &payload)
        .unwrap();
    assert_eq!(received.value, original);
}

#[test]
fn test_pipeline_without_header_passes_through() {
    let producer = EncryptionProducer::new(IdentityKeyProvider, ShredConfig::default());
    let original = Value::Record(user("u1", "a@b.com", &["x"]));

    let mut message = Message::new(original.clone());
    producer.process(&mut message).unwrap();
    assert_eq!(message.value, original);

    // Still plaintext, so it cannot be put on the wire.
    assert!(producer.encode(&mut message, &user_schema()).is_err());
}

#[test]
fn test_pipeline_forgotten_key() {
    let schema = user_schema();
    let mut keys = StaticKeyProvider::default();
    keys.insert("subject-1", "hunter2");

    let producer = EncryptionProducer::new(keys.clone(), ShredConfig::default());
    let mut message =
        Message::new(Value::Record(user("u1", "a@b.com", &[]))).with_header("crypto-shredding-key", "subject-1");
    let payload = producer.encode(&mut message, &schema).unwrap();

    keys.forget("subject-1");
    let consumer = EncryptionConsumer::new(keys, ShredConfig::default());
    let err = consumer
        .decode(message.headers.clone(), &schema, &payload)
        .unwrap_err();
    assert!(matches!(err, ShredError::Key(KeyError::NotFound(_))));

    // The payload itself is still readable, minus the shredded field.
    let value = binary::decode(&schema, &payload).unwrap();
    assert!(matches!(
        value.as_record().and_then(|r| r.get_by_name("email")),
        Some(Value::Tagged(TaggedString::Encrypted(_)))
    ));
}
