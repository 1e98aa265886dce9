// Field-index cache - which record fields lead to a sensitive leaf
//
// Entries are keyed by record full name plus a fingerprint of the record's
// structure, and list *direct* field positions only. Nested records are
// looked up (and cached) on their own.

use crate::schema::{RecordSchema, Schema};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::debug;

static GLOBAL: Lazy<FieldIndexCache> = Lazy::new(FieldIndexCache::new);

/// Two versions of a record may share a full name (schema evolution), so the
/// name alone does not identify the field layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SchemaKey {
    fullname: String,
    fingerprint: u64,
}

impl SchemaKey {
    fn of(schema: &RecordSchema) -> Self {
        let mut hasher = DefaultHasher::new();
        schema.hash(&mut hasher);
        SchemaKey {
            fullname: schema.fullname(),
            fingerprint: hasher.finish(),
        }
    }
}

/// Memoized sensitive-field positions per record schema.
///
/// Safe to share between threads. Two threads missing on the same schema may
/// both compute its positions; the first insert wins and, the computation
/// being pure, both results are identical anyway. Entries are never evicted:
/// the key space is the set of record schemas in use, one entry per distinct
/// version of a name.
#[derive(Debug, Default)]
pub struct FieldIndexCache {
    entries: DashMap<SchemaKey, Arc<[usize]>>,
}

impl FieldIndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache used by the top-level `encrypt`/`decrypt`.
    pub fn global() -> &'static FieldIndexCache {
        &GLOBAL
    }

    /// Positions of the fields of `schema` whose subtree holds a sensitive
    /// leaf, in ascending order. An empty slice means the record can be
    /// skipped without reading any field.
    pub fn positions_for(&self, schema: &RecordSchema) -> Arc<[usize]> {
        let key = SchemaKey::of(schema);
        if let Some(hit) = self.entries.get(&key) {
            return Arc::clone(hit.value());
        }

        let positions: Arc<[usize]> = schema
            .fields
            .iter()
            .filter(|field| self.is_sensitive_subtree(&field.schema))
            .map(|field| field.position)
            .collect();
        debug!(
            record = %key.fullname,
            fingerprint = key.fingerprint,
            ?positions,
            "indexed sensitive fields"
        );

        let entry = self.entries.entry(key).or_insert(positions);
        Arc::clone(entry.value())
    }

    /// Whether any tagged leaf is reachable from `schema`.
    pub fn is_sensitive_subtree(&self, schema: &Schema) -> bool {
        match schema {
            Schema::Record(record) => !self.positions_for(record).is_empty(),
            Schema::Union(members) => members.iter().any(|m| self.is_sensitive_subtree(m)),
            Schema::Array(items) => self.is_sensitive_subtree(items),
            Schema::Map(values) => self.is_sensitive_subtree(values),
            leaf => leaf.is_tagged_leaf(),
        }
    }

    /// Whether any version of the record named `fullname` has an entry.
    pub fn contains(&self, fullname: &str) -> bool {
        self.entries.iter().any(|entry| entry.key().fullname == fullname)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
