//! In-process [`Store`] used for tests, demos and the CLI.
//!
//! Collections live in a map keyed by `database.collection`. The query,
//! update and aggregation dialect is the subset the mapper issues.

mod aggregate;
mod query;
mod update;

use parking_lot::RwLock;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

use super::document::{Document, ID_FIELD};
use super::error::StoreError;
use super::object_id::ObjectId;
use super::store::{BulkWriteResult, Command, QueryOptions, Store, WriteOp};
use query::{matches, project, sort_documents, values_equal};
use update::{apply_update, upsert_seed};

/// Thread-safe in-memory document store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    indexes: RwLock<HashMap<String, Vec<Document>>>,
    fail_writes: AtomicBool,
}

fn namespace(database: &str, collection: &str) -> String {
    format!("{database}.{collection}")
}

/// Put `_id` first, generating one when absent.
fn with_id(doc: Document) -> Document {
    if doc.contains_key(ID_FIELD) {
        return doc;
    }
    let mut out = Document::new();
    out.insert(ID_FIELD.to_string(), ObjectId::new().to_value());
    out.extend(doc);
    out
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following bulk write fail with [`StoreError::WriteRejected`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of a collection in insertion order.
    #[must_use]
    pub fn documents(&self, database: &str, collection: &str) -> Vec<Document> {
        self.collections
            .read()
            .get(&namespace(database, collection))
            .cloned()
            .unwrap_or_default()
    }

    /// Index specifications created on a collection.
    #[must_use]
    pub fn indexes(&self, database: &str, collection: &str) -> Vec<Document> {
        self.indexes
            .read()
            .get(&namespace(database, collection))
            .cloned()
            .unwrap_or_default()
    }

    fn filtered(&self, ns: &str, filter: &Document) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read();
        let mut out = Vec::new();
        for doc in collections.get(ns).map(Vec::as_slice).unwrap_or_default() {
            if matches(doc, filter)? {
                out.push(doc.clone());
            }
        }
        Ok(out)
    }

    fn create_indexes(&self, ns: String, specs: &[Document]) -> Result<Vec<Document>, StoreError> {
        let mut indexes = self.indexes.write();
        let existing = indexes.entry(ns).or_default();
        let before = existing.len();
        for spec in specs {
            let key = spec
                .get("key")
                .and_then(Value::as_object)
                .filter(|k| !k.is_empty())
                .ok_or_else(|| {
                    StoreError::InvalidCommand("index specification needs a key".to_string())
                })?;
            let mut spec = spec.clone();
            if !spec.contains_key("name") {
                let name = key
                    .iter()
                    .map(|(field, dir)| format!("{field}_{dir}"))
                    .collect::<Vec<_>>()
                    .join("_");
                spec.insert("name".to_string(), Value::String(name));
            }
            if !existing.iter().any(|e| e.get("name") == spec.get("name")) {
                existing.push(spec);
            }
        }
        let reply = json!({
            "ok": 1,
            "numIndexesBefore": before,
            "numIndexesAfter": existing.len(),
        });
        Ok(reply.as_object().cloned().into_iter().collect())
    }

    fn apply(
        docs: &mut Vec<Document>,
        op: &WriteOp,
        result: &mut BulkWriteResult,
    ) -> Result<(), StoreError> {
        match op {
            WriteOp::Insert(doc) => {
                let doc = with_id(doc.clone());
                let id = doc.get(ID_FIELD);
                let duplicate = docs.iter().any(|d| {
                    d.get(ID_FIELD)
                        .zip(id)
                        .is_some_and(|(a, b)| values_equal(a, b))
                });
                if duplicate {
                    return Err(StoreError::WriteRejected("duplicate _id".to_string()));
                }
                docs.push(doc);
                result.inserted += 1;
            }
            WriteOp::Update {
                filter,
                update,
                multi,
                upsert,
            } => {
                let mut matched = 0;
                for doc in docs.iter_mut() {
                    if !matches(doc, filter)? {
                        continue;
                    }
                    matched += 1;
                    if apply_update(doc, update)? {
                        result.modified += 1;
                    }
                    if !multi {
                        break;
                    }
                }
                result.matched += matched;
                if matched == 0 && *upsert {
                    let mut doc = upsert_seed(filter);
                    apply_update(&mut doc, update)?;
                    if let Some(id) = filter.get(ID_FIELD).filter(|v| !query::is_operator_doc(v)) {
                        doc.insert(ID_FIELD.to_string(), id.clone());
                    }
                    docs.push(with_id(doc));
                    result.upserted += 1;
                }
            }
            WriteOp::Delete { filter, limit } => {
                let mut kept = Vec::with_capacity(docs.len());
                let mut deleted = 0;
                for doc in docs.drain(..) {
                    let under_limit = *limit == 0 || deleted < *limit;
                    if under_limit && matches(&doc, filter)? {
                        deleted += 1;
                    } else {
                        kept.push(doc);
                    }
                }
                *docs = kept;
                result.deleted += deleted;
            }
        }
        Ok(())
    }
}

impl Store for MemoryStore {
    fn query(
        &self,
        database: &str,
        collection: &str,
        filter: &Document,
        options: &QueryOptions,
    ) -> Result<Vec<Document>, StoreError> {
        let mut docs = self.filtered(&namespace(database, collection), filter)?;
        if let Some(sort) = &options.sort {
            sort_documents(&mut docs, sort)?;
        }
        let skip = options
            .skip
            .and_then(|s| usize::try_from(s).ok())
            .unwrap_or(0);
        let limit = match options.limit {
            Some(0) | None => usize::MAX,
            Some(n) => usize::try_from(n.unsigned_abs()).unwrap_or(usize::MAX),
        };
        let docs = docs.into_iter().skip(skip).take(limit);
        let out = match &options.projection {
            Some(projection) => docs
                .map(|doc| project(doc, projection))
                .collect::<Result<Vec<_>, _>>()?,
            None => docs.collect(),
        };
        debug!(database, collection, returned = out.len(), "Memory store query");
        Ok(out)
    }

    fn command(&self, database: &str, command: &Command) -> Result<Vec<Document>, StoreError> {
        debug!(database, command = command.name(), "Memory store command");
        match command {
            Command::Count { collection, query } => {
                let n = self.filtered(&namespace(database, collection), query)?.len();
                Ok(json!({ "n": n }).as_object().cloned().into_iter().collect())
            }
            Command::Aggregate {
                collection,
                pipeline,
            } => {
                let docs = self.documents(database, collection);
                aggregate::run_pipeline(docs, pipeline)
            }
            Command::CreateIndexes {
                collection,
                indexes,
            } => self.create_indexes(namespace(database, collection), indexes),
        }
    }

    fn bulk_write(
        &self,
        database: &str,
        collection: &str,
        ops: &[WriteOp],
    ) -> Result<BulkWriteResult, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            warn!(database, collection, "Memory store rejecting writes");
            return Err(StoreError::WriteRejected(
                "writes are disabled on this store".to_string(),
            ));
        }
        let mut collections = self.collections.write();
        let docs = collections
            .entry(namespace(database, collection))
            .or_default();
        let mut result = BulkWriteResult::default();
        for op in ops {
            Self::apply(docs, op, &mut result)?;
        }
        debug!(
            database,
            collection,
            inserted = result.inserted,
            modified = result.modified,
            deleted = result.deleted,
            "Memory store bulk write"
        );
        Ok(result)
    }
}
