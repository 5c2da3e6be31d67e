use serde_json::Value;

use super::document::Document;
use super::error::StoreError;

/// Options of a collection query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// Field → `1` ascending or `-1` descending, applied in order.
    pub sort: Option<Document>,
    pub limit: Option<i64>,
    pub skip: Option<u64>,
    /// Inclusion (`1`) or exclusion (`0`) map.
    pub projection: Option<Document>,
}

/// A database command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Replies with one `{"n": <count>}` row.
    Count { collection: String, query: Document },
    /// Replies with the pipeline output rows.
    Aggregate {
        collection: String,
        pipeline: Vec<Document>,
    },
    /// Replies with one `{"ok": 1, "numIndexesAfter": <n>}` row.
    CreateIndexes {
        collection: String,
        indexes: Vec<Document>,
    },
}

impl Command {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Command::Count { .. } => "count",
            Command::Aggregate { .. } => "aggregate",
            Command::CreateIndexes { .. } => "createIndexes",
        }
    }
}

/// One operation of a bulk write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Insert(Document),
    Update {
        filter: Document,
        /// Operator document (`$set`, `$inc`, ...) or a full replacement.
        update: Document,
        multi: bool,
        upsert: bool,
    },
    Delete {
        filter: Document,
        /// `0` deletes every match.
        limit: u64,
    },
}

/// Counters reported by a bulk write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkWriteResult {
    pub inserted: u64,
    pub matched: u64,
    pub modified: u64,
    pub upserted: u64,
    pub deleted: u64,
}

impl BulkWriteResult {
    #[must_use]
    pub fn touched(&self) -> u64 {
        self.inserted + self.modified + self.upserted + self.deleted
    }
}

/// Document store client.
///
/// Namespaces are `database` plus `collection`. Implementations are shared
/// across requests and must be `Send + Sync`.
pub trait Store: Send + Sync {
    fn query(
        &self,
        database: &str,
        collection: &str,
        filter: &Document,
        options: &QueryOptions,
    ) -> Result<Vec<Document>, StoreError>;

    fn command(&self, database: &str, command: &Command) -> Result<Vec<Document>, StoreError>;

    fn bulk_write(
        &self,
        database: &str,
        collection: &str,
        ops: &[WriteOp],
    ) -> Result<BulkWriteResult, StoreError>;
}

/// Read the first row's field of a command reply.
#[must_use]
pub fn reply_field<'a>(rows: &'a [Document], field: &str) -> Option<&'a Value> {
    rows.first().and_then(|row| row.get(field))
}
