//! # Db Module
//!
//! Active-record style mapping of typed records onto a document store.
//!
//! ## Overview
//!
//! - [`Model`]: a mapped type, one collection per type, with no-op lifecycle
//!   hooks and the [`Model::filter_binds`] customisation point
//! - [`Mapper`]: the collection operations for one model (`find`, `count`,
//!   `sum`, bulk writes, `save`, `delete`)
//! - [`Connection`]: explicit handle to one database, connected lazily and
//!   exactly once, shared through the `db` service
//! - [`Store`]: the store client seam, with the in-process [`MemoryStore`]
//! - [`ObjectId`]: 12-byte identifiers and the `{"$oid": ..}` value form
//!
//! Reads surface every failure as [`MapperError`]. Writes report a rejected
//! write as `Ok(false)` and reserve `Err` for configuration and connection
//! failures, so callers must check the flag.
//!
//! ## Example
//!
//! ```rust
//! use mvcore::db::{Connection, Document, FindParams, Mapper, Model, Record};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! struct Invoice(Record);
//!
//! impl Model for Invoice {
//!     fn source() -> &'static str { "invoices" }
//!     fn record(&self) -> &Record { &self.0 }
//!     fn record_mut(&mut self) -> &mut Record { &mut self.0 }
//!     fn from_record(record: Record) -> Self { Invoice(record) }
//! }
//!
//! let (connection, _store) = Connection::in_memory("billing");
//! let invoices = Mapper::<Invoice>::new(Arc::new(connection));
//!
//! let mut invoice = Invoice::new_record();
//! invoice.set("amount", 40);
//! assert!(invoices.save(&mut invoice, false).unwrap());
//! assert!(invoice.id().is_some());
//!
//! assert_eq!(invoices.sum("amount", Document::new()).unwrap(), json!(40));
//! assert_eq!(invoices.count(&FindParams::new()).unwrap(), 1);
//! ```

mod connection;
mod document;
mod error;
mod mapper;
mod memory;
mod model;
mod object_id;
mod store;

pub use connection::{Connection, Connector, MemoryConnector, ServerConfig};
pub use document::{
    date_format, date_millis, remove_field, to_plain, to_seconds, utc_date, Document, Record,
    DEFAULT_DATE_FORMAT, ID_FIELD,
};
pub use error::{MapperError, StoreError};
pub use mapper::{FindParams, Mapper, WriteOptions};
pub use memory::MemoryStore;
pub use model::{combine, combine_by_id, combine_unique, get_ids, Model};
pub use object_id::{
    convert_ids, filter_object_ids, is_object_id, object_id, ObjectId, ParseObjectIdError,
};
pub use store::{BulkWriteResult, Command, QueryOptions, Store, WriteOp};
