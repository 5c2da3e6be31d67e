use serde_json::{json, Value};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

use super::connection::Connection;
use super::document::{remove_field, Document, Record, ID_FIELD};
use super::error::MapperError;
use super::model::Model;
use super::object_id::{object_id, ObjectId};
use super::store::{reply_field, Command, QueryOptions, Store, WriteOp};
use crate::app::App;

/// Query parameters of [`Mapper::find`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindParams {
    pub filter: Document,
    pub sort: Option<Document>,
    pub limit: Option<i64>,
    pub skip: Option<u64>,
    /// Fields to return; `_id` always comes back.
    pub projection: Option<Vec<String>>,
}

impl FindParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter(mut self, filter: Document) -> Self {
        self.filter = filter;
        self
    }

    /// Add an equality condition.
    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter.insert(field.into(), value.into());
        self
    }

    /// Append a sort key; `true` sorts descending.
    #[must_use]
    pub fn sort_by(mut self, field: impl Into<String>, descending: bool) -> Self {
        let direction = if descending { -1 } else { 1 };
        self.sort
            .get_or_insert_with(Document::new)
            .insert(field.into(), json!(direction));
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    #[must_use]
    pub fn projection<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(fields.into_iter().map(Into::into).collect());
        self
    }
}

impl From<Document> for FindParams {
    fn from(filter: Document) -> Self {
        Self::new().filter(filter)
    }
}

/// Options of the bulk update helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    pub multi: bool,
    pub upsert: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            multi: true,
            upsert: false,
        }
    }
}

/// Collection-level operations for a mapped type.
///
/// Reads return `Err` on any failure. Writes return `Ok(false)` when the
/// store rejects them and only return `Err` when the mapper is not
/// configured or cannot connect.
pub struct Mapper<M> {
    connection: Arc<Connection>,
    model: PhantomData<fn() -> M>,
}

impl<M> Clone for Mapper<M> {
    fn clone(&self) -> Self {
        Self {
            connection: Arc::clone(&self.connection),
            model: PhantomData,
        }
    }
}

impl<M> fmt::Debug for Mapper<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper")
            .field("model", &std::any::type_name::<M>())
            .field("connection", &self.connection)
            .finish()
    }
}

impl<M: Model> Mapper<M> {
    #[must_use]
    pub fn new(connection: Arc<Connection>) -> Self {
        Self {
            connection,
            model: PhantomData,
        }
    }

    /// Bind to the connection registered as the `db` service.
    pub fn from_app(app: &App) -> Result<Self, MapperError> {
        app.get::<Arc<Connection>>("db")
            .map(Self::new)
            .map_err(|err| MapperError::Configuration(err.to_string()))
    }

    #[must_use]
    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// Database queried: the model's override or the connection's.
    #[must_use]
    pub fn database(&self) -> &str {
        match M::db() {
            Some(db) => db,
            None => self.connection.db(),
        }
    }

    fn store(&self) -> Result<(&Arc<dyn Store>, &str), MapperError> {
        let database = self.database();
        if database.is_empty() {
            return Err(MapperError::Configuration("Database not found".to_string()));
        }
        let store = self.connection.store()?;
        if M::source().is_empty() {
            return Err(MapperError::Configuration(
                "Collection not found".to_string(),
            ));
        }
        Ok((store, database))
    }

    fn hydrate(document: Document, projection: Option<&[String]>) -> M {
        let mut record = Record::from_document(M::declared_fields());
        if let Some(fields) = projection {
            record
                .fields_mut()
                .retain(|key, _| key == ID_FIELD || fields.iter().any(|f| f == key));
        }
        for (key, value) in document {
            record.set(key, value);
        }
        M::from_record(record)
    }

    /// Query the collection and hydrate every result.
    pub fn find(&self, params: &FindParams) -> Result<Vec<M>, MapperError> {
        let (store, database) = self.store()?;
        let filter = M::filter_binds(params.filter.clone());
        let options = QueryOptions {
            sort: params.sort.clone(),
            limit: params.limit,
            skip: params.skip,
            projection: params
                .projection
                .as_ref()
                .map(|fields| fields.iter().map(|f| (f.clone(), json!(1))).collect()),
        };
        let documents = store.query(database, M::source(), &filter, &options)?;
        debug!(
            collection = M::source(),
            returned = documents.len(),
            "Mapper find"
        );
        let projection = params.projection.as_deref();
        Ok(documents
            .into_iter()
            .map(|doc| Self::hydrate(doc, projection))
            .collect())
    }

    /// The first match, if any.
    pub fn find_first(&self, params: &FindParams) -> Result<Option<M>, MapperError> {
        let params = params.clone().limit(1);
        Ok(self.find(&params)?.into_iter().next())
    }

    /// Look up by id. A malformed id finds nothing.
    pub fn find_by_id(&self, id: impl AsRef<str>) -> Result<Option<M>, MapperError> {
        let Ok(id) = ObjectId::parse_str(id.as_ref()) else {
            debug!(collection = M::source(), id = id.as_ref(), "Malformed id");
            return Ok(None);
        };
        self.find_first(&FindParams::new().eq(ID_FIELD, id.to_value()))
    }

    pub fn count(&self, params: &FindParams) -> Result<u64, MapperError> {
        let (store, database) = self.store()?;
        let command = Command::Count {
            collection: M::source().to_string(),
            query: M::filter_binds(params.filter.clone()),
        };
        let reply = store.command(database, &command)?;
        Ok(reply_field(&reply, "n").and_then(Value::as_u64).unwrap_or(0))
    }

    /// Total of `field` over the matching documents, `0` when none match.
    pub fn sum(&self, field: &str, filter: Document) -> Result<Value, MapperError> {
        let (store, database) = self.store()?;
        let filter = M::filter_binds(filter);
        let mut pipeline = Vec::with_capacity(2);
        if !filter.is_empty() {
            pipeline.push(stage("$match", Value::Object(filter)));
        }
        pipeline.push(stage(
            "$group",
            json!({
                "_id": null,
                "total": { "$sum": format!("${field}") },
                "count": { "$sum": 1 },
            }),
        ));
        let command = Command::Aggregate {
            collection: M::source().to_string(),
            pipeline,
        };
        let rows = store.command(database, &command)?;
        Ok(reply_field(&rows, "total").cloned().unwrap_or_else(|| json!(0)))
    }

    fn write(&self, op: WriteOp) -> Result<bool, MapperError> {
        let (store, database) = self.store()?;
        match store.bulk_write(database, M::source(), std::slice::from_ref(&op)) {
            Ok(result) => {
                debug!(
                    collection = M::source(),
                    touched = result.touched(),
                    "Mapper write"
                );
                Ok(true)
            }
            Err(err) => {
                warn!(collection = M::source(), error = %err, "Mapper write failed");
                Ok(false)
            }
        }
    }

    fn update_with(
        &self,
        filter: Document,
        operator: &str,
        fields: Document,
        options: WriteOptions,
    ) -> Result<bool, MapperError> {
        self.write(WriteOp::Update {
            filter: M::filter_binds(filter),
            update: stage(operator, Value::Object(fields)),
            multi: options.multi,
            upsert: options.upsert,
        })
    }

    /// `$set` the given fields on matching documents.
    pub fn update(
        &self,
        filter: Document,
        set: Document,
        options: WriteOptions,
    ) -> Result<bool, MapperError> {
        self.update_with(filter, "$set", set, options)
    }

    /// Insert one document and return its id, or `None` when the store
    /// rejected it.
    ///
    /// A missing `_id`, or one that is not a valid id, is replaced by a
    /// generated one.
    pub fn insert(&self, document: Document) -> Result<Option<ObjectId>, MapperError> {
        let mut record = Record::from_document(M::filter_binds(document));
        let id = record
            .get(ID_FIELD)
            .and_then(object_id)
            .unwrap_or_else(ObjectId::new);
        record.set_id(None);
        let mut document = Document::new();
        document.insert(ID_FIELD.to_string(), id.to_value());
        document.extend(record.into_document());

        Ok(self.write(WriteOp::Insert(document))?.then_some(id))
    }

    /// `$inc` the given fields on matching documents.
    pub fn increment(
        &self,
        filter: Document,
        inc: Document,
        options: WriteOptions,
    ) -> Result<bool, MapperError> {
        self.update_with(filter, "$inc", inc, options)
    }

    /// `$unset` fields on matching documents.
    pub fn remove_columns(
        &self,
        filter: Document,
        fields: &[&str],
        options: WriteOptions,
    ) -> Result<bool, MapperError> {
        let unset = fields
            .iter()
            .map(|f| ((*f).to_string(), Value::String(String::new())))
            .collect();
        self.update_with(filter, "$unset", unset, options)
    }

    /// `$rename` fields on matching documents.
    pub fn rename_columns(
        &self,
        filter: Document,
        renames: &[(&str, &str)],
        options: WriteOptions,
    ) -> Result<bool, MapperError> {
        let rename = renames
            .iter()
            .map(|(from, to)| ((*from).to_string(), Value::String((*to).to_string())))
            .collect();
        self.update_with(filter, "$rename", rename, options)
    }

    /// Create indexes; each specification gets the collection namespace as
    /// `ns`.
    pub fn create_indexes(&self, indexes: Vec<Document>) -> Result<bool, MapperError> {
        let (store, database) = self.store()?;
        let ns = format!("{database}.{}", M::source());
        let indexes = indexes
            .into_iter()
            .map(|mut spec| {
                spec.insert("ns".to_string(), Value::String(ns.clone()));
                spec
            })
            .collect();
        let command = Command::CreateIndexes {
            collection: M::source().to_string(),
            indexes,
        };
        match store.command(database, &command) {
            Ok(_) => Ok(true),
            Err(err) => {
                warn!(collection = M::source(), error = %err, "Index creation failed");
                Ok(false)
            }
        }
    }

    /// Delete matching documents; `limit` 0 deletes all of them.
    pub fn delete_raw(&self, filter: Document, limit: u64) -> Result<bool, MapperError> {
        self.write(WriteOp::Delete {
            filter: M::filter_binds(filter),
            limit,
        })
    }

    /// Persist an instance.
    ///
    /// Without an id, or when `force_insert` is set, this inserts and stores
    /// the new id on the instance, calling `before_save` then
    /// `after_update`. Otherwise it updates by id, calling `before_update`
    /// then `after_save`.
    pub fn save(&self, model: &mut M, force_insert: bool) -> Result<bool, MapperError> {
        let id = model.record().get(ID_FIELD).and_then(object_id);
        model.record_mut().set_id(id);

        match id {
            Some(id) if !force_insert => {
                model.before_update();
                let mut properties = model.record().fields().clone();
                remove_field(&mut properties, ID_FIELD);
                let properties = M::filter_binds(properties);
                let mut filter = Document::new();
                filter.insert(ID_FIELD.to_string(), id.to_value());
                let result = self.update(filter, properties, WriteOptions::default())?;
                model.after_save();
                Ok(result)
            }
            _ => {
                model.before_save(force_insert);
                let mut properties = model.record().fields().clone();
                if !force_insert {
                    remove_field(&mut properties, ID_FIELD);
                }
                let properties = M::filter_binds(properties);
                let inserted = self.insert(properties)?;
                model.record_mut().set_id(inserted);
                model.after_update();
                Ok(inserted.is_some())
            }
        }
    }

    /// Delete an instance by id. Without an id nothing happens and the
    /// result is `false`.
    pub fn delete(&self, model: &mut M) -> Result<bool, MapperError> {
        let Some(id) = model.id() else {
            return Ok(false);
        };
        model.before_delete();
        let mut filter = Document::new();
        filter.insert(ID_FIELD.to_string(), id.to_value());
        let result = self.delete_raw(filter, 0)?;
        model.after_delete();
        Ok(result)
    }
}

fn stage(name: &str, body: Value) -> Document {
    let mut doc = Document::new();
    doc.insert(name.to_string(), body);
    doc
}
