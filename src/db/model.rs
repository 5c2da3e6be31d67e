use serde_json::Value;
use std::collections::BTreeMap;

use super::document::{group_key, Document, Record};
use super::error::MapperError;
use super::object_id::ObjectId;

/// A mapped type: one collection, one record per instance.
///
/// Every hook is a no-op by default. Override them to react to the
/// persistence lifecycle driven by [`Mapper::save`](super::Mapper::save) and
/// [`Mapper::delete`](super::Mapper::delete).
pub trait Model: Sized {
    /// Collection name.
    fn source() -> &'static str;

    /// Database override; `None` uses the connection's database.
    fn db() -> Option<&'static str> {
        None
    }

    /// Fields every fresh instance starts with, and their defaults.
    fn declared_fields() -> Document {
        Document::new()
    }

    fn record(&self) -> &Record;

    fn record_mut(&mut self) -> &mut Record;

    fn from_record(record: Record) -> Self;

    /// Rewrites every filter and update document before it reaches the store.
    fn filter_binds(filter: Document) -> Document {
        filter
    }

    fn before_save(&mut self, _force_insert: bool) {}

    fn after_save(&mut self) {}

    fn before_update(&mut self) {}

    fn after_update(&mut self) {}

    fn before_delete(&mut self) {}

    fn after_delete(&mut self) {}

    /// A default-constructed instance holding the declared fields.
    fn new_record() -> Self {
        Self::from_record(Record::from_document(Self::declared_fields()))
    }

    fn id(&self) -> Option<ObjectId> {
        self.record().id()
    }

    fn get(&self, field: &str) -> Option<&Value> {
        self.record().get(field)
    }

    fn set(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.record_mut().set(field, value);
        self
    }

    fn to_plain(&self) -> Value {
        self.record().to_plain()
    }

    /// A date field in seconds.
    fn to_time(&self, field: &str) -> Result<i64, MapperError> {
        self.record().to_time(field).map_err(|_| unknown::<Self>(field))
    }

    /// A date field formatted with a `strftime` pattern.
    fn to_date(&self, field: &str, format: &str) -> Result<String, MapperError> {
        self.record()
            .to_date(field, format)
            .map_err(|_| unknown::<Self>(field))
    }
}

fn unknown<M: Model>(field: &str) -> MapperError {
    MapperError::UnknownProperty {
        property: field.to_string(),
        source: M::source().to_string(),
    }
}

/// Distinct ids of `models`, first occurrence first.
#[must_use]
pub fn get_ids<M: Model>(models: &[M]) -> Vec<ObjectId> {
    let mut ids = Vec::with_capacity(models.len());
    for id in models.iter().filter_map(Model::id) {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

/// Index models by id hex. Later duplicates win; models without id are
/// keyed by the empty string.
#[must_use]
pub fn combine_by_id<M: Model>(models: Vec<M>) -> BTreeMap<String, M> {
    models
        .into_iter()
        .map(|m| (m.record().id_string(), m))
        .collect()
}

/// Group models by the value of `field`. Models without the field are
/// dropped. Ids group by hex and dates by seconds.
#[must_use]
pub fn combine<M: Model>(field: &str, models: Vec<M>) -> BTreeMap<String, Vec<M>> {
    let mut groups: BTreeMap<String, Vec<M>> = BTreeMap::new();
    for model in models {
        if let Some(key) = model.get(field).map(group_key) {
            groups.entry(key).or_default().push(model);
        }
    }
    groups
}

/// Like [`combine`], keeping only the last model per value.
#[must_use]
pub fn combine_unique<M: Model>(field: &str, models: Vec<M>) -> BTreeMap<String, M> {
    let mut groups = BTreeMap::new();
    for model in models {
        if let Some(key) = model.get(field).map(group_key) {
            groups.insert(key, model);
        }
    }
    groups
}
