use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use super::error::MapperError;
use super::object_id::{object_id, ObjectId};

/// An ordered field bag as stored in a collection.
pub type Document = Map<String, Value>;

/// Field holding the identifier.
pub const ID_FIELD: &str = "_id";

/// Default format of [`date_format`].
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A mapped record: the fields of one document, identifier included.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Document,
}

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_document(fields: Document) -> Self {
        Self { fields }
    }

    /// The identifier, when `_id` holds a valid id.
    #[must_use]
    pub fn id(&self) -> Option<ObjectId> {
        self.fields.get(ID_FIELD).and_then(object_id)
    }

    /// The identifier as hex, empty when unset.
    #[must_use]
    pub fn id_string(&self) -> String {
        self.id().map(|id| id.to_hex()).unwrap_or_default()
    }

    /// Set or clear the identifier.
    pub fn set_id(&mut self, id: Option<ObjectId>) {
        match id {
            Some(id) => {
                self.fields.insert(ID_FIELD.to_string(), id.to_value());
            }
            None => {
                remove_field(&mut self.fields, ID_FIELD);
            }
        }
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        remove_field(&mut self.fields, field)
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    #[must_use]
    pub fn fields(&self) -> &Document {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut Document {
        &mut self.fields
    }

    #[must_use]
    pub fn into_document(self) -> Document {
        self.fields
    }

    /// Plain JSON with ids as hex strings and dates as seconds.
    #[must_use]
    pub fn to_plain(&self) -> Value {
        to_plain(&Value::Object(self.fields.clone()))
    }

    /// A date field in seconds since the epoch.
    pub fn to_time(&self, field: &str) -> Result<i64, MapperError> {
        self.require(field).map(to_seconds)
    }

    /// A date field formatted with a `strftime` pattern.
    pub fn to_date(&self, field: &str, format: &str) -> Result<String, MapperError> {
        self.require(field).map(|value| date_format(value, format))
    }

    fn require(&self, field: &str) -> Result<&Value, MapperError> {
        self.fields
            .get(field)
            .ok_or_else(|| MapperError::UnknownProperty {
                property: field.to_string(),
                source: "record".to_string(),
            })
    }
}

impl From<Document> for Record {
    fn from(fields: Document) -> Self {
        Self::from_document(fields)
    }
}

/// Remove a field keeping the order of the others.
pub fn remove_field(doc: &mut Document, field: &str) -> Option<Value> {
    if !doc.contains_key(field) {
        return None;
    }
    let mut removed = None;
    for (key, value) in std::mem::take(doc) {
        if key == field {
            removed = Some(value);
        } else {
            doc.insert(key, value);
        }
    }
    removed
}

/// A UTC date value, `{"$date": <millis>}`. `None` means now.
#[must_use]
pub fn utc_date(seconds: Option<i64>) -> Value {
    let millis = match seconds {
        Some(seconds) => seconds.saturating_mul(1000),
        None => Utc::now().timestamp_millis(),
    };
    json!({ "$date": millis })
}

/// Milliseconds of a date value.
#[must_use]
pub fn date_millis(value: &Value) -> Option<i64> {
    let map = value.as_object()?;
    if map.len() != 1 {
        return None;
    }
    map.get("$date")?.as_i64()
}

/// Seconds of a date value, rounded; `0` for anything that is not a date.
#[must_use]
pub fn to_seconds(value: &Value) -> i64 {
    date_millis(value)
        .map(|millis| (millis as f64 / 1000.0).round() as i64)
        .unwrap_or(0)
}

/// Format a date value; non-dates format as the epoch.
#[must_use]
pub fn date_format(value: &Value, format: &str) -> String {
    DateTime::<Utc>::from_timestamp(to_seconds(value), 0)
        .unwrap_or_default()
        .format(format)
        .to_string()
}

/// Replace ids by hex strings and dates by seconds, recursively.
#[must_use]
pub fn to_plain(value: &Value) -> Value {
    if let Some(id) = ObjectId::from_value(value) {
        return Value::String(id.to_hex());
    }
    if date_millis(value).is_some() {
        return Value::from(to_seconds(value));
    }
    match value {
        Value::Array(items) => Value::Array(items.iter().map(to_plain).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), to_plain(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// The string a field value is grouped under by [`combine`].
#[must_use]
pub fn group_key(value: &Value) -> String {
    if let Some(id) = ObjectId::from_value(value) {
        return id.to_hex();
    }
    if date_millis(value).is_some() {
        return to_seconds(value).to_string();
    }
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
