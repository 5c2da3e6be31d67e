//! Update operators applied to in-memory documents.

use serde_json::{Map, Number, Value};

use super::query::{get_path, is_operator_doc};
use crate::db::document::{remove_field, Document, ID_FIELD};
use crate::db::error::StoreError;

fn invalid(message: String) -> StoreError {
    StoreError::InvalidCommand(message)
}

fn set_path(doc: &mut Document, path: &str, value: Value) -> Result<(), StoreError> {
    match path.split_once('.') {
        None => {
            doc.insert(path.to_string(), value);
            Ok(())
        }
        Some((head, rest)) => {
            let child = doc
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            match child {
                Value::Object(map) => set_path(map, rest, value),
                _ => Err(invalid(format!("cannot set {path}: {head} is not a document"))),
            }
        }
    }
}

fn remove_path(doc: &mut Document, path: &str) -> Option<Value> {
    match path.split_once('.') {
        None => remove_field(doc, path),
        Some((head, rest)) => match doc.get_mut(head) {
            Some(Value::Object(map)) => remove_path(map, rest),
            _ => None,
        },
    }
}

fn add_numbers(current: &Number, delta: &Number) -> Option<Number> {
    match (current.as_i64(), delta.as_i64()) {
        (Some(a), Some(b)) => a.checked_add(b).map(Number::from),
        _ => Number::from_f64(current.as_f64()? + delta.as_f64()?),
    }
}

fn operator_fields<'a>(op: &str, operand: &'a Value) -> Result<&'a Document, StoreError> {
    operand
        .as_object()
        .ok_or_else(|| invalid(format!("{op} needs a document")))
}

/// Apply an update document. Returns whether `doc` changed.
///
/// Operator documents support `$set`, `$inc`, `$unset` and `$rename`.
/// Anything else is a full replacement that keeps `_id`.
pub(crate) fn apply_update(doc: &mut Document, update: &Document) -> Result<bool, StoreError> {
    let operators = update.keys().filter(|k| k.starts_with('$')).count();
    if operators == 0 {
        return Ok(replace(doc, update));
    }
    if operators != update.len() {
        return Err(invalid(
            "update mixes operators and plain fields".to_string(),
        ));
    }

    let before = doc.clone();
    for (op, operand) in update {
        let fields = operator_fields(op, operand)?;
        match op.as_str() {
            "$set" => {
                for (path, value) in fields {
                    set_path(doc, path, value.clone())?;
                }
            }
            "$inc" => {
                for (path, delta) in fields {
                    let Value::Number(delta) = delta else {
                        return Err(invalid(format!("$inc on {path} needs a number")));
                    };
                    let next = match get_path(doc, path) {
                        None => delta.clone(),
                        Some(Value::Number(current)) => add_numbers(current, delta)
                            .ok_or_else(|| invalid(format!("$inc on {path} overflows")))?,
                        Some(_) => {
                            return Err(invalid(format!("$inc on non-numeric field {path}")))
                        }
                    };
                    set_path(doc, path, Value::Number(next))?;
                }
            }
            "$unset" => {
                for path in fields.keys() {
                    remove_path(doc, path);
                }
            }
            "$rename" => {
                for (from, to) in fields {
                    let to = to
                        .as_str()
                        .ok_or_else(|| {
                            invalid(format!("$rename target for {from} must be a string"))
                        })?;
                    if let Some(value) = remove_path(doc, from) {
                        set_path(doc, to, value)?;
                    }
                }
            }
            other => return Err(invalid(format!("unknown update operator {other}"))),
        }
    }
    Ok(*doc != before)
}

fn replace(doc: &mut Document, replacement: &Document) -> bool {
    let mut next = Document::new();
    if let Some(id) = doc.get(ID_FIELD) {
        next.insert(ID_FIELD.to_string(), id.clone());
    }
    for (key, value) in replacement {
        if key != ID_FIELD {
            next.insert(key.clone(), value.clone());
        }
    }
    let changed = *doc != next;
    *doc = next;
    changed
}

/// The equality fields of a filter, used to seed an upserted document.
pub(crate) fn upsert_seed(filter: &Document) -> Document {
    let mut seed = Document::new();
    for (key, condition) in filter {
        if key.starts_with('$') || key.contains('.') {
            continue;
        }
        if !is_operator_doc(condition) {
            seed.insert(key.clone(), condition.clone());
        } else if let Some(value) = condition.get("$eq") {
            seed.insert(key.clone(), value.clone());
        }
    }
    seed
}
