//! Filter evaluation, ordering and projection over in-memory documents.

use serde_json::{Map, Value};
use std::cmp::Ordering;

use crate::db::document::{date_millis, remove_field, Document, ID_FIELD};
use crate::db::error::StoreError;
use crate::db::object_id::ObjectId;

/// Resolve a dotted path. Numeric segments index into arrays.
pub(crate) fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Whether `value` is an operator document such as `{"$gt": 1}`.
///
/// Id and date values look like operators but are literals.
pub(crate) fn is_operator_doc(value: &Value) -> bool {
    match value.as_object() {
        Some(map) if !map.is_empty() => {
            map.keys().all(|k| k.starts_with('$'))
                && ObjectId::from_value(value).is_none()
                && date_millis(value).is_none()
        }
        _ => false,
    }
}

/// Structural equality where `1` and `1.0` are the same number.
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| values_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| values_equal(v, other)))
        }
        _ => a == b,
    }
}

fn type_rank(value: &Value) -> u8 {
    if ObjectId::from_value(value).is_some() {
        return 7;
    }
    if date_millis(value).is_some() {
        return 9;
    }
    match value {
        Value::Null => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Object(_) => 4,
        Value::Array(_) => 5,
        Value::Bool(_) => 8,
    }
}

/// Total order across types: null, numbers, strings, objects, arrays, ids,
/// booleans, dates.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Ordering {
    let (ra, rb) = (type_rank(a), type_rank(b));
    if ra != rb {
        return ra.cmp(&rb);
    }
    match ra {
        7 => {
            let x = ObjectId::from_value(a).map(|id| id.bytes());
            let y = ObjectId::from_value(b).map(|id| id.bytes());
            x.cmp(&y)
        }
        9 => date_millis(a).cmp(&date_millis(b)),
        _ => match (a, b) {
            (Value::Number(x), Value::Number(y)) => {
                let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
            (Value::String(x), Value::String(y)) => x.cmp(y),
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            (Value::Array(x), Value::Array(y)) => x
                .iter()
                .zip(y)
                .map(|(a, b)| compare_values(a, b))
                .find(|o| o.is_ne())
                .unwrap_or_else(|| x.len().cmp(&y.len())),
            (Value::Object(x), Value::Object(y)) => x
                .iter()
                .zip(y)
                .map(|((ka, va), (kb, vb))| ka.cmp(kb).then_with(|| compare_values(va, vb)))
                .find(|o| o.is_ne())
                .unwrap_or_else(|| x.len().cmp(&y.len())),
            _ => Ordering::Equal,
        },
    }
}

fn field_equals(field: Option<&Value>, expected: &Value) -> bool {
    match field {
        None => expected.is_null(),
        Some(value) => {
            values_equal(value, expected)
                || value
                    .as_array()
                    .is_some_and(|items| items.iter().any(|item| values_equal(item, expected)))
        }
    }
}

fn field_compares(field: Option<&Value>, operand: &Value, accept: fn(Ordering) -> bool) -> bool {
    let Some(value) = field else {
        return false;
    };
    let test = |v: &Value| type_rank(v) == type_rank(operand) && accept(compare_values(v, operand));
    match value {
        Value::Array(items) if !operand.is_array() => items.iter().any(test),
        other => test(other),
    }
}

fn operand_list<'a>(op: &str, operand: &'a Value) -> Result<&'a Vec<Value>, StoreError> {
    operand
        .as_array()
        .ok_or_else(|| StoreError::InvalidQuery(format!("{op} needs an array")))
}

fn eval_operator(field: Option<&Value>, op: &str, operand: &Value) -> Result<bool, StoreError> {
    Ok(match op {
        "$eq" => field_equals(field, operand),
        "$ne" => !field_equals(field, operand),
        "$gt" => field_compares(field, operand, Ordering::is_gt),
        "$gte" => field_compares(field, operand, Ordering::is_ge),
        "$lt" => field_compares(field, operand, Ordering::is_lt),
        "$lte" => field_compares(field, operand, Ordering::is_le),
        "$in" => operand_list(op, operand)?
            .iter()
            .any(|candidate| field_equals(field, candidate)),
        "$nin" => !operand_list(op, operand)?
            .iter()
            .any(|candidate| field_equals(field, candidate)),
        "$exists" => {
            let wanted = operand.as_bool().unwrap_or_else(|| operand.as_i64() != Some(0));
            field.is_some() == wanted
        }
        other => {
            return Err(StoreError::InvalidQuery(format!(
                "unknown query operator {other}"
            )))
        }
    })
}

fn sub_filters<'a>(op: &str, operand: &'a Value) -> Result<Vec<&'a Document>, StoreError> {
    operand_list(op, operand)?
        .iter()
        .map(|clause| {
            clause
                .as_object()
                .ok_or_else(|| StoreError::InvalidQuery(format!("{op} clauses must be documents")))
        })
        .collect()
}

/// Whether `doc` satisfies `filter`.
pub(crate) fn matches(doc: &Document, filter: &Document) -> Result<bool, StoreError> {
    for (key, condition) in filter {
        let ok = match key.as_str() {
            "$and" => {
                let mut all = true;
                for clause in sub_filters(key, condition)? {
                    if !matches(doc, clause)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => {
                let mut any = false;
                for clause in sub_filters(key, condition)? {
                    if matches(doc, clause)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            op if op.starts_with('$') => {
                return Err(StoreError::InvalidQuery(format!(
                    "unknown top level operator {op}"
                )))
            }
            path => {
                let field = get_path(doc, path);
                match condition.as_object() {
                    Some(ops) if is_operator_doc(condition) => {
                        let mut all = true;
                        for (op, operand) in ops {
                            if !eval_operator(field, op, operand)? {
                                all = false;
                                break;
                            }
                        }
                        all
                    }
                    _ => field_equals(field, condition),
                }
            }
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Sort in place by a `{field: 1 | -1}` specification. Stable.
pub(crate) fn sort_documents(docs: &mut [Document], spec: &Document) -> Result<(), StoreError> {
    let mut keys = Vec::with_capacity(spec.len());
    for (field, direction) in spec {
        let descending = match direction.as_i64() {
            Some(1) => false,
            Some(-1) => true,
            _ => {
                return Err(StoreError::InvalidQuery(format!(
                    "sort direction for {field} must be 1 or -1"
                )))
            }
        };
        keys.push((field.as_str(), descending));
    }
    docs.sort_by(|a, b| {
        for (field, descending) in &keys {
            let x = get_path(a, field).unwrap_or(&Value::Null);
            let y = get_path(b, field).unwrap_or(&Value::Null);
            let order = compare_values(x, y);
            if order.is_ne() {
                return if *descending { order.reverse() } else { order };
            }
        }
        Ordering::Equal
    });
    Ok(())
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Null => false,
        _ => true,
    }
}

/// Apply an inclusion or exclusion projection on top level fields.
///
/// `_id` is kept unless excluded explicitly. Mixing inclusion and exclusion
/// of other fields is rejected.
pub(crate) fn project(doc: Document, projection: &Document) -> Result<Document, StoreError> {
    let keep_id = projection.get(ID_FIELD).map_or(true, truthy);
    let others: Vec<(&String, bool)> = projection
        .iter()
        .filter(|(k, _)| k.as_str() != ID_FIELD)
        .map(|(k, v)| (k, truthy(v)))
        .collect();

    let inclusive = others.iter().any(|(_, include)| *include);
    if inclusive && others.iter().any(|(_, include)| !include) {
        return Err(StoreError::InvalidQuery(
            "projection cannot mix inclusion and exclusion".to_string(),
        ));
    }

    let mut doc = doc;
    if inclusive {
        doc = doc
            .into_iter()
            .filter(|(k, _)| {
                (k == ID_FIELD && keep_id) || others.iter().any(|(field, _)| *field == k)
            })
            .collect::<Map<String, Value>>();
    } else {
        for (field, _) in &others {
            remove_field(&mut doc, field);
        }
        if !keep_id {
            remove_field(&mut doc, ID_FIELD);
        }
    }
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Document {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_equality_and_arrays() {
        let d = doc(json!({"a": 1, "tags": ["x", "y"], "n": {"b": 2.0}}));
        assert!(matches(&d, &doc(json!({"a": 1.0}))).unwrap());
        assert!(matches(&d, &doc(json!({"tags": "y"}))).unwrap());
        assert!(matches(&d, &doc(json!({"n.b": 2}))).unwrap());
        assert!(matches(&d, &doc(json!({"missing": null}))).unwrap());
        assert!(!matches(&d, &doc(json!({"a": 2}))).unwrap());
    }

    #[test]
    fn test_operators() {
        let d = doc(json!({"age": 30, "name": "ann"}));
        assert!(matches(&d, &doc(json!({"age": {"$gte": 30, "$lt": 31}}))).unwrap());
        assert!(!matches(&d, &doc(json!({"age": {"$gt": "a"}}))).unwrap());
        assert!(matches(&d, &doc(json!({"name": {"$in": ["bob", "ann"]}}))).unwrap());
        assert!(matches(&d, &doc(json!({"name": {"$nin": ["bob"]}}))).unwrap());
        assert!(matches(&d, &doc(json!({"x": {"$exists": false}}))).unwrap());
        assert!(matches(&d, &doc(json!({"$or": [{"age": 1}, {"name": "ann"}]}))).unwrap());
        assert!(!matches(&d, &doc(json!({"$and": [{"age": 30}, {"name": "bob"}]}))).unwrap());
        assert!(matches!(
            matches(&d, &doc(json!({"age": {"$regex": "x"}}))),
            Err(StoreError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_id_values_are_literals() {
        let id = ObjectId::new();
        let d = doc(json!({"_id": id.to_value()}));
        assert!(!is_operator_doc(&id.to_value()));
        assert!(matches(&d, &doc(json!({"_id": id.to_value()}))).unwrap());
        assert!(matches(&d, &doc(json!({"_id": {"$in": [id.to_value()]}}))).unwrap());
    }

    #[test]
    fn test_sort_mixed_types_and_direction() {
        let mut docs = vec![
            doc(json!({"v": "b"})),
            doc(json!({"v": 2})),
            doc(json!({})),
            doc(json!({"v": 1})),
        ];
        sort_documents(&mut docs, &doc(json!({"v": 1}))).unwrap();
        let order: Vec<Value> = docs
            .iter()
            .map(|d| d.get("v").cloned().unwrap_or(Value::Null))
            .collect();
        assert_eq!(order, vec![json!(null), json!(1), json!(2), json!("b")]);

        sort_documents(&mut docs, &doc(json!({"v": -1}))).unwrap();
        assert_eq!(docs[0].get("v"), Some(&json!("b")));
        assert!(sort_documents(&mut docs, &doc(json!({"v": 2}))).is_err());
    }

    #[test]
    fn test_projection_modes() {
        let d = doc(json!({"_id": 1, "a": 1, "b": 2, "c": 3}));
        assert_eq!(
            project(d.clone(), &doc(json!({"a": 1}))).unwrap(),
            doc(json!({"_id": 1, "a": 1}))
        );
        assert_eq!(
            project(d.clone(), &doc(json!({"a": 1, "_id": 0}))).unwrap(),
            doc(json!({"a": 1}))
        );
        assert_eq!(
            project(d.clone(), &doc(json!({"b": 0}))).unwrap(),
            doc(json!({"_id": 1, "a": 1, "c": 3}))
        );
        assert!(project(d, &doc(json!({"a": 1, "b": 0}))).is_err());
    }
}
