//! Aggregation pipeline stages for the in-memory store.

use serde_json::{Number, Value};

use super::query::{compare_values, get_path, matches, project, sort_documents, values_equal};
use crate::db::document::{Document, ID_FIELD};
use crate::db::error::StoreError;

fn invalid(message: String) -> StoreError {
    StoreError::InvalidCommand(message)
}

/// Evaluate a group expression: `"$field"` reads the field, anything else is
/// a constant. Documents are evaluated member by member.
fn eval_expression(doc: &Document, expression: &Value) -> Value {
    match expression {
        Value::String(s) if s.starts_with('$') => {
            get_path(doc, &s[1..]).cloned().unwrap_or(Value::Null)
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), eval_expression(doc, v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[derive(Debug)]
enum Accumulator {
    Sum { int: i64, float: f64, is_float: bool },
    Min(Option<Value>),
    Max(Option<Value>),
}

impl Accumulator {
    fn new(op: &str) -> Result<Self, StoreError> {
        match op {
            "$sum" => Ok(Self::Sum {
                int: 0,
                float: 0.0,
                is_float: false,
            }),
            "$min" => Ok(Self::Min(None)),
            "$max" => Ok(Self::Max(None)),
            other => Err(invalid(format!("unknown accumulator {other}"))),
        }
    }

    fn push(&mut self, value: Value) {
        match self {
            Self::Sum {
                int,
                float,
                is_float,
            } => {
                // Non-numeric values are skipped.
                if let Value::Number(n) = &value {
                    match n.as_i64() {
                        Some(i) if !*is_float => match int.checked_add(i) {
                            Some(next) => *int = next,
                            None => {
                                *is_float = true;
                                *float = *int as f64 + i as f64;
                            }
                        },
                        _ => {
                            if !*is_float {
                                *is_float = true;
                                *float = *int as f64;
                            }
                            *float += n.as_f64().unwrap_or(0.0);
                        }
                    }
                }
            }
            // Missing fields never win.
            Self::Min(_) | Self::Max(_) if value.is_null() => {}
            Self::Min(current) => {
                if current.as_ref().map_or(true, |c| compare_values(&value, c).is_lt()) {
                    *current = Some(value);
                }
            }
            Self::Max(current) => {
                if current.as_ref().map_or(true, |c| compare_values(&value, c).is_gt()) {
                    *current = Some(value);
                }
            }
        }
    }

    fn finish(self) -> Value {
        match self {
            Self::Sum {
                int,
                float,
                is_float,
            } => {
                if is_float {
                    Number::from_f64(float).map_or(Value::Null, Value::Number)
                } else {
                    Value::from(int)
                }
            }
            Self::Min(v) | Self::Max(v) => v.unwrap_or(Value::Null),
        }
    }
}

fn group(docs: Vec<Document>, spec: &Document) -> Result<Vec<Document>, StoreError> {
    let key_expression = spec
        .get(ID_FIELD)
        .ok_or_else(|| invalid("$group needs an _id expression".to_string()))?;

    let mut fields = Vec::new();
    for (name, accumulator) in spec.iter().filter(|(k, _)| k.as_str() != ID_FIELD) {
        let (op, argument) = accumulator
            .as_object()
            .filter(|m| m.len() == 1)
            .and_then(|m| m.iter().next())
            .ok_or_else(|| invalid(format!("$group field {name} needs one accumulator")))?;
        Accumulator::new(op)?;
        fields.push((name.clone(), op.clone(), argument.clone()));
    }

    let mut groups: Vec<(Value, Vec<Accumulator>)> = Vec::new();
    for doc in &docs {
        let key = eval_expression(doc, key_expression);
        let index = match groups.iter().position(|(k, _)| values_equal(k, &key)) {
            Some(i) => i,
            None => {
                let mut accs = Vec::with_capacity(fields.len());
                for (_, op, _) in &fields {
                    accs.push(Accumulator::new(op)?);
                }
                groups.push((key, accs));
                groups.len() - 1
            }
        };
        for ((_, _, argument), acc) in fields.iter().zip(groups[index].1.iter_mut()) {
            acc.push(eval_expression(doc, argument));
        }
    }

    Ok(groups
        .into_iter()
        .map(|(key, accs)| {
            let mut row = Document::new();
            row.insert(ID_FIELD.to_string(), key);
            for ((name, _, _), acc) in fields.iter().zip(accs) {
                row.insert(name.clone(), acc.finish());
            }
            row
        })
        .collect())
}

fn count_argument(stage: &str, value: &Value) -> Result<usize, StoreError> {
    value
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| invalid(format!("{stage} needs a non-negative integer")))
}

/// Run `pipeline` over `docs`.
///
/// Stages: `$match`, `$group` (`$sum`, `$min`, `$max`), `$sort`, `$skip`,
/// `$limit` and `$project`.
pub(crate) fn run_pipeline(
    mut docs: Vec<Document>,
    pipeline: &[Document],
) -> Result<Vec<Document>, StoreError> {
    for stage in pipeline {
        let (name, argument) = match stage.iter().next() {
            Some(entry) if stage.len() == 1 => entry,
            _ => return Err(invalid("pipeline stages need exactly one key".to_string())),
        };
        let as_doc = || {
            argument
                .as_object()
                .ok_or_else(|| invalid(format!("{name} needs a document")))
        };
        docs = match name.as_str() {
            "$match" => {
                let filter = as_doc()?;
                let mut kept = Vec::with_capacity(docs.len());
                for doc in docs {
                    if matches(&doc, filter)? {
                        kept.push(doc);
                    }
                }
                kept
            }
            "$group" => group(docs, as_doc()?)?,
            "$sort" => {
                sort_documents(&mut docs, as_doc()?)?;
                docs
            }
            "$skip" => docs.into_iter().skip(count_argument(name, argument)?).collect(),
            "$limit" => docs.into_iter().take(count_argument(name, argument)?).collect(),
            "$project" => {
                let projection = as_doc()?;
                docs.into_iter()
                    .map(|doc| project(doc, projection))
                    .collect::<Result<_, _>>()?
            }
            other => return Err(invalid(format!("unknown pipeline stage {other}"))),
        };
    }
    Ok(docs)
}
