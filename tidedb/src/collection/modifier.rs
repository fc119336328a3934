use crate::collection::Document;
use crate::common::{Value, DOC_ID};
use crate::errors::{ErrorKind, TideError, TideResult};
use crate::filter::parse_query;

const SET: &str = "$set";
const UNSET: &str = "$unset";
const INC: &str = "$inc";
const PUSH: &str = "$push";
const ADD_TO_SET: &str = "$addToSet";
const POP: &str = "$pop";
const PULL: &str = "$pull";
const MIN: &str = "$min";
const MAX: &str = "$max";
const EACH: &str = "$each";
const SLICE: &str = "$slice";

/// Whether an update document is made of modifiers (`$set`, `$inc`...) rather
/// than being a replacement document.
///
/// # Errors
///
/// Fails if modifiers and plain fields are mixed.
pub(crate) fn is_modifier_update(update: &Document) -> TideResult<bool> {
    let modifiers = update.keys().filter(|k| k.starts_with('$')).count();
    if modifiers > 0 && modifiers != update.size() {
        return Err(validation_error("You cannot mix modifiers and normal fields"));
    }
    Ok(modifiers > 0)
}

/// Computes the new state of `document` under `update`.
///
/// A replacement keeps the `_id` of the original. Changing the `_id`, either
/// through the replacement or a modifier, fails.
pub(crate) fn modify(document: &Document, update: &Document) -> TideResult<Document> {
    let mut modified = if is_modifier_update(update)? {
        let mut modified = document.clone();
        for (modifier, argument) in update.iter() {
            let fields = argument.as_document().ok_or_else(|| {
                validation_error(&format!("Modifier {}'s argument must be an object", modifier))
            })?;
            for (field, value) in fields.iter() {
                apply_modifier(&mut modified, modifier, field, value)?;
            }
        }
        modified
    } else {
        update.clone()
    };

    match (document.id(), modified.id()) {
        (Some(old_id), Some(new_id)) if old_id != new_id => {
            return Err(validation_error("You cannot change a document's _id"));
        }
        (Some(old_id), None) => {
            modified.put(DOC_ID, old_id.clone())?;
        }
        _ => {}
    }
    Ok(modified.id_first())
}

fn apply_modifier(
    document: &mut Document,
    modifier: &str,
    field: &str,
    value: &Value,
) -> TideResult<()> {
    match modifier {
        SET => document.put(field, value.clone()),
        UNSET => {
            document.remove(field);
            Ok(())
        }
        INC => increment(document, field, value),
        PUSH => push(document, field, value, false),
        ADD_TO_SET => push(document, field, value, true),
        POP => pop(document, field, value),
        PULL => pull(document, field, value),
        MIN => keep_extreme(document, field, value, std::cmp::Ordering::Less),
        MAX => keep_extreme(document, field, value, std::cmp::Ordering::Greater),
        _ => Err(validation_error(&format!("Unknown modifier {}", modifier))),
    }
}

fn increment(document: &mut Document, field: &str, value: &Value) -> TideResult<()> {
    if !value.is_number() {
        return Err(validation_error(&format!("{} must be a number", value)));
    }

    let current = document.get(field);
    let incremented = match (&current, value) {
        (Value::Undefined, _) => value.clone(),
        (Value::I64(a), Value::I64(b)) => match a.checked_add(*b) {
            Some(sum) => Value::I64(sum),
            None => Value::F64(*a as f64 + *b as f64),
        },
        (a, b) if a.is_number() => {
            Value::F64(a.as_f64().unwrap_or_default() + b.as_f64().unwrap_or_default())
        }
        _ => {
            return Err(validation_error(
                "Don't use the $inc modifier on non-number fields",
            ))
        }
    };
    document.put(field, incremented)
}

fn current_array(document: &Document, field: &str, modifier: &str) -> TideResult<Vec<Value>> {
    match document.get(field) {
        Value::Undefined => Ok(vec![]),
        Value::Array(items) => Ok(items),
        _ => Err(validation_error(&format!(
            "Can't {} an element on non-array values",
            modifier
        ))),
    }
}

fn push(document: &mut Document, field: &str, value: &Value, unique: bool) -> TideResult<()> {
    let modifier = if unique { ADD_TO_SET } else { PUSH };
    let mut items = current_array(document, field, modifier)?;

    let (values, slice) = match value.as_document() {
        Some(each_args) if each_args.contains_key(EACH) => {
            let allowed = each_args.keys().all(|k| k == EACH || (!unique && k == SLICE));
            if !allowed {
                return Err(validation_error(&format!(
                    "Can only use {} in conjunction with {}",
                    if unique { "$each" } else { "$each and $slice" },
                    modifier
                )));
            }
            let values = each_args.get(EACH).as_array().cloned().ok_or_else(|| {
                validation_error("$each requires an array value")
            })?;
            let slice = match each_args.field(SLICE) {
                Some(slice) => Some(slice.as_i64().ok_or_else(|| {
                    validation_error("$slice requires an integer value")
                })?),
                None => None,
            };
            (values, slice)
        }
        _ => (vec![value.clone()], None),
    };

    for value in values {
        if !unique || !items.contains(&value) {
            items.push(value);
        }
    }

    if let Some(slice) = slice {
        let len = items.len() as i64;
        items = if slice >= 0 {
            items.into_iter().take(slice as usize).collect()
        } else {
            let start = (len + slice).max(0) as usize;
            items.into_iter().skip(start).collect()
        };
    }

    document.put(field, Value::Array(items))
}

fn pop(document: &mut Document, field: &str, value: &Value) -> TideResult<()> {
    let mut items = current_array(document, field, POP)?;
    let direction = value
        .as_i64()
        .ok_or_else(|| validation_error(&format!("{} isn't an integer, can't use it with $pop", value)))?;

    if direction > 0 {
        items.pop();
    } else if direction < 0 && !items.is_empty() {
        items.remove(0);
    } else {
        return Ok(());
    }
    document.put(field, Value::Array(items))
}

fn pull(document: &mut Document, field: &str, value: &Value) -> TideResult<()> {
    let items = current_array(document, field, PULL)?;

    let element_query = match value {
        Value::Document(query) if !query.keys().any(|k| k.starts_with('$')) => {
            Some(parse_query(query)?)
        }
        _ => None,
    };
    // anything else is matched as the condition of a single field
    let mut wrapper_query = Document::new();
    wrapper_query.put("value", value.clone())?;
    let value_query = parse_query(&wrapper_query)?;

    let mut kept = Vec::with_capacity(items.len());
    for item in items {
        let matched = match (&element_query, &item) {
            (Some(query), Value::Document(element)) => query.apply(element)?,
            _ => {
                let mut wrapper = Document::new();
                wrapper.put("value", item.clone())?;
                value_query.apply(&wrapper)?
            }
        };
        if !matched {
            kept.push(item);
        }
    }
    document.put(field, Value::Array(kept))
}

fn keep_extreme(
    document: &mut Document,
    field: &str,
    value: &Value,
    wanted: std::cmp::Ordering,
) -> TideResult<()> {
    let current = document.get(field);
    if current.is_undefined() || value.cmp(&current) == wanted {
        document.put(field, value.clone())?;
    }
    Ok(())
}

fn validation_error(message: &str) -> TideError {
    log::error!("{}", message);
    TideError::new(message, ErrorKind::ValidationError)
}
