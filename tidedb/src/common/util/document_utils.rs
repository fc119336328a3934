use crate::collection::Document;
use crate::common::{Value, DOC_ID, FIELD_SEPARATOR};
use crate::errors::{ErrorKind, TideError, TideResult};

/// Creates a document with a single key-value pair.
pub fn create_document(key: &str, value: Value) -> TideResult<Document> {
    let mut doc = Document::new();
    doc.put(key, value)?;
    Ok(doc)
}

/// Checks that a document can be stored.
///
/// Field names, at any depth and inside arrays, must not start with `$` and
/// must not contain `.`. The primary key can't be an array or a document.
pub fn validate_document(document: &Document) -> TideResult<()> {
    if let Some(id) = document.id() {
        if id.is_array() || id.is_document() || id.is_undefined() {
            log::error!("Invalid _id value {}", id);
            return Err(TideError::new(
                &format!("Invalid _id value {}", id),
                ErrorKind::ValidationError,
            ));
        }
    }
    validate_fields(document)
}

fn validate_fields(document: &Document) -> TideResult<()> {
    for (key, value) in document.iter() {
        check_key(key)?;
        validate_value(value)?;
    }
    Ok(())
}

fn validate_value(value: &Value) -> TideResult<()> {
    match value {
        Value::Document(doc) => validate_fields(doc),
        Value::Array(items) => items.iter().try_for_each(validate_value),
        _ => Ok(()),
    }
}

fn check_key(key: &str) -> TideResult<()> {
    if key.starts_with('$') {
        log::error!("Field names cannot begin with the $ character: {}", key);
        return Err(TideError::new(
            &format!("Field names cannot begin with the $ character: {}", key),
            ErrorKind::ValidationError,
        ));
    }

    if key.contains(FIELD_SEPARATOR) {
        log::error!("Field names cannot contain a .: {}", key);
        return Err(TideError::new(
            &format!("Field names cannot contain a .: {}", key),
            ErrorKind::ValidationError,
        ));
    }
    Ok(())
}

/// Returns whether `key` is the primary key field.
#[inline]
pub fn is_id_field(key: &str) -> bool {
    key == DOC_ID
}
