use crate::collection::Document;
use crate::common::{
    RegexValue, Value, DELETED_TAG, DOC_ID, INDEX_CREATED_TAG, INDEX_REMOVED_TAG, TYPE_DATE,
    TYPE_REGEX, TYPE_TAG, TYPE_UNDEFINED, TYPE_VALUE,
};
use crate::errors::{ErrorKind, TideError, TideResult};
use crate::index::IndexOptions;
use chrono::{TimeZone, Utc};
use serde_json::{Map, Number, Value as JsonValue};

/// One line of the datafile.
#[derive(Clone, Debug, PartialEq)]
pub enum LogRecord {
    /// Full state of a document, written on insert and update.
    Document(Document),
    /// The document with this primary key was removed.
    Deleted(Value),
    IndexCreated(IndexOptions),
    IndexRemoved(String),
}

/// Serializes a document into a single line of JSON.
///
/// `Undefined`, dates and regular expressions are written as
/// `{"$$type": ..., "value": ...}` envelopes.
///
/// # Errors
///
/// Returns [`ErrorKind::EncodingError`] for non-finite floats.
pub fn serialize(document: &Document) -> TideResult<String> {
    let json = document_to_json(document)?;
    Ok(serde_json::to_string(&json)?)
}

/// Parses a line produced by [serialize].
///
/// # Errors
///
/// Returns [`ErrorKind::CorruptRecord`] if the line is not a JSON object.
pub fn deserialize(line: &str) -> TideResult<Document> {
    let map = parse_object(line)?;
    json_to_document(map)
}

pub fn encode_record(record: &LogRecord) -> TideResult<String> {
    let json = match record {
        LogRecord::Document(document) => document_to_json(document)?,
        LogRecord::Deleted(id) => {
            let mut map = Map::new();
            map.insert(DELETED_TAG.to_string(), JsonValue::Bool(true));
            map.insert(DOC_ID.to_string(), value_to_json(id)?);
            JsonValue::Object(map)
        }
        LogRecord::IndexCreated(options) => {
            let mut map = Map::new();
            map.insert(INDEX_CREATED_TAG.to_string(), serde_json::to_value(options)?);
            JsonValue::Object(map)
        }
        LogRecord::IndexRemoved(field_name) => {
            let mut map = Map::new();
            map.insert(
                INDEX_REMOVED_TAG.to_string(),
                JsonValue::String(field_name.clone()),
            );
            JsonValue::Object(map)
        }
    };
    Ok(serde_json::to_string(&json)?)
}

pub fn decode_record(line: &str) -> TideResult<LogRecord> {
    let mut map = parse_object(line)?;

    if map.get(DELETED_TAG).and_then(JsonValue::as_bool) == Some(true) {
        return match map.remove(DOC_ID) {
            Some(id) => Ok(LogRecord::Deleted(json_to_value(id)?)),
            None => Err(corrupt_record("Deletion marker without _id")),
        };
    }

    if let Some(options) = map.remove(INDEX_CREATED_TAG) {
        let options: IndexOptions = serde_json::from_value(options)
            .map_err(|e| corrupt_record(&format!("Invalid index definition: {}", e)))?;
        return Ok(LogRecord::IndexCreated(options.normalized()));
    }

    if let Some(field_name) = map.remove(INDEX_REMOVED_TAG) {
        return match field_name {
            JsonValue::String(field_name) => Ok(LogRecord::IndexRemoved(field_name)),
            _ => Err(corrupt_record("Invalid index removal record")),
        };
    }

    Ok(LogRecord::Document(json_to_document(map)?))
}

fn parse_object(line: &str) -> TideResult<Map<String, JsonValue>> {
    match serde_json::from_str::<JsonValue>(line) {
        Ok(JsonValue::Object(map)) => Ok(map),
        Ok(_) => Err(corrupt_record("Record is not a JSON object")),
        Err(e) => Err(corrupt_record(&format!("Record is not valid JSON: {}", e))),
    }
}

fn corrupt_record(message: &str) -> TideError {
    log::debug!("{}", message);
    TideError::new(message, ErrorKind::CorruptRecord)
}

fn document_to_json(document: &Document) -> TideResult<JsonValue> {
    let mut map = Map::with_capacity(document.size());
    for (key, value) in document.iter() {
        map.insert(key.clone(), value_to_json(value)?);
    }
    Ok(JsonValue::Object(map))
}

fn envelope(type_name: &str, value: Option<JsonValue>) -> JsonValue {
    let mut map = Map::new();
    map.insert(TYPE_TAG.to_string(), JsonValue::String(type_name.to_string()));
    if let Some(value) = value {
        map.insert(TYPE_VALUE.to_string(), value);
    }
    JsonValue::Object(map)
}

fn value_to_json(value: &Value) -> TideResult<JsonValue> {
    let json = match value {
        Value::Undefined => envelope(TYPE_UNDEFINED, None),
        Value::Null => JsonValue::Null,
        Value::Bool(v) => JsonValue::Bool(*v),
        Value::I64(v) => JsonValue::Number(Number::from(*v)),
        Value::F64(v) => match Number::from_f64(*v) {
            Some(number) => JsonValue::Number(number),
            None => {
                log::error!("Cannot encode non-finite number {}", v);
                return Err(TideError::new(
                    &format!("Cannot encode non-finite number {}", v),
                    ErrorKind::EncodingError,
                ));
            }
        },
        Value::String(v) => JsonValue::String(v.clone()),
        Value::Date(v) => envelope(
            TYPE_DATE,
            Some(JsonValue::Number(Number::from(v.timestamp_millis()))),
        ),
        Value::Regex(v) => envelope(TYPE_REGEX, Some(JsonValue::String(v.pattern().to_string()))),
        Value::Array(items) => JsonValue::Array(
            items
                .iter()
                .map(value_to_json)
                .collect::<TideResult<Vec<_>>>()?,
        ),
        Value::Document(doc) => document_to_json(doc)?,
    };
    Ok(json)
}

fn json_to_document(map: Map<String, JsonValue>) -> TideResult<Document> {
    map.into_iter()
        .map(|(key, value)| -> TideResult<(String, Value)> { Ok((key, json_to_value(value)?)) })
        .collect()
}

fn json_to_value(json: JsonValue) -> TideResult<Value> {
    let value = match json {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(v) => Value::Bool(v),
        JsonValue::Number(n) => match n.as_i64() {
            Some(v) => Value::I64(v),
            None => Value::F64(n.as_f64().unwrap_or(f64::NAN)),
        },
        JsonValue::String(v) => Value::String(v),
        JsonValue::Array(items) => Value::Array(
            items
                .into_iter()
                .map(json_to_value)
                .collect::<TideResult<Vec<_>>>()?,
        ),
        JsonValue::Object(map) => {
            let type_name = map
                .get(TYPE_TAG)
                .and_then(JsonValue::as_str)
                .map(String::from);
            match type_name {
                Some(type_name) => decode_envelope(&type_name, &map)?,
                None => Value::Document(json_to_document(map)?),
            }
        }
    };
    Ok(value)
}

fn decode_envelope(type_name: &str, map: &Map<String, JsonValue>) -> TideResult<Value> {
    match type_name {
        TYPE_UNDEFINED => Ok(Value::Undefined),
        TYPE_DATE => {
            let millis = map
                .get(TYPE_VALUE)
                .and_then(JsonValue::as_i64)
                .ok_or_else(|| corrupt_record("Date envelope without epoch millis"))?;
            match Utc.timestamp_millis_opt(millis).single() {
                Some(date) => Ok(Value::Date(date)),
                None => Err(corrupt_record(&format!("Date out of range: {}", millis))),
            }
        }
        TYPE_REGEX => {
            let pattern = map
                .get(TYPE_VALUE)
                .and_then(JsonValue::as_str)
                .ok_or_else(|| corrupt_record("Regex envelope without pattern"))?;
            let regex = RegexValue::new(pattern)
                .map_err(|e| corrupt_record(&format!("Invalid stored regex: {}", e)))?;
            Ok(Value::Regex(regex))
        }
        _ => Err(corrupt_record(&format!("Unknown value type {}", type_name))),
    }
}
