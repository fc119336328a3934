use crate::common::{Value, DOC_ID, FIELD_SEPARATOR};
use crate::errors::{ErrorKind, TideError, TideResult};
use indexmap::IndexMap;
use itertools::Itertools;
use std::fmt::{Debug, Display};

/// Represents a document stored in a [`crate::Datastore`].
///
/// A document is an insertion-ordered map from field name to [Value]. Keys
/// containing the field separator (`.`) address embedded documents and array
/// elements, e.g. `document.get("address.city")` or `document.get("tags.0")`.
///
/// The `_id` field is the primary key. It is generated on insert when absent
/// and cannot be changed afterwards.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Document {
    data: IndexMap<String, Value>,
}

impl Document {
    /// Creates a new empty document.
    pub fn new() -> Self {
        Document {
            data: IndexMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the number of top level fields.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Associates `value` with `key`.
    ///
    /// Embedded keys (`"address.city"`) create the intermediate documents when
    /// they are missing; a numeric segment addresses an existing array element.
    ///
    /// # Errors
    ///
    /// Returns an error if the key, or one of its segments, is empty.
    pub fn put<T: Into<Value>>(&mut self, key: &str, value: T) -> TideResult<()> {
        if key.is_empty() {
            log::error!("Document does not support empty key");
            return Err(TideError::new(
                "Document does not support empty key",
                ErrorKind::ValidationError,
            ));
        }

        let value = value.into();
        if key.contains(FIELD_SEPARATOR) {
            let splits: Vec<&str> = key.split(FIELD_SEPARATOR).collect();
            self.deep_put(&splits, value)
        } else {
            self.data.insert(key.to_string(), value);
            Ok(())
        }
    }

    /// Returns the value at `key`, or [Value::Undefined] if there is none.
    ///
    /// When an embedded key crosses an array, a numeric segment selects one
    /// element and any other segment is applied to every element, producing an
    /// array of the results:
    ///
    /// ```rust
    /// use tidedb::doc;
    /// use tidedb::common::Value;
    ///
    /// let doc = doc! { items: [{ sku: "a" }, { sku: "b" }] };
    /// assert_eq!(doc.get("items.1.sku"), Value::from("b"));
    /// assert_eq!(doc.get("items.sku"), Value::from(vec!["a", "b"]));
    /// assert_eq!(doc.get("missing"), Value::Undefined);
    /// ```
    pub fn get(&self, key: &str) -> Value {
        if let Some(value) = self.data.get(key) {
            return value.clone();
        }

        if key.contains(FIELD_SEPARATOR) {
            let splits: Vec<&str> = key.split(FIELD_SEPARATOR).collect();
            match self.data.get(splits[0]) {
                Some(value) => recursive_get(value, &splits[1..]),
                None => Value::Undefined,
            }
        } else {
            Value::Undefined
        }
    }

    /// Returns a reference to a top level field.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Returns the primary key, if the document has one.
    pub fn id(&self) -> Option<&Value> {
        self.data.get(DOC_ID)
    }

    pub fn has_id(&self) -> bool {
        self.data.contains_key(DOC_ID)
    }

    /// Checks whether a top level field is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Checks whether a (possibly embedded) field resolves to a defined value.
    pub fn contains_field(&self, field: &str) -> bool {
        !self.get(field).is_undefined()
    }

    /// Removes the key and its value from the document, returning the value.
    ///
    /// Removing an embedded key leaves the parent document in place, even when
    /// it becomes empty.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        if self.data.contains_key(key) || !key.contains(FIELD_SEPARATOR) {
            return self.data.shift_remove(key);
        }

        let splits: Vec<&str> = key.split(FIELD_SEPARATOR).collect();
        self.deep_remove(&splits)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.data.iter()
    }

    pub fn iter_mut(&mut self) -> indexmap::map::IterMut<'_, String, Value> {
        self.data.iter_mut()
    }

    /// Returns a mutable reference to a top level field.
    pub fn field_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.data.get_mut(key)
    }

    /// Moves `_id` to the front, so stored and returned documents list it first.
    pub(crate) fn id_first(mut self) -> Self {
        if let Some(index) = self.data.get_index_of(DOC_ID) {
            self.data.move_index(index, 0);
        }
        self
    }

    fn deep_put(&mut self, splits: &[&str], value: Value) -> TideResult<()> {
        let key = splits[0];
        if key.is_empty() {
            log::error!("Document does not support empty key");
            return Err(TideError::new(
                "Document does not support empty key",
                ErrorKind::ValidationError,
            ));
        }

        if splits.len() == 1 {
            // last segment, simply put in the current document
            self.data.insert(key.to_string(), value);
            return Ok(());
        }

        let remaining = &splits[1..];
        match self.data.get_mut(key) {
            Some(Value::Document(obj)) => obj.deep_put(remaining, value),
            Some(Value::Array(arr)) => match remaining[0].parse::<usize>() {
                Ok(index) if index < arr.len() => {
                    if remaining.len() == 1 {
                        arr[index] = value;
                        Ok(())
                    } else {
                        put_into_element(&mut arr[index], &remaining[1..], value)
                    }
                }
                _ => {
                    log::error!("Invalid array index {} in embedded key", remaining[0]);
                    Err(TideError::new(
                        &format!("Invalid array index {} in embedded key", remaining[0]),
                        ErrorKind::ValidationError,
                    ))
                }
            },
            _ => {
                // missing or scalar at this level, replace it with a new document
                let mut nested_doc = Document::new();
                nested_doc.deep_put(remaining, value)?;
                self.data.insert(key.to_string(), Value::Document(nested_doc));
                Ok(())
            }
        }
    }

    fn deep_remove(&mut self, splits: &[&str]) -> Option<Value> {
        let key = splits[0];
        if splits.len() == 1 {
            return self.data.shift_remove(key);
        }

        match self.data.get_mut(key) {
            Some(Value::Document(obj)) => obj.deep_remove(&splits[1..]),
            Some(Value::Array(arr)) => {
                let index = splits[1].parse::<usize>().ok()?;
                if index >= arr.len() {
                    return None;
                }
                if splits.len() == 2 {
                    // an array slot is cleared, not shifted
                    Some(std::mem::replace(&mut arr[index], Value::Undefined))
                } else {
                    arr[index].as_document_mut()?.deep_remove(&splits[2..])
                }
            }
            _ => None,
        }
    }
}

fn put_into_element(element: &mut Value, splits: &[&str], value: Value) -> TideResult<()> {
    match element {
        Value::Document(obj) => obj.deep_put(splits, value),
        _ => {
            let mut nested_doc = Document::new();
            nested_doc.deep_put(splits, value)?;
            *element = Value::Document(nested_doc);
            Ok(())
        }
    }
}

fn recursive_get(value: &Value, splits: &[&str]) -> Value {
    if splits.is_empty() {
        return value.clone();
    }

    match value {
        Value::Document(obj) => match obj.data.get(splits[0]) {
            Some(next) => recursive_get(next, &splits[1..]),
            None => Value::Undefined,
        },
        Value::Array(arr) => {
            if let Ok(index) = splits[0].parse::<usize>() {
                match arr.get(index) {
                    Some(item) => recursive_get(item, &splits[1..]),
                    None => Value::Undefined,
                }
            } else {
                // not an index, decompose the array
                Value::Array(arr.iter().map(|item| recursive_get(item, splits)).collect())
            }
        }
        _ => Value::Undefined,
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Document {
            data: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.into_iter()
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

impl Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.data.iter()).finish()
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{{}}}",
            self.data
                .iter()
                .map(|(key, value)| format!("{}: {}", key, value))
                .join(", ")
        )
    }
}

pub fn normalize(value: &str) -> String {
    value.trim_matches('"').to_string()
}

/// Creates a Document with JSON-like syntax.
///
/// Keys may be identifiers or string literals (operator keys such as `"$gt"`
/// must be string literals). Negative numbers and other multi-token
/// expressions go in parentheses. Keys are stored as written, so a dotted key
/// such as `"address.city"` stays a single path, as query and modifier
/// documents expect.
///
/// ```rust
/// use tidedb::doc;
///
/// let empty = doc!{};
/// let query = doc!{ age: { "$gt": 10 }, "$or": [{ name: "John" }, { name: "Mary" }] };
/// let sort = doc!{ age: (-1) };
/// assert!(empty.is_empty());
/// assert_eq!(query.size(), 2);
/// assert_eq!(sort.size(), 1);
/// ```
#[macro_export]
macro_rules! doc {
    ({}) => {
        $crate::collection::Document::new()
    };

    () => {
        $crate::collection::Document::new()
    };

    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::doc!($($key : $value),*)
    };

    // keys are taken verbatim, so `"address.city"` stays a dotted path
    ($($key:tt : $value:tt),* $(,)?) => {
        {
            #[allow(unused_imports)]
            use $crate::doc_value;

            <$crate::collection::Document as ::std::iter::FromIterator<(::std::string::String, $crate::common::Value)>>::from_iter(
                ::std::vec![$(
                    ($crate::collection::normalize(stringify!($key)), $crate::doc_value!($value)),
                )*]
            )
        }
    };
}

/// Helper macro to convert values for the doc! macro.
#[macro_export]
macro_rules! doc_value {
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        {
            $crate::common::Value::Document($crate::doc!{ $($key : $value),* })
        }
    };

    ([ $($value:tt),* $(,)? ]) => {
        $crate::common::Value::Array(vec![$($crate::doc_value!($value)),*])
    };

    ($value:expr) => {
        $crate::common::Value::from($value)
    };
}
