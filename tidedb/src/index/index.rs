use crate::collection::Document;
use crate::common::Value;
use crate::errors::{ErrorKind, TideError, TideResult};
use crate::index::IndexOptions;
use im::{OrdMap, OrdSet};
use itertools::Itertools;
use std::ops::Bound;

/// Bounds of a range lookup, built from `$gt`/`$gte`/`$lt`/`$lte` conditions.
///
/// Only keys of the same class (numbers, strings or dates) as the bounds are
/// returned.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RangeQuery {
    pub gt: Option<Value>,
    pub gte: Option<Value>,
    pub lt: Option<Value>,
    pub lte: Option<Value>,
}

impl RangeQuery {
    pub fn is_empty(&self) -> bool {
        self.gt.is_none() && self.gte.is_none() && self.lt.is_none() && self.lte.is_none()
    }

    fn lower(&self) -> Bound<Value> {
        match (&self.gt, &self.gte) {
            (Some(gt), Some(gte)) if gte > gt => Bound::Included(gte.clone()),
            (Some(gt), _) => Bound::Excluded(gt.clone()),
            (None, Some(gte)) => Bound::Included(gte.clone()),
            (None, None) => Bound::Unbounded,
        }
    }

    fn upper(&self) -> Bound<Value> {
        match (&self.lt, &self.lte) {
            (Some(lt), Some(lte)) if lte < lt => Bound::Included(lte.clone()),
            (Some(lt), _) => Bound::Excluded(lt.clone()),
            (None, Some(lte)) => Bound::Included(lte.clone()),
            (None, None) => Bound::Unbounded,
        }
    }

    fn bounds(&self) -> impl Iterator<Item = &Value> {
        [&self.gt, &self.gte, &self.lt, &self.lte]
            .into_iter()
            .flatten()
    }

    fn accepts(&self, key: &Value) -> bool {
        self.bounds().all(|bound| key.is_comparable_with(bound))
    }
}

fn is_empty_range(lower: &Bound<Value>, upper: &Bound<Value>) -> bool {
    match (lower, upper) {
        (Bound::Included(l), Bound::Included(u)) => l > u,
        (Bound::Included(l), Bound::Excluded(u))
        | (Bound::Excluded(l), Bound::Included(u))
        | (Bound::Excluded(l), Bound::Excluded(u)) => l >= u,
        _ => false,
    }
}

/// An ordered index from field value to primary keys.
///
/// The index is a persistent value: cloning it is cheap and shares structure,
/// which is how snapshots and rollbacks are implemented.
#[derive(Clone)]
pub struct Index {
    options: IndexOptions,
    fields: Vec<String>,
    entries: OrdMap<Value, OrdSet<Value>>,
}

impl Index {
    pub fn new(options: IndexOptions) -> Index {
        let fields = options.fields();
        Index {
            options,
            fields,
            entries: OrdMap::new(),
        }
    }

    pub fn options(&self) -> &IndexOptions {
        &self.options
    }

    pub fn field_name(&self) -> &str {
        self.options.field_name()
    }

    pub fn is_unique(&self) -> bool {
        self.options.is_unique()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Extracts the keys a document is indexed under.
    ///
    /// An empty result means the document is not indexed, which happens for a
    /// sparse index when the field is missing or when the field is an empty
    /// array.
    pub fn keys_of(&self, document: &Document) -> Vec<Value> {
        if self.fields.len() > 1 {
            let values: Vec<Value> = self.fields.iter().map(|f| document.get(f)).collect();
            if self.options.is_sparse() && values.iter().all(Value::is_undefined) {
                return vec![];
            }
            return vec![Value::Array(values)];
        }

        let value = document.get(&self.fields[0]);
        match value {
            Value::Undefined if self.options.is_sparse() => vec![],
            Value::Array(items) => items.into_iter().sorted().dedup().collect(),
            other => vec![other],
        }
    }

    /// Validates that inserting `document` would not break uniqueness.
    pub fn check_insert(&self, document: &Document) -> TideResult<()> {
        if !self.is_unique() {
            return Ok(());
        }

        let id = document_id(document)?;
        for key in self.keys_of(document) {
            if let Some(ids) = self.entries.get(&key) {
                if ids.iter().any(|existing| existing != &id) {
                    log::error!(
                        "Can't insert key {}, it violates the unique constraint of index {}",
                        key,
                        self.field_name()
                    );
                    return Err(TideError::new(
                        &format!(
                            "Can't insert key {}, it violates the unique constraint of index {}",
                            key,
                            self.field_name()
                        ),
                        ErrorKind::UniqueConstraintViolation,
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn insert(&mut self, document: &Document) -> TideResult<()> {
        self.check_insert(document)?;
        let id = document_id(document)?;
        for key in self.keys_of(document) {
            let ids = self.entries.entry(key).or_insert_with(OrdSet::new);
            ids.insert(id.clone());
        }
        Ok(())
    }

    /// Inserts every document, or none of them.
    pub fn insert_many(&mut self, documents: &[Document]) -> TideResult<()> {
        let backup = self.clone();
        for document in documents {
            if let Err(e) = self.insert(document) {
                *self = backup;
                return Err(e);
            }
        }
        Ok(())
    }

    pub fn remove(&mut self, document: &Document) -> TideResult<()> {
        let id = document_id(document)?;
        for key in self.keys_of(document) {
            let now_empty = match self.entries.get_mut(&key) {
                Some(ids) => {
                    ids.remove(&id);
                    ids.is_empty()
                }
                None => false,
            };
            if now_empty {
                self.entries.remove(&key);
            }
        }
        Ok(())
    }

    /// Applies every `(old, new)` replacement, or none of them.
    pub fn update_many(&mut self, pairs: &[(Document, Document)]) -> TideResult<()> {
        let backup = self.clone();
        // remove everything first so documents can swap keys within one batch
        let result = pairs
            .iter()
            .try_for_each(|(old, _)| self.remove(old))
            .and_then(|_| pairs.iter().try_for_each(|(_, new)| self.insert(new)));
        if result.is_err() {
            *self = backup;
        }
        result
    }

    /// Primary keys of the documents indexed under `key`.
    pub fn find(&self, key: &Value) -> Vec<Value> {
        self.entries
            .get(key)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Primary keys of the documents indexed under any of `keys`.
    pub fn find_in(&self, keys: &[Value]) -> Vec<Value> {
        keys.iter()
            .filter_map(|key| self.entries.get(key))
            .flat_map(|ids| ids.iter().cloned())
            .sorted()
            .dedup()
            .collect()
    }

    /// Primary keys of the documents whose key falls within the range.
    pub fn find_range(&self, query: &RangeQuery) -> Vec<Value> {
        let lower = query.lower();
        let upper = query.upper();
        if is_empty_range(&lower, &upper) {
            return vec![];
        }

        self.entries
            .range((lower, upper))
            .filter(|(key, _)| query.accepts(key))
            .flat_map(|(_, ids)| ids.iter().cloned())
            .sorted()
            .dedup()
            .collect()
    }
}

fn document_id(document: &Document) -> TideResult<Value> {
    match document.id() {
        Some(id) => Ok(id.clone()),
        None => {
            log::error!("Cannot index a document without _id");
            Err(TideError::new(
                "Cannot index a document without _id",
                ErrorKind::InternalError,
            ))
        }
    }
}
