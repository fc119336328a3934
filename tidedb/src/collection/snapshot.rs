use crate::collection::Document;
use crate::common::Value;
use crate::errors::{ErrorKind, TideError, TideResult};
use crate::filter::{Filter, IndexScan};
use crate::index::{Index, IndexOptions, IndexSet, RangeQuery};
use im::{OrdMap, OrdSet};

/// The state of a datastore at one point in time.
///
/// Documents are keyed by `_id` and carry a sequence number giving their
/// insertion order. Every live document is reflected in every index.
///
/// All the maps are persistent, so a clone is O(1) and shares structure.
/// Mutations run on a clone which replaces the published snapshot only once
/// they fully succeed.
#[derive(Clone, Default)]
pub(crate) struct Snapshot {
    documents: OrdMap<Value, (u64, Document)>,
    order: OrdMap<u64, Value>,
    next_seq: u64,
    indexes: IndexSet,
}

impl Snapshot {
    pub fn new() -> Snapshot {
        Snapshot::default()
    }

    /// Builds a snapshot from loaded documents and index definitions.
    ///
    /// Fails if the documents break the uniqueness of an index.
    pub fn build(documents: Vec<Document>, definitions: Vec<IndexOptions>) -> TideResult<Snapshot> {
        let mut snapshot = Snapshot::new();
        for options in definitions {
            snapshot.indexes.create(options, &[])?;
        }
        snapshot.indexes.insert_many(&documents)?;

        for document in documents {
            let id = document_id(&document)?;
            if snapshot.documents.contains_key(&id) {
                return Err(duplicate_id(&id));
            }
            snapshot.push(id, document);
        }
        Ok(snapshot)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get(&self, id: &Value) -> Option<&Document> {
        self.documents.get(id).map(|(_, document)| document)
    }

    pub fn contains(&self, id: &Value) -> bool {
        self.documents.contains_key(id)
    }

    /// Live documents in insertion order.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.order
            .values()
            .filter_map(|id| self.documents.get(id).map(|(_, document)| document))
    }

    pub fn indexes(&self) -> &IndexSet {
        &self.indexes
    }

    pub fn insert(&mut self, document: Document) -> TideResult<()> {
        let id = document_id(&document)?;
        self.indexes.insert(&document)?;
        self.push(id, document);
        Ok(())
    }

    /// Replaces documents in place, keeping their position in the insertion
    /// order.
    pub fn replace_many(&mut self, pairs: Vec<(Document, Document)>) -> TideResult<()> {
        self.indexes.update_many(&pairs)?;
        for (old, new) in pairs {
            let id = document_id(&old)?;
            if let Some((seq, _)) = self.documents.get(&id) {
                let seq = *seq;
                self.documents.insert(id, (seq, new));
            }
        }
        Ok(())
    }

    pub fn remove(&mut self, id: &Value) -> TideResult<Option<Document>> {
        match self.documents.get(id) {
            Some((_, document)) => {
                let document = document.clone();
                self.indexes.remove(&document)?;
                if let Some((seq, _)) = self.documents.remove(id) {
                    self.order.remove(&seq);
                }
                Ok(Some(document))
            }
            None => Ok(None),
        }
    }

    pub fn create_index(&mut self, options: IndexOptions) -> TideResult<()> {
        let documents: Vec<Document> = self.documents().cloned().collect();
        self.indexes.create(options, &documents)
    }

    pub fn remove_index(&mut self, field_name: &str) -> Option<Index> {
        self.indexes.remove_index(field_name)
    }

    /// Documents matching `filter`, in insertion order.
    pub fn find(&self, filter: &Filter) -> TideResult<Vec<Document>> {
        let mut matched = Vec::new();
        for document in self.candidates(filter) {
            if filter.apply(&document)? {
                matched.push(document);
            }
        }
        Ok(matched)
    }

    /// A superset of the documents matching `filter`, narrowed down by the
    /// first index that can serve one of its scans.
    pub fn candidates(&self, filter: &Filter) -> Vec<Document> {
        for (field_name, scan) in filter.index_scans() {
            let index = match self.indexes.get(&field_name) {
                Some(index) => index,
                None => continue,
            };
            // a sparse index has no entry for missing fields
            if index.options().is_sparse() && scan_matches_undefined(&scan) {
                continue;
            }

            log::debug!("Using index on {} for {}", field_name, filter);
            let ids = match &scan {
                IndexScan::Equals(value) => index.find(value),
                IndexScan::In(values) => index.find_in(values),
                IndexScan::Range(range) => find_range(index, range),
            };
            return self.in_insertion_order(ids);
        }
        self.documents().cloned().collect()
    }

    fn in_insertion_order(&self, ids: Vec<Value>) -> Vec<Document> {
        let mut found: Vec<&(u64, Document)> =
            ids.iter().filter_map(|id| self.documents.get(id)).collect();
        found.sort_by_key(|(seq, _)| *seq);
        found.into_iter().map(|(_, document)| document.clone()).collect()
    }

    fn push(&mut self, id: Value, document: Document) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, id.clone());
        self.documents.insert(id, (seq, document));
    }
}

// Elements of an array field are matched one condition at a time, so
// `{$gt: 5, $lt: 3}` matches `[1, 10]`. A two sided range is looked up as the
// intersection of its two sides.
fn find_range(index: &Index, range: &RangeQuery) -> Vec<Value> {
    let has_lower = range.gt.is_some() || range.gte.is_some();
    let has_upper = range.lt.is_some() || range.lte.is_some();
    if !(has_lower && has_upper) {
        return index.find_range(range);
    }

    let lower = RangeQuery {
        gt: range.gt.clone(),
        gte: range.gte.clone(),
        ..Default::default()
    };
    let upper = RangeQuery {
        lt: range.lt.clone(),
        lte: range.lte.clone(),
        ..Default::default()
    };
    let above: OrdSet<Value> = index.find_range(&lower).into_iter().collect();
    index
        .find_range(&upper)
        .into_iter()
        .filter(|id| above.contains(id))
        .collect()
}

fn scan_matches_undefined(scan: &IndexScan) -> bool {
    match scan {
        IndexScan::Equals(value) => value.is_undefined(),
        IndexScan::In(values) => values.iter().any(Value::is_undefined),
        IndexScan::Range(range) => [&range.gt, &range.gte, &range.lt, &range.lte]
            .into_iter()
            .flatten()
            .any(Value::is_undefined),
    }
}

fn document_id(document: &Document) -> TideResult<Value> {
    match document.id() {
        Some(id) => Ok(id.clone()),
        None => {
            log::error!("Document has no _id");
            Err(TideError::new("Document has no _id", ErrorKind::InternalError))
        }
    }
}

fn duplicate_id(id: &Value) -> TideError {
    log::error!("Duplicate _id {}", id);
    TideError::new(
        &format!("Can't insert key {}, it violates the unique constraint of index _id", id),
        ErrorKind::UniqueConstraintViolation,
    )
}
