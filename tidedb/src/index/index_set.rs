use crate::collection::Document;
use crate::common::DOC_ID;
use crate::errors::TideResult;
use crate::index::{id_index, Index, IndexOptions};
use im::OrdMap;

/// All indexes of a snapshot, keyed by field name.
///
/// Every mutation is all-or-nothing across the set: uniqueness is checked
/// against every index before any of them changes, and a failure part way
/// restores the indexes already touched.
#[derive(Clone)]
pub struct IndexSet {
    indexes: OrdMap<String, Index>,
}

impl Default for IndexSet {
    fn default() -> Self {
        IndexSet::new()
    }
}

impl IndexSet {
    /// Creates a set holding only the unique `_id` index.
    pub fn new() -> IndexSet {
        let mut indexes = OrdMap::new();
        indexes.insert(DOC_ID.to_string(), Index::new(id_index()));
        IndexSet { indexes }
    }

    pub fn get(&self, field_name: &str) -> Option<&Index> {
        self.indexes.get(field_name)
    }

    pub fn contains(&self, field_name: &str) -> bool {
        self.indexes.contains_key(field_name)
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Index> {
        self.indexes.values()
    }

    /// Options of every index except `_id`, in field name order.
    pub fn definitions(&self) -> Vec<IndexOptions> {
        self.indexes
            .values()
            .filter(|index| index.field_name() != DOC_ID)
            .map(|index| index.options().clone())
            .collect()
    }

    /// Builds a new index over `documents` and adds it to the set.
    pub fn create(&mut self, options: IndexOptions, documents: &[Document]) -> TideResult<()> {
        let mut index = Index::new(options);
        index.insert_many(documents)?;
        self.indexes.insert(index.field_name().to_string(), index);
        Ok(())
    }

    pub fn remove_index(&mut self, field_name: &str) -> Option<Index> {
        self.indexes.remove(field_name)
    }

    pub fn insert(&mut self, document: &Document) -> TideResult<()> {
        for index in self.indexes.values() {
            index.check_insert(document)?;
        }
        self.apply(|index| index.insert(document))
    }

    pub fn insert_many(&mut self, documents: &[Document]) -> TideResult<()> {
        self.apply(|index| index.insert_many(documents))
    }

    pub fn remove(&mut self, document: &Document) -> TideResult<()> {
        self.apply(|index| index.remove(document))
    }

    pub fn update_many(&mut self, pairs: &[(Document, Document)]) -> TideResult<()> {
        self.apply(|index| index.update_many(pairs))
    }

    fn apply<F>(&mut self, mut op: F) -> TideResult<()>
    where
        F: FnMut(&mut Index) -> TideResult<()>,
    {
        let backup = self.indexes.clone();
        let names: Vec<String> = self.indexes.keys().cloned().collect();
        for name in names {
            if let Some(index) = self.indexes.get_mut(&name) {
                if let Err(e) = op(index) {
                    self.indexes = backup;
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}
