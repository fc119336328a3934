use crate::collection::Document;

/// Outcome of [`crate::Datastore::update`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateResult {
    num_affected: usize,
    upsert: bool,
    affected_documents: Vec<Document>,
}

impl UpdateResult {
    pub fn new(num_affected: usize, upsert: bool, affected_documents: Vec<Document>) -> Self {
        Self {
            num_affected,
            upsert,
            affected_documents,
        }
    }

    /// Number of documents updated or inserted.
    pub fn num_affected(&self) -> usize {
        self.num_affected
    }

    /// Whether the update inserted a new document.
    pub fn is_upsert(&self) -> bool {
        self.upsert
    }

    /// The new state of the affected documents.
    ///
    /// Filled in when `return_updated_docs` is set, and always for an upsert.
    pub fn affected_documents(&self) -> &[Document] {
        &self.affected_documents
    }
}

impl IntoIterator for UpdateResult {
    type Item = Document;
    type IntoIter = std::vec::IntoIter<Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.affected_documents.into_iter()
    }
}
