/// Options of [`crate::Datastore::update`].
///
/// By default only the first matching document is updated, nothing is
/// inserted when no document matches, and the updated documents are not
/// returned.
#[derive(Clone, Debug, Default)]
pub struct UpdateOptions {
    multi: bool,
    upsert: bool,
    return_updated_docs: bool,
}

impl UpdateOptions {
    pub fn new(multi: bool, upsert: bool, return_updated_docs: bool) -> Self {
        Self {
            multi,
            upsert,
            return_updated_docs,
        }
    }

    pub fn with_multi(mut self, multi: bool) -> Self {
        self.multi = multi;
        self
    }

    pub fn with_upsert(mut self, upsert: bool) -> Self {
        self.upsert = upsert;
        self
    }

    pub fn with_return_updated_docs(mut self, return_updated_docs: bool) -> Self {
        self.return_updated_docs = return_updated_docs;
        self
    }

    pub fn is_multi(&self) -> bool {
        self.multi
    }

    pub fn is_upsert(&self) -> bool {
        self.upsert
    }

    pub fn is_return_updated_docs(&self) -> bool {
        self.return_updated_docs
    }
}

/// Update every matching document.
pub fn multi() -> UpdateOptions {
    UpdateOptions::new(true, false, false)
}

/// Insert a new document when nothing matches.
pub fn upsert() -> UpdateOptions {
    UpdateOptions::new(false, true, false)
}

/// Options of [`crate::Datastore::remove`]; by default only the first match is
/// removed.
#[derive(Clone, Debug, Default)]
pub struct RemoveOptions {
    multi: bool,
}

impl RemoveOptions {
    pub fn new(multi: bool) -> Self {
        Self { multi }
    }

    pub fn is_multi(&self) -> bool {
        self.multi
    }
}

/// Remove every matching document.
pub fn remove_all() -> RemoveOptions {
    RemoveOptions::new(true)
}
