use crate::collection::operation;
use crate::collection::{Document, FindOptions};
use crate::errors::TideResult;
use crate::Datastore;
use std::marker::PhantomData;

/// A lazy query.
///
/// The query is fixed when the cursor is created by
/// [`Datastore::find_cursor`], [`Datastore::find_one_cursor`] or
/// [`Datastore::count_cursor`]. `projection`, `sort`, `skip` and `limit` only
/// record options; nothing runs until [`Cursor::exec`], which applies match,
/// sort, skip, limit and projection in that order. Every call to `exec` runs
/// the query again against the current state of the datastore.
///
/// ```rust
/// use tidedb::{doc, Datastore};
///
/// let db = Datastore::builder().open().unwrap();
/// db.insert_many(vec![
///     doc! { _id: 1, name: "John", age: 20 },
///     doc! { _id: 2, name: "Mary", age: 25 },
/// ]).unwrap();
///
/// let cursor = db.count_cursor(doc! { age: { "$gt": 10 } });
/// assert_eq!(cursor.exec().unwrap(), 2);
/// assert_eq!(cursor.limit(1).exec().unwrap(), 1);
/// ```
pub struct Cursor<T> {
    datastore: Datastore,
    query: Document,
    options: FindOptions,
    _phantom: PhantomData<T>,
}

impl<T> Clone for Cursor<T> {
    fn clone(&self) -> Self {
        Cursor {
            datastore: self.datastore.clone(),
            query: self.query.clone(),
            options: self.options.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<T> Cursor<T> {
    pub(crate) fn new(datastore: Datastore, query: Document) -> Self {
        Cursor {
            datastore,
            query,
            options: FindOptions::new(),
            _phantom: PhantomData,
        }
    }

    /// Keeps (`{field: 1}`) or omits (`{field: 0}`) fields of the results.
    pub fn projection(mut self, projection: Document) -> Self {
        self.options = self.options.projection(projection);
        self
    }

    /// Sorts by each field in turn, `1` ascending and `-1` descending.
    pub fn sort(mut self, sort: Document) -> Self {
        self.options = self.options.sort(sort);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.options = self.options.skip(skip);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.options = self.options.limit(limit);
        self
    }

    pub fn query(&self) -> &Document {
        &self.query
    }
}

impl Cursor<Vec<Document>> {
    pub fn exec(&self) -> TideResult<Vec<Document>> {
        let query = self.query.clone();
        let options = self.options.clone();
        self.datastore
            .read(move |snapshot| operation::find(snapshot, &query, &options))
    }
}

impl Cursor<Option<Document>> {
    pub fn exec(&self) -> TideResult<Option<Document>> {
        let query = self.query.clone();
        let options = self.options.clone();
        self.datastore
            .read(move |snapshot| operation::find_one(snapshot, &query, &options))
    }
}

impl Cursor<usize> {
    pub fn exec(&self) -> TideResult<usize> {
        let query = self.query.clone();
        let options = self.options.clone();
        self.datastore
            .read(move |snapshot| operation::count(snapshot, &query, &options))
    }
}
