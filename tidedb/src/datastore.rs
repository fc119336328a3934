use crate::collection::operation::{self, WriteOperations};
use crate::collection::snapshot::Snapshot;
use crate::collection::{Cursor, Document, RemoveOptions, UpdateOptions, UpdateResult};
use crate::common::util::Scheduler;
use crate::common::{Executor, MIN_AUTOCOMPACTION_INTERVAL_MS};
use crate::datastore_builder::DatastoreBuilder;
use crate::datastore_config::{DatastoreConfig, LoadPolicy, OnloadCallback};
use crate::errors::{ErrorKind, TideError, TideResult};
use crate::index::IndexOptions;
use crate::store::{Datafile, LogRecord};
use crossbeam_channel::Receiver;
use parking_lot::{Mutex, RwLock};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Where a datastore is in its load cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadState {
    /// Persistent datastore whose datafile was not loaded yet.
    Unloaded,
    Loading,
    Ready,
}

impl LoadState {
    fn from_u8(value: u8) -> LoadState {
        match value {
            0 => LoadState::Unloaded,
            1 => LoadState::Loading,
            _ => LoadState::Ready,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            LoadState::Unloaded => 0,
            LoadState::Loading => 1,
            LoadState::Ready => 2,
        }
    }
}

/// An embedded document datastore.
///
/// Documents are kept in memory and persisted to an append-only datafile,
/// one JSON document per line. Every mutation (insert, update, remove, index
/// changes, load and compaction) runs on a single worker thread in the order
/// it was issued; the call blocks until its task is done and returns its
/// result. A mutation computes the new state on a copy of the current
/// snapshot, appends its records to the datafile and only then publishes the
/// new snapshot, so a failure leaves the visible state untouched.
///
/// Reads run on the calling thread against the current snapshot.
///
/// `Datastore` is a cheap handle: clones share the same data.
///
/// # Examples
///
/// ```rust
/// use tidedb::{doc, Datastore};
///
/// let db = Datastore::builder().open().unwrap();
/// db.insert(doc! { _id: 1, name: "John", age: 20 }).unwrap();
/// db.insert(doc! { _id: 2, name: "Mary", age: 25 }).unwrap();
///
/// let names = db
///     .find_cursor(doc! { age: { "$gt": 18 } })
///     .sort(doc! { age: (-1) })
///     .projection(doc! { _id: 0, name: 1 })
///     .exec()
///     .unwrap();
/// assert_eq!(names, vec![doc! { name: "Mary" }, doc! { name: "John" }]);
/// ```
#[derive(Clone)]
pub struct Datastore {
    inner: Arc<DatastoreInner>,
}

impl Datastore {
    pub fn builder() -> DatastoreBuilder {
        DatastoreBuilder::new()
    }

    pub(crate) fn new(config: DatastoreConfig) -> TideResult<Datastore> {
        config.initialize();
        Ok(Datastore {
            inner: Arc::new(DatastoreInner::new(config)?),
        })
    }

    pub fn config(&self) -> &DatastoreConfig {
        &self.inner.config
    }

    /// Path of the datafile, `None` for an in-memory datastore.
    pub fn filename(&self) -> Option<PathBuf> {
        self.inner.config.filename()
    }

    pub fn load_state(&self) -> LoadState {
        self.inner.load_state()
    }

    /// Replaces the in-memory state with the content of the datafile.
    ///
    /// Indexes are rebuilt from the loaded documents, then the datafile is
    /// compacted. If anything fails the previous state is kept.
    pub fn load_database(&self) -> TideResult<()> {
        let reply = self.start_load(None)?;
        wait_for(reply)
    }

    /// Starts a load in the background. `onload` is called on the worker
    /// thread once the load is done, before any queued call runs.
    pub(crate) fn start_load(
        &self,
        onload: Option<OnloadCallback>,
    ) -> TideResult<Receiver<TideResult<()>>> {
        self.inner.check_ready()?;
        self.inner.begin_load();
        let inner = self.inner.clone();
        let reply = self.inner.executor.execute(move || {
            let result = inner.load();
            match &onload {
                Some(callback) => callback(result.as_ref().err()),
                None => {
                    if let Err(e) = &result {
                        log::error!("Failed to load the datastore: {}", e);
                    }
                }
            }
            result
        });

        if reply.is_err() {
            self.inner.finish_load();
        }
        reply
    }

    /// Inserts a document and returns it as stored, with its `_id`.
    ///
    /// # Errors
    ///
    /// * [`ErrorKind::ValidationError`] for field names starting with `$` or
    ///   containing `.`, or an invalid `_id`.
    /// * [`ErrorKind::UniqueConstraintViolation`] if the `_id` or a unique
    ///   index value is taken.
    pub fn insert(&self, document: Document) -> TideResult<Document> {
        let mut inserted = self.insert_many(vec![document])?;
        inserted.pop().ok_or_else(|| {
            log::error!("Insert returned no document");
            TideError::new("Insert returned no document", ErrorKind::InternalError)
        })
    }

    /// Inserts all documents or none of them.
    pub fn insert_many(&self, documents: Vec<Document>) -> TideResult<Vec<Document>> {
        self.write(move |inner, snapshot| inner.write_operations.insert_many(snapshot, documents))
    }

    /// Updates the documents matching `query`.
    ///
    /// `update` is either a replacement document, which keeps the `_id` of
    /// the document it replaces, or a modifier document made of `$set`,
    /// `$unset`, `$inc`, `$push`, `$addToSet`, `$pop`, `$pull`, `$min` and
    /// `$max`.
    pub fn update(
        &self,
        query: Document,
        update: Document,
        options: UpdateOptions,
    ) -> TideResult<UpdateResult> {
        self.write(move |inner, snapshot| {
            inner
                .write_operations
                .update(snapshot, &query, &update, &options)
        })
    }

    /// Removes the first document matching `query`, or all of them with
    /// [`crate::collection::remove_all`]. Returns the number removed.
    pub fn remove(&self, query: Document, options: RemoveOptions) -> TideResult<usize> {
        self.write(move |inner, snapshot| inner.write_operations.remove(snapshot, &query, &options))
    }

    /// Creates an index unless one exists on the same field.
    pub fn ensure_index(&self, options: IndexOptions) -> TideResult<()> {
        self.write(move |_, snapshot| {
            let record = operation::ensure_index(snapshot, options)?;
            Ok(((), record.into_iter().collect()))
        })
    }

    pub fn remove_index(&self, field_name: &str) -> TideResult<()> {
        let field_name = field_name.to_string();
        self.write(move |_, snapshot| {
            let record = operation::remove_index(snapshot, &field_name)?;
            Ok(((), vec![record]))
        })
    }

    /// Field names of the indexes, `_id` included.
    pub fn index_names(&self) -> Vec<String> {
        self.inner
            .current()
            .indexes()
            .iter()
            .map(|index| index.field_name().to_string())
            .collect()
    }

    pub fn find(&self, query: &Document, projection: Option<&Document>) -> TideResult<Vec<Document>> {
        let mut cursor = self.find_cursor(query.clone());
        if let Some(projection) = projection {
            cursor = cursor.projection(projection.clone());
        }
        cursor.exec()
    }

    pub fn find_one(
        &self,
        query: &Document,
        projection: Option<&Document>,
    ) -> TideResult<Option<Document>> {
        let mut cursor = self.find_one_cursor(query.clone());
        if let Some(projection) = projection {
            cursor = cursor.projection(projection.clone());
        }
        cursor.exec()
    }

    pub fn count(&self, query: &Document) -> TideResult<usize> {
        self.count_cursor(query.clone()).exec()
    }

    pub fn find_cursor(&self, query: Document) -> Cursor<Vec<Document>> {
        Cursor::new(self.clone(), query)
    }

    pub fn find_one_cursor(&self, query: Document) -> Cursor<Option<Document>> {
        Cursor::new(self.clone(), query)
    }

    pub fn count_cursor(&self, query: Document) -> Cursor<usize> {
        Cursor::new(self.clone(), query)
    }

    /// Every live document, in insertion order.
    pub fn get_all_data(&self) -> TideResult<Vec<Document>> {
        self.read(|snapshot| Ok(snapshot.documents().cloned().collect()))
    }

    /// Rewrites the datafile with only the live documents and the index
    /// definitions.
    pub fn compact_datafile(&self) -> TideResult<()> {
        self.inner.check_ready()?;
        let inner = self.inner.clone();
        self.inner.executor.submit(move || inner.compact())
    }

    /// Compacts the datafile periodically, every `interval` but at most
    /// once every 5 seconds. Replaces a previously set interval.
    pub fn set_autocompaction_interval(&self, interval: Duration) {
        let interval = interval.max(Duration::from_millis(MIN_AUTOCOMPACTION_INTERVAL_MS));
        self.inner.scheduler.stop();

        let datastore: Weak<DatastoreInner> = Arc::downgrade(&self.inner);
        self.inner.scheduler.schedule(interval, move || {
            if let Some(inner) = datastore.upgrade() {
                let datastore = Datastore { inner };
                if let Err(e) = datastore.compact_datafile() {
                    log::warn!("Automatic compaction failed: {}", e);
                }
            }
        });
        log::debug!("Autocompaction scheduled every {:?}", interval);
    }

    pub fn stop_autocompaction(&self) {
        self.inner.scheduler.stop();
    }

    pub fn is_autocompaction_running(&self) -> bool {
        self.inner.scheduler.is_running()
    }

    /// Runs a mutation on the worker thread.
    fn write<T, F>(&self, op: F) -> TideResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&DatastoreInner, &mut Snapshot) -> TideResult<(T, Vec<LogRecord>)>
            + Send
            + 'static,
    {
        self.inner.check_ready()?;
        let inner = self.inner.clone();
        self.inner.executor.submit(move || inner.commit(op))
    }

    /// Runs a read against the current snapshot. While a load is in progress
    /// the read either waits for it or fails, depending on the load policy.
    pub(crate) fn read<T, F>(&self, op: F) -> TideResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Snapshot) -> TideResult<T> + Send + 'static,
    {
        if self.inner.is_loading_elsewhere() {
            self.inner.check_ready()?;
            let inner = self.inner.clone();
            return self.inner.executor.submit(move || op(&inner.current()));
        }
        op(&self.inner.current())
    }
}

struct DatastoreInner {
    config: DatastoreConfig,
    snapshot: RwLock<Arc<Snapshot>>,
    datafile: Datafile,
    executor: Executor,
    state: AtomicU8,
    // set once a load succeeded, decides where a failed load falls back to
    loaded: AtomicBool,
    pending_loads: Mutex<usize>,
    write_operations: WriteOperations,
    scheduler: Scheduler,
}

impl DatastoreInner {
    fn new(config: DatastoreConfig) -> TideResult<DatastoreInner> {
        let datafile = Datafile::new(config.filename(), config.corrupt_alert_threshold());
        let state = if datafile.is_in_memory() {
            LoadState::Ready
        } else {
            LoadState::Unloaded
        };
        let write_operations =
            WriteOperations::new(config.processor_chain(), config.timestamp_data());

        Ok(DatastoreInner {
            config,
            snapshot: RwLock::new(Arc::new(Snapshot::new())),
            datafile,
            executor: Executor::new()?,
            state: AtomicU8::new(state.as_u8()),
            loaded: AtomicBool::new(state == LoadState::Ready),
            pending_loads: Mutex::new(0),
            write_operations,
            scheduler: Scheduler::new(),
        })
    }

    fn current(&self) -> Arc<Snapshot> {
        self.snapshot.read().clone()
    }

    fn publish(&self, snapshot: Snapshot) {
        *self.snapshot.write() = Arc::new(snapshot);
    }

    fn load_state(&self) -> LoadState {
        LoadState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn set_load_state(&self, state: LoadState) {
        self.state.store(state.as_u8(), Ordering::SeqCst);
    }

    /// State a datastore returns to when no load is running.
    fn settled_state(&self) -> LoadState {
        if self.loaded.load(Ordering::SeqCst) {
            LoadState::Ready
        } else {
            LoadState::Unloaded
        }
    }

    fn is_loading_elsewhere(&self) -> bool {
        self.load_state() == LoadState::Loading && !self.executor.on_worker()
    }

    fn check_ready(&self) -> TideResult<()> {
        if self.config.load_policy() == LoadPolicy::Fail && self.is_loading_elsewhere() {
            log::error!("Datastore is loading");
            return Err(TideError::new("Datastore is loading", ErrorKind::NotReady));
        }
        Ok(())
    }

    fn commit<T, F>(&self, op: F) -> TideResult<T>
    where
        F: FnOnce(&DatastoreInner, &mut Snapshot) -> TideResult<(T, Vec<LogRecord>)>,
    {
        let mut scratch = Snapshot::clone(&self.current());
        let (result, records) = op(self, &mut scratch)?;
        self.datafile.append(&records)?;
        self.publish(scratch);
        Ok(result)
    }

    fn load(&self) -> TideResult<()> {
        let result = self.load_snapshot().map(|snapshot| {
            self.publish(snapshot);
            self.loaded.store(true, Ordering::SeqCst);
            log::debug!("Datastore loaded from {:?}", self.datafile.path());
        });
        self.finish_load();
        result
    }

    fn begin_load(&self) {
        let mut pending = self.pending_loads.lock();
        *pending += 1;
        self.set_load_state(LoadState::Loading);
    }

    /// Leaves the `Loading` state once no other load is waiting.
    fn finish_load(&self) {
        let mut pending = self.pending_loads.lock();
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.set_load_state(self.settled_state());
        }
    }

    fn load_snapshot(&self) -> TideResult<Snapshot> {
        let loaded = self.datafile.load()?;

        // indexes created before the load are rebuilt as well
        let mut definitions = self.current().indexes().definitions();
        for options in loaded.indexes {
            definitions.retain(|existing| existing.field_name() != options.field_name());
            definitions.push(options);
        }

        let documents = self.config.processor_chain().after_load(loaded.documents)?;
        let snapshot = Snapshot::build(documents, definitions)?;
        self.compact_snapshot(&snapshot)?;
        Ok(snapshot)
    }

    fn compact(&self) -> TideResult<()> {
        self.compact_snapshot(&self.current())
    }

    fn compact_snapshot(&self, snapshot: &Snapshot) -> TideResult<()> {
        let documents: Vec<Document> = snapshot.documents().cloned().collect();
        self.datafile
            .compact(&snapshot.indexes().definitions(), &documents)
    }
}

fn wait_for<T>(reply: Receiver<TideResult<T>>) -> TideResult<T> {
    reply.recv().map_err(|_| {
        log::error!("Executor dropped the task before completion");
        TideError::new(
            "Executor dropped the task before completion",
            ErrorKind::InternalError,
        )
    })?
}

pub(crate) fn wait_for_load(reply: Receiver<TideResult<()>>) -> TideResult<()> {
    wait_for(reply)
}
