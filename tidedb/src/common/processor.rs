use crate::collection::Document;
use crate::errors::TideResult;
use parking_lot::RwLock;
use std::sync::Arc;

/// Contract for implementing document processors.
///
/// Processors intercept documents at fixed points of the datastore lifecycle
/// and may validate, enrich or rewrite them. Returning an error aborts the
/// operation that triggered the hook and leaves the datastore unchanged.
///
/// Every hook has a pass-through default, so an implementation only overrides
/// the points it cares about.
///
/// # Hooks
/// - `before_insert()`: called on every document given to an insert, before
///   the `_id` is assigned and the document is validated
/// - `before_update()`: called on every document produced by an update, before
///   it is validated and indexed
/// - `after_load()`: called once with the whole document set replayed from
///   the datafile, before indexes are rebuilt
///
/// # Thread Safety
/// Implementations must be `Send + Sync` since hooks run on the executor thread.
pub trait ProcessorProvider: Send + Sync {
    /// Returns the unique name of this processor.
    fn name(&self) -> String;

    fn before_insert(&self, doc: Document) -> TideResult<Document> {
        Ok(doc)
    }

    fn before_update(&self, doc: Document) -> TideResult<Document> {
        Ok(doc)
    }

    fn after_load(&self, docs: Vec<Document>) -> TideResult<Vec<Document>> {
        Ok(docs)
    }
}

/// Wraps a document processor implementation.
///
/// # Example
/// A processor that tags every inserted document:
/// ```rust
/// use tidedb::collection::Document;
/// use tidedb::common::{Processor, ProcessorProvider};
/// use tidedb::errors::TideResult;
///
/// struct Tagger;
///
/// impl ProcessorProvider for Tagger {
///     fn name(&self) -> String {
///         "Tagger".to_string()
///     }
///
///     fn before_insert(&self, mut doc: Document) -> TideResult<Document> {
///         doc.put("key", "value")?;
///         Ok(doc)
///     }
/// }
///
/// let processor = Processor::new(Tagger);
/// assert_eq!(processor.name(), "Tagger");
/// ```
#[derive(Clone)]
pub struct Processor {
    inner: Arc<dyn ProcessorProvider>,
}

impl Processor {
    pub fn new<T: ProcessorProvider + 'static>(inner: T) -> Self {
        Processor {
            inner: Arc::new(inner),
        }
    }

    pub fn name(&self) -> String {
        self.inner.name()
    }

    pub fn before_insert(&self, doc: Document) -> TideResult<Document> {
        self.inner.before_insert(doc)
    }

    pub fn before_update(&self, doc: Document) -> TideResult<Document> {
        self.inner.before_update(doc)
    }

    pub fn after_load(&self, docs: Vec<Document>) -> TideResult<Vec<Document>> {
        self.inner.after_load(docs)
    }
}

/// An ordered chain of processors.
///
/// Processors run in registration order; registering a processor under a name
/// already in the chain replaces the earlier one in place.
#[derive(Clone, Default)]
pub struct ProcessorChain {
    inner: Arc<ProcessorChainInner>,
}

impl ProcessorChain {
    pub fn new() -> Self {
        ProcessorChain {
            inner: Arc::new(ProcessorChainInner::default()),
        }
    }

    pub fn add_processor(&self, processor: Processor) {
        self.inner.add_processor(processor);
    }

    pub fn remove_processor(&self, processor_name: &str) {
        self.inner.remove_processor(processor_name);
    }

    pub fn is_empty(&self) -> bool {
        self.inner.processors.read().is_empty()
    }

    pub fn before_insert(&self, doc: Document) -> TideResult<Document> {
        self.inner.before_insert(doc)
    }

    pub fn before_update(&self, doc: Document) -> TideResult<Document> {
        self.inner.before_update(doc)
    }

    pub fn after_load(&self, docs: Vec<Document>) -> TideResult<Vec<Document>> {
        self.inner.after_load(docs)
    }
}

impl ProcessorProvider for ProcessorChain {
    fn name(&self) -> String {
        "ProcessorChain".to_string()
    }

    fn before_insert(&self, doc: Document) -> TideResult<Document> {
        self.inner.before_insert(doc)
    }

    fn before_update(&self, doc: Document) -> TideResult<Document> {
        self.inner.before_update(doc)
    }

    fn after_load(&self, docs: Vec<Document>) -> TideResult<Vec<Document>> {
        self.inner.after_load(docs)
    }
}

#[derive(Default)]
struct ProcessorChainInner {
    processors: RwLock<Vec<Processor>>,
}

impl ProcessorChainInner {
    fn add_processor(&self, processor: Processor) {
        let mut processors = self.processors.write();
        let name = processor.name();
        match processors.iter().position(|p| p.name() == name) {
            Some(pos) => processors[pos] = processor,
            None => processors.push(processor),
        }
    }

    fn remove_processor(&self, processor_name: &str) {
        self.processors
            .write()
            .retain(|p| p.name() != processor_name);
    }

    // hooks run on a snapshot of the chain so a processor can't deadlock it
    fn snapshot(&self) -> Vec<Processor> {
        self.processors.read().clone()
    }

    #[inline]
    fn before_insert(&self, doc: Document) -> TideResult<Document> {
        let mut processed_doc = doc;
        for processor in self.snapshot() {
            processed_doc = processor.before_insert(processed_doc)?;
        }
        Ok(processed_doc)
    }

    #[inline]
    fn before_update(&self, doc: Document) -> TideResult<Document> {
        let mut processed_doc = doc;
        for processor in self.snapshot() {
            processed_doc = processor.before_update(processed_doc)?;
        }
        Ok(processed_doc)
    }

    #[inline]
    fn after_load(&self, docs: Vec<Document>) -> TideResult<Vec<Document>> {
        let mut processed_docs = docs;
        for processor in self.snapshot() {
            processed_docs = processor.after_load(processed_docs)?;
        }
        Ok(processed_docs)
    }
}
