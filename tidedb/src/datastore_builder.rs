use crate::common::{Processor, ProcessorProvider};
use crate::datastore::{wait_for_load, Datastore};
use crate::datastore_config::{DatastoreConfig, LoadPolicy};
use crate::errors::{TideError, TideResult};
use std::path::PathBuf;
use std::sync::Arc;

/// Builder for a [Datastore].
///
/// Errors raised by a setter are kept and returned by [DatastoreBuilder::build]
/// or [DatastoreBuilder::open]; setters called after the first error are
/// ignored.
///
/// ```rust
/// use tidedb::Datastore;
///
/// let db = Datastore::builder()
///     .timestamp_data(true)
///     .open()
///     .unwrap();
/// assert!(db.filename().is_none());
/// ```
#[derive(Default)]
pub struct DatastoreBuilder {
    error: Option<TideError>,
    config: DatastoreConfig,
}

impl DatastoreBuilder {
    /// Starts from an in-memory configuration without autoload.
    pub fn new() -> Self {
        DatastoreBuilder {
            error: None,
            config: DatastoreConfig::new(),
        }
    }

    /// Persists the datastore to `filename`.
    pub fn filename(self, filename: impl Into<PathBuf>) -> Self {
        let filename = filename.into();
        self.apply(|config| config.set_filename(filename))
    }

    /// Keeps everything in memory even when a filename is set.
    pub fn in_memory_only(self, in_memory_only: bool) -> Self {
        self.apply(|config| config.set_in_memory_only(in_memory_only))
    }

    /// Loads the datafile as soon as the datastore is built.
    pub fn autoload(self, autoload: bool) -> Self {
        self.apply(|config| config.set_autoload(autoload))
    }

    /// Called with the load error, if any, when the automatic load finishes.
    ///
    /// The callback runs on the worker thread before any call queued behind
    /// the load; calls it makes on the datastore run inline.
    pub fn onload<F>(self, onload: F) -> Self
    where
        F: Fn(Option<&TideError>) + Send + Sync + 'static,
    {
        self.apply(|config| config.set_onload(Arc::new(onload)))
    }

    /// Maintains `createdAt` and `updatedAt` on every document.
    pub fn timestamp_data(self, timestamp_data: bool) -> Self {
        self.apply(|config| config.set_timestamp_data(timestamp_data))
    }

    /// Fraction of corrupt datafile lines above which a load fails.
    pub fn corrupt_alert_threshold(self, threshold: f64) -> Self {
        self.apply(|config| config.set_corrupt_alert_threshold(threshold))
    }

    pub fn load_policy(self, load_policy: LoadPolicy) -> Self {
        self.apply(|config| config.set_load_policy(load_policy))
    }

    /// Registers a processor; processors run in registration order.
    pub fn add_processor<T: ProcessorProvider + 'static>(self, processor: T) -> Self {
        self.apply(|config| config.add_processor(Processor::new(processor)))
    }

    /// Builds the datastore.
    ///
    /// With autoload the datafile is loaded in the background and the
    /// `onload` callback is invoked when done. A failed load without an
    /// `onload` callback is logged.
    pub fn build(self) -> TideResult<Datastore> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let autoload = self.config.autoload();
        let onload = self.config.onload();
        let datastore = Datastore::new(self.config)?;
        if autoload {
            // the load reports through onload
            let _ = datastore.start_load(onload)?;
        }
        Ok(datastore)
    }

    /// Builds the datastore and, with autoload, waits for the load to finish.
    ///
    /// # Errors
    ///
    /// Returns the error of the automatic load, if any.
    pub fn open(self) -> TideResult<Datastore> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let autoload = self.config.autoload();
        let onload = self.config.onload();
        let datastore = Datastore::new(self.config)?;
        if autoload {
            let reply = datastore.start_load(onload)?;
            wait_for_load(reply)?;
        }
        Ok(datastore)
    }

    fn apply<F>(mut self, setter: F) -> Self
    where
        F: FnOnce(&DatastoreConfig) -> TideResult<()>,
    {
        if self.error.is_none() {
            if let Err(e) = setter(&self.config) {
                self.error = Some(e);
            }
        }
        self
    }
}
