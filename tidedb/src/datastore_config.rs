use crate::common::{Processor, ProcessorChain, DEFAULT_CORRUPT_ALERT_THRESHOLD};
use crate::errors::{ErrorKind, TideError, TideResult};
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Callback invoked when an automatic load finishes, with the load error if
/// there was one.
pub type OnloadCallback = Arc<dyn Fn(Option<&TideError>) + Send + Sync>;

/// What calls issued while the datafile is being loaded do.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadPolicy {
    /// Wait for the load to finish, then run.
    #[default]
    Queue,
    /// Fail immediately with [`ErrorKind::NotReady`].
    Fail,
}

/// Configuration of a [`crate::Datastore`].
///
/// The configuration is shared: cloning it yields a handle to the same
/// settings. Settings are frozen once the datastore built from it is
/// initialized, after which every setter fails with
/// [`ErrorKind::InvalidOperation`].
#[derive(Clone)]
pub struct DatastoreConfig {
    inner: Arc<DatastoreConfigInner>,
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        DatastoreConfig::new()
    }
}

impl DatastoreConfig {
    /// An in-memory configuration without autoload.
    pub fn new() -> Self {
        DatastoreConfig {
            inner: Arc::new(DatastoreConfigInner::new()),
        }
    }

    /// Path of the datafile, `None` for an in-memory datastore.
    pub fn filename(&self) -> Option<PathBuf> {
        if self.in_memory_only() {
            None
        } else {
            self.inner.filename.read().clone()
        }
    }

    pub fn set_filename(&self, filename: impl Into<PathBuf>) -> TideResult<()> {
        self.inner.set_filename(filename.into())
    }

    /// True without a datafile, or when persistence was turned off explicitly.
    pub fn in_memory_only(&self) -> bool {
        self.inner.in_memory_only.load(Ordering::Relaxed) || self.inner.filename.read().is_none()
    }

    pub fn set_in_memory_only(&self, in_memory_only: bool) -> TideResult<()> {
        self.inner.check_not_configured("in_memory_only")?;
        self.inner.in_memory_only.store(in_memory_only, Ordering::Relaxed);
        Ok(())
    }

    pub fn autoload(&self) -> bool {
        self.inner.autoload.load(Ordering::Relaxed)
    }

    pub fn set_autoload(&self, autoload: bool) -> TideResult<()> {
        self.inner.check_not_configured("autoload")?;
        self.inner.autoload.store(autoload, Ordering::Relaxed);
        Ok(())
    }

    pub fn onload(&self) -> Option<OnloadCallback> {
        self.inner.onload.read().clone()
    }

    pub fn set_onload(&self, onload: OnloadCallback) -> TideResult<()> {
        self.inner.check_not_configured("onload")?;
        *self.inner.onload.write() = Some(onload);
        Ok(())
    }

    /// Whether `createdAt` and `updatedAt` are maintained automatically.
    pub fn timestamp_data(&self) -> bool {
        self.inner.timestamp_data.load(Ordering::Relaxed)
    }

    pub fn set_timestamp_data(&self, timestamp_data: bool) -> TideResult<()> {
        self.inner.check_not_configured("timestamp_data")?;
        self.inner.timestamp_data.store(timestamp_data, Ordering::Relaxed);
        Ok(())
    }

    /// Largest tolerated fraction of corrupt lines in the datafile.
    pub fn corrupt_alert_threshold(&self) -> f64 {
        *self.inner.corrupt_alert_threshold.read()
    }

    pub fn set_corrupt_alert_threshold(&self, threshold: f64) -> TideResult<()> {
        self.inner.set_corrupt_alert_threshold(threshold)
    }

    pub fn load_policy(&self) -> LoadPolicy {
        *self.inner.load_policy.read()
    }

    pub fn set_load_policy(&self, load_policy: LoadPolicy) -> TideResult<()> {
        self.inner.check_not_configured("load_policy")?;
        *self.inner.load_policy.write() = load_policy;
        Ok(())
    }

    pub fn processor_chain(&self) -> ProcessorChain {
        self.inner.processor_chain.clone()
    }

    pub fn add_processor(&self, processor: Processor) -> TideResult<()> {
        self.inner.check_not_configured("processors")?;
        self.inner.processor_chain.add_processor(processor);
        Ok(())
    }

    pub(crate) fn initialize(&self) {
        self.inner.configured.store(true, Ordering::Relaxed);
    }
}

struct DatastoreConfigInner {
    configured: AtomicBool,
    filename: RwLock<Option<PathBuf>>,
    in_memory_only: AtomicBool,
    autoload: AtomicBool,
    onload: RwLock<Option<OnloadCallback>>,
    timestamp_data: AtomicBool,
    corrupt_alert_threshold: RwLock<f64>,
    load_policy: RwLock<LoadPolicy>,
    processor_chain: ProcessorChain,
}

impl DatastoreConfigInner {
    fn new() -> Self {
        DatastoreConfigInner {
            configured: AtomicBool::from(false),
            filename: RwLock::new(None),
            in_memory_only: AtomicBool::from(false),
            autoload: AtomicBool::from(false),
            onload: RwLock::new(None),
            timestamp_data: AtomicBool::from(false),
            corrupt_alert_threshold: RwLock::new(DEFAULT_CORRUPT_ALERT_THRESHOLD),
            load_policy: RwLock::new(LoadPolicy::default()),
            processor_chain: ProcessorChain::new(),
        }
    }

    fn check_not_configured(&self, setting: &str) -> TideResult<()> {
        if self.configured.load(Ordering::Relaxed) {
            log::error!("{} cannot be changed after initialization", setting);
            return Err(TideError::new(
                &format!("{} cannot be changed after initialization", setting),
                ErrorKind::InvalidOperation,
            ));
        }
        Ok(())
    }

    fn set_filename(&self, filename: PathBuf) -> TideResult<()> {
        self.check_not_configured("filename")?;
        if filename.as_os_str().is_empty() {
            log::error!("Datafile name cannot be empty");
            return Err(TideError::new(
                "Datafile name cannot be empty",
                ErrorKind::ValidationError,
            ));
        }

        if filename.to_string_lossy().ends_with(std::path::MAIN_SEPARATOR) {
            log::error!("Datafile name can't end with a path separator: {:?}", filename);
            return Err(TideError::new(
                &format!("Datafile name can't end with a path separator: {:?}", filename),
                ErrorKind::ValidationError,
            ));
        }

        *self.filename.write() = Some(filename);
        Ok(())
    }

    fn set_corrupt_alert_threshold(&self, threshold: f64) -> TideResult<()> {
        self.check_not_configured("corrupt_alert_threshold")?;
        if !(0.0..=1.0).contains(&threshold) {
            log::error!("Corrupt alert threshold must be between 0 and 1, got {}", threshold);
            return Err(TideError::new(
                &format!("Corrupt alert threshold must be between 0 and 1, got {}", threshold),
                ErrorKind::ValidationError,
            ));
        }
        *self.corrupt_alert_threshold.write() = threshold;
        Ok(())
    }
}
