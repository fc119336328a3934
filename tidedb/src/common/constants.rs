// doc constants
pub const DOC_ID: &str = "_id";
pub const FIELD_SEPARATOR: &str = ".";
pub const ID_LENGTH: usize = 16;

// timestamp fields
pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_AT: &str = "updatedAt";

// log record tags
pub const TYPE_TAG: &str = "$$type";
pub const TYPE_VALUE: &str = "value";
pub const TYPE_DATE: &str = "date";
pub const TYPE_REGEX: &str = "regex";
pub const TYPE_UNDEFINED: &str = "undefined";
pub const DELETED_TAG: &str = "$$deleted";
pub const INDEX_CREATED_TAG: &str = "$$indexCreated";
pub const INDEX_REMOVED_TAG: &str = "$$indexRemoved";

// datafile constants
pub const TEMP_FILE_SUFFIX: &str = "~";
pub const DEFAULT_CORRUPT_ALERT_THRESHOLD: f64 = 0.1;

// compaction constants
pub const MIN_AUTOCOMPACTION_INTERVAL_MS: u64 = 5000;

// index constants
pub const COMPOUND_FIELD_SEPARATOR: &str = ",";

// worker thread
pub const EXECUTOR_THREAD_NAME: &str = "tidedb-executor";
