use backtrace::Backtrace;
use parking_lot::RwLock;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;
use std::sync::Arc;

/// Error kinds for tidedb operations.
///
/// Every failure surfaced by a [`crate::Datastore`] carries one of these kinds so
/// callers can tell a rejected query from a constraint violation or a disk error.
///
/// # Examples
///
/// ```rust
/// use tidedb::errors::{ErrorKind, TideError, TideResult};
///
/// fn example() -> TideResult<()> {
///     Err(TideError::new("Unknown operator $foo", ErrorKind::InvalidQuery))
/// }
/// assert_eq!(example().unwrap_err().kind(), &ErrorKind::InvalidQuery);
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    /// A datafile line could not be decoded
    CorruptRecord,
    /// A unique index already maps the value to another document
    UniqueConstraintViolation,
    /// The query, projection or sort document is malformed
    InvalidQuery,
    /// A document breaks the field naming or `_id` rules
    ValidationError,
    /// Generic IO error
    IOError,
    /// The file was not found
    FileNotFound,
    /// Permission denied for file operation
    PermissionDenied,
    /// Error encoding or decoding a value
    EncodingError,
    /// The operation is not valid in the current context
    InvalidOperation,
    /// The datastore is still loading and the load policy rejects the call
    NotReady,
    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::CorruptRecord => write!(f, "Corrupt record"),
            ErrorKind::UniqueConstraintViolation => write!(f, "Unique constraint violation"),
            ErrorKind::InvalidQuery => write!(f, "Invalid query"),
            ErrorKind::ValidationError => write!(f, "Validation error"),
            ErrorKind::IOError => write!(f, "IO error"),
            ErrorKind::FileNotFound => write!(f, "File not found"),
            ErrorKind::PermissionDenied => write!(f, "Permission denied"),
            ErrorKind::EncodingError => write!(f, "Encoding error"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::NotReady => write!(f, "Not ready"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Error type returned by every fallible tidedb operation.
///
/// `TideError` carries a message, an [`ErrorKind`], an optional cause and the
/// backtrace captured where the error was raised.
#[derive(Clone)]
pub struct TideError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<TideError>>,
    backtrace: Arc<RwLock<Backtrace>>,
}

impl TideError {
    /// Creates a new `TideError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        TideError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: Arc::new(RwLock::new(Backtrace::new())),
        }
    }

    /// Creates a new `TideError` that keeps `cause` in its error chain.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: TideError) -> Self {
        TideError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: Arc::new(RwLock::new(Backtrace::new())),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&TideError> {
        self.cause.as_deref()
    }
}

impl Display for TideError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for TideError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace.read()),
        }
    }
}

impl Error for TideError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for tidedb operations.
pub type TideResult<T> = Result<T, TideError>;

impl From<std::io::Error> for TideError {
    fn from(err: std::io::Error) -> Self {
        let error_kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            _ => ErrorKind::IOError,
        };
        TideError::new(&format!("IO error: {}", err), error_kind)
    }
}

impl From<serde_json::Error> for TideError {
    fn from(err: serde_json::Error) -> Self {
        TideError::new(&format!("JSON error: {}", err), ErrorKind::EncodingError)
    }
}

impl From<regex::Error> for TideError {
    fn from(err: regex::Error) -> Self {
        TideError::new(
            &format!("Invalid regular expression: {}", err),
            ErrorKind::InvalidQuery,
        )
    }
}

impl From<String> for TideError {
    fn from(msg: String) -> Self {
        TideError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for TideError {
    fn from(msg: &str) -> Self {
        TideError::new(msg, ErrorKind::InternalError)
    }
}
