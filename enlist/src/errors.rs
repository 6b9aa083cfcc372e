use backtrace::Backtrace;
use parking_lot::RwLock;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;
use std::sync::Arc;

type Atomic<T> = Arc<RwLock<T>>;

#[inline]
fn atomic<T>(t: T) -> Atomic<T> {
    Arc::new(RwLock::new(t))
}

/// Error kinds for enlist operations.
///
/// Each kind describes one category of failure in the coordination layer,
/// enabling precise error handling at call sites.
///
/// # Examples
///
/// ```rust,ignore
/// use enlist::errors::{EnlistError, ErrorKind, EnlistResult};
///
/// fn example() -> EnlistResult<()> {
///     Err(EnlistError::new("Transaction is closed", ErrorKind::ClosedTransaction))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Validation errors - raised synchronously before any transaction opens
    /// Empty model set, or models homed on different connections
    InvalidInput,

    // Transaction lifecycle errors
    /// The underlying begin call failed; no transaction was opened
    TransactionStart,
    /// Commit failed after the unit of work succeeded
    Commit,
    /// Rollback failed
    Rollback,
    /// A query was attempted through a handle whose settlement has been
    /// requested or completed
    ClosedTransaction,
    /// Commit or rollback requested more than once, or on a handle whose
    /// settlement is owned by the scoped runner
    AlreadySettled,

    // Driver errors - surfaced by the connection provider
    /// Error from the underlying driver outside the classified paths
    Driver,

    // Generic/Internal errors - used as fallback
    /// Internal error (usually indicates a bug)
    Internal,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::InvalidInput => write!(f, "Invalid input"),
            ErrorKind::TransactionStart => write!(f, "Transaction start failed"),
            ErrorKind::Commit => write!(f, "Commit failed"),
            ErrorKind::Rollback => write!(f, "Rollback failed"),
            ErrorKind::ClosedTransaction => write!(f, "Transaction closed"),
            ErrorKind::AlreadySettled => write!(f, "Transaction already settled"),
            ErrorKind::Driver => write!(f, "Driver error"),
            ErrorKind::Internal => write!(f, "Internal error"),
        }
    }
}

/// Custom enlist error type.
///
/// `EnlistError` encapsulates error information including the error message,
/// kind, and optional cause. It supports error chaining and backtraces for
/// debugging.
///
/// # Examples
///
/// ```rust,ignore
/// use enlist::errors::{EnlistError, ErrorKind};
///
/// // Create a simple error
/// let err = EnlistError::new("Transaction is closed", ErrorKind::ClosedTransaction);
///
/// // Create an error with a cause
/// let cause = EnlistError::new("Connection reset", ErrorKind::Driver);
/// let err = EnlistError::new_with_cause("Commit failed", ErrorKind::Commit, cause);
/// ```
///
/// # Type alias
///
/// The `EnlistResult<T>` type alias is equivalent to `Result<T, EnlistError>`
/// and is used throughout the codebase for operations that can fail.
#[derive(Clone)]
pub struct EnlistError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<EnlistError>>,
    backtrace: Atomic<Backtrace>,
}

impl EnlistError {
    /// Creates a new `EnlistError` with the specified message and error kind.
    ///
    /// # Arguments
    ///
    /// * `message` - A description of the error
    /// * `error_kind` - The category of error
    ///
    /// # Returns
    ///
    /// A new `EnlistError` instance.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        EnlistError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: atomic(Backtrace::new()),
        }
    }

    /// Creates a new `EnlistError` with a cause error.
    ///
    /// This creates an error chain where the cause error is preserved for
    /// debugging.
    ///
    /// # Arguments
    ///
    /// * `message` - A description of the error
    /// * `error_kind` - The category of error
    /// * `cause` - The underlying error that caused this error
    ///
    /// # Returns
    ///
    /// A new `EnlistError` instance with the cause error attached.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: EnlistError) -> Self {
        EnlistError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: atomic(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&Box<EnlistError>> {
        self.cause.as_ref()
    }
}

impl Display for EnlistError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for EnlistError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace.read()),
        }
    }
}

impl Error for EnlistError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for enlist operations.
///
/// `EnlistResult<T>` is shorthand for `Result<T, EnlistError>`.
/// All fallible enlist operations return this type.
///
/// # Examples
///
/// ```rust,ignore
/// use enlist::errors::EnlistResult;
///
/// fn relation_name(name: &str) -> EnlistResult<String> {
///     Ok(name.to_string())
/// }
/// ```
pub type EnlistResult<T> = Result<T, EnlistError>;

// From trait implementations for automatic error conversion
impl From<String> for EnlistError {
    fn from(msg: String) -> Self {
        EnlistError::new(&msg, ErrorKind::Internal)
    }
}

impl From<&str> for EnlistError {
    fn from(msg: &str) -> Self {
        EnlistError::new(msg, ErrorKind::Internal)
    }
}
