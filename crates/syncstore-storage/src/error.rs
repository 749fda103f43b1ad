//! Storage error types for the syncstore storage contract.
//!
//! Every backend reports failures through [`StorageError`]. Driver-specific
//! failures are never surfaced raw: they are wrapped in a [`BackendError`]
//! that keeps the original error around for diagnostics.

use std::error::Error as StdError;
use std::fmt;

use crate::scope::Scope;

/// Boxed driver failure carried by [`BackendError`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested object is absent or tombstoned in its scope.
    #[error("Object not found: {resource_name}/{parent_id}/{id}")]
    ObjectNotFound {
        /// Resource name of the scope that was searched.
        resource_name: String,
        /// Parent id of the scope that was searched.
        parent_id: String,
        /// The id that could not be found.
        id: String,
    },

    /// An object with the same id already lives in the scope.
    #[error("Object already exists: {resource_name}/{parent_id}/{id}")]
    Unicity {
        /// Resource name of the colliding scope.
        resource_name: String,
        /// Parent id of the colliding scope.
        parent_id: String,
        /// The colliding id.
        id: String,
    },

    /// The underlying driver failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A field holds a value the engine cannot serialize (raw binary).
    #[error("Unsupported value for field '{field}': raw binary data cannot be stored")]
    UnsupportedValue {
        /// Dotted path of the offending field.
        field: String,
    },

    /// The object handed to the engine is malformed.
    #[error("Invalid object: {message}")]
    InvalidObject {
        /// Why the object was rejected.
        message: String,
    },

    /// The query (filters, cursor, purge arguments) is malformed.
    #[error("Invalid query: {message}")]
    InvalidQuery {
        /// Why the query was rejected.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `ObjectNotFound` error.
    #[must_use]
    pub fn not_found(scope: &Scope, id: impl Into<String>) -> Self {
        Self::ObjectNotFound {
            resource_name: scope.resource_name.clone(),
            parent_id: scope.parent_id.clone(),
            id: id.into(),
        }
    }

    /// Creates a new `Unicity` error.
    #[must_use]
    pub fn unicity(scope: &Scope, id: impl Into<String>) -> Self {
        Self::Unicity {
            resource_name: scope.resource_name.clone(),
            parent_id: scope.parent_id.clone(),
            id: id.into(),
        }
    }

    /// Wraps a driver failure.
    #[must_use]
    pub fn backend<E>(message: impl Into<String>, original: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Backend(BackendError::new(message, original))
    }

    /// Creates a new `UnsupportedValue` error.
    #[must_use]
    pub fn unsupported_value(field: impl Into<String>) -> Self {
        Self::UnsupportedValue {
            field: field.into(),
        }
    }

    /// Creates a new `InvalidObject` error.
    #[must_use]
    pub fn invalid_object(message: impl Into<String>) -> Self {
        Self::InvalidObject {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidQuery` error.
    #[must_use]
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    /// Returns `true` if this is an object not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ObjectNotFound { .. })
    }

    /// Returns `true` if this is a unicity error.
    #[must_use]
    pub fn is_unicity(&self) -> bool {
        matches!(self, Self::Unicity { .. })
    }

    /// Returns `true` if this wraps a backend failure.
    #[must_use]
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::Backend(_))
    }

    /// Returns `true` if a value could not be serialized.
    #[must_use]
    pub fn is_unsupported_value(&self) -> bool {
        matches!(self, Self::UnsupportedValue { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ObjectNotFound { .. } => ErrorCategory::NotFound,
            Self::Unicity { .. } => ErrorCategory::Conflict,
            Self::Backend(_) => ErrorCategory::Backend,
            Self::UnsupportedValue { .. } | Self::InvalidObject { .. } => {
                ErrorCategory::Validation
            }
            Self::InvalidQuery { .. } => ErrorCategory::Query,
        }
    }
}

/// A driver failure normalized for callers.
///
/// The original error is preserved and exposed both through
/// [`BackendError::original`] and the standard `source()` chain.
#[derive(Debug, thiserror::Error)]
#[error("Backend error: {message}")]
pub struct BackendError {
    message: String,
    #[source]
    original: BoxError,
}

impl BackendError {
    /// Wraps `original` with a human readable context message.
    pub fn new<E>(message: impl Into<String>, original: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            message: message.into(),
            original: Box::new(original),
        }
    }

    /// The context message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The failure reported by the driver.
    pub fn original(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.original.as_ref()
    }
}

/// Raised when a read would have to establish state on a read-only backend.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Cannot initialize empty resource timestamp for {scope} when running in readonly")]
pub struct ReadOnlyError {
    /// Display form of the scope that was read.
    pub scope: String,
}

/// Wraps driver results into [`StorageError::Backend`].
pub trait BackendResultExt<T> {
    /// Maps the error side into a backend error with `context`.
    fn or_backend(self, context: &str) -> Result<T, StorageError>;
}

impl<T, E> BackendResultExt<T> for Result<T, E>
where
    E: StdError + Send + Sync + 'static,
{
    fn or_backend(self, context: &str) -> Result<T, StorageError> {
        self.map_err(|e| StorageError::backend(context, e))
    }
}

/// Categories of storage errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Object not found.
    NotFound,
    /// Id collision.
    Conflict,
    /// Unstorable or malformed input.
    Validation,
    /// Malformed query.
    Query,
    /// Driver failure.
    Backend,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Validation => write!(f, "validation"),
            Self::Query => write!(f, "query"),
            Self::Backend => write!(f, "backend"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    fn scope() -> Scope {
        Scope::new("test", "1234")
    }

    #[test]
    fn test_error_display() {
        let err = StorageError::not_found(&scope(), "abc");
        assert_eq!(err.to_string(), "Object not found: test/1234/abc");

        let err = StorageError::unicity(&scope(), "abc");
        assert_eq!(err.to_string(), "Object already exists: test/1234/abc");

        let err = StorageError::unsupported_value("steak");
        assert_eq!(
            err.to_string(),
            "Unsupported value for field 'steak': raw binary data cannot be stored"
        );
    }

    #[test]
    fn test_backend_error_keeps_original() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = StorageError::backend("connection lost", io);

        assert!(err.is_backend());
        assert_eq!(err.to_string(), "Backend error: connection lost");

        let StorageError::Backend(backend) = &err else {
            panic!("expected backend error");
        };
        assert_eq!(backend.original().to_string(), "refused");
        assert_eq!(err.source().map(|s| s.to_string()), Some("refused".into()));
    }

    #[test]
    fn test_or_backend_adapter() {
        let result: Result<(), ReadOnlyError> = Err(ReadOnlyError {
            scope: "test/1234".into(),
        });
        let err = result.or_backend("resource_timestamp").unwrap_err();
        assert!(err.is_backend());
    }

    #[test]
    fn test_error_predicates_and_category() {
        let err = StorageError::not_found(&scope(), "x");
        assert!(err.is_not_found());
        assert!(!err.is_unicity());
        assert_eq!(err.category(), ErrorCategory::NotFound);

        let err = StorageError::unicity(&scope(), "x");
        assert!(err.is_unicity());
        assert_eq!(err.category(), ErrorCategory::Conflict);

        assert_eq!(
            StorageError::unsupported_value("a").category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            StorageError::invalid_query("bad").category(),
            ErrorCategory::Query
        );
        assert_eq!(ErrorCategory::Backend.to_string(), "backend");
    }
}
