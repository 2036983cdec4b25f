//! Document store error types.

use super::contention::{ContentionSignal, classify, describe_error_chain};
use super::store::{DocumentRef, OperationIdentity};
use crate::error::Fault;
use crate::retry::RetryError;
use thiserror::Error;
use tracing::{error, info};

/// Boxed error as reported by a store SDK.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors reported by a [`CloudDataStore`](super::CloudDataStore).
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store is overloaded; the write may succeed if retried later.
    #[error("Document store contention on schema '{schema}'")]
    Contention {
        /// Collection the write targeted
        schema: String,
        /// Error reported by the store
        #[source]
        source: BoxError,
    },

    /// Any other store failure.
    #[error("{message}")]
    Failed {
        /// Description of the failed operation
        message: String,
        /// Error reported by the store, if any
        #[source]
        source: Option<BoxError>,
    },

    /// A lookup by key returned more than one document.
    #[error("Document store returned {count} results for schema '{schema}' with key '{key}'")]
    MultipleResults {
        /// Collection searched
        schema: String,
        /// Key looked up
        key: String,
        /// Number of documents found
        count: usize,
    },

    /// A search was requested with an empty field path.
    #[error("Invalid search on schema '{schema}': field path must not be empty")]
    InvalidFieldPath {
        /// Collection searched
        schema: String,
    },

    /// A document could not be converted to or from its stored form.
    #[error("Failed to convert document: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for document store operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Create a contention error for the given collection.
    #[must_use]
    pub fn contention(schema: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Contention {
            schema: schema.into(),
            source: source.into(),
        }
    }

    /// Create a failure without an underlying cause.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a failure wrapping the error reported by the store.
    #[must_use]
    pub fn failed_with(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Failed {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Translate an SDK error raised while writing `doc`.
    ///
    /// Overload signalled anywhere in the cause chain becomes
    /// [`StoreError::Contention`]; anything else becomes [`StoreError::Failed`].
    #[must_use]
    pub fn from_write_failure(doc: &DocumentRef, source: impl Into<BoxError>) -> Self {
        let source = source.into();
        error!(
            schema = %doc.schema,
            key = %doc.key,
            error_chain = %describe_error_chain(source.as_ref()),
            "Failed to create object in document store"
        );

        if classify(source.as_ref()).is_retryable() {
            info!(schema = %doc.schema, key = %doc.key, "Document store contention detected");
            return Self::contention(doc.schema.clone(), source);
        }

        Self::failed_with(
            format!(
                "Failed to create object in document store. Schema: {} with key {}",
                doc.schema, doc.key
            ),
            source,
        )
    }

    /// Whether this is a contention error.
    #[must_use]
    pub const fn is_contention(&self) -> bool {
        matches!(self, Self::Contention { .. })
    }

    /// Classify this error for the retry policy.
    ///
    /// Contention is always retryable. Other errors are classified by their
    /// cause chain, which catches adapters that pass overload statuses
    /// through without translating them.
    #[must_use]
    pub fn contention_signal(&self) -> ContentionSignal {
        if self.is_contention() {
            ContentionSignal::Retryable
        } else {
            classify(self)
        }
    }
}

/// A write that failed for good, either straight away or once retries ran
/// out. This is the only error callers see from a retried write.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct FinalStoreError {
    message: String,
    identity: OperationIdentity,
    #[source]
    source: RetryError<StoreError>,
}

impl FinalStoreError {
    /// Build the error for a failed write of the document described by
    /// `identity`.
    #[must_use]
    pub fn new(identity: OperationIdentity, source: RetryError<StoreError>) -> Self {
        let message = if source.is_exhausted() {
            format!("Retries exhausted for storage of {identity}")
        } else {
            format!("Failed to store {identity}")
        };
        Self {
            message,
            identity,
            source,
        }
    }

    /// Identity of the document that could not be stored.
    #[must_use]
    pub const fn identity(&self) -> &OperationIdentity {
        &self.identity
    }

    /// Number of store calls made before giving up.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.source.attempts()
    }

    /// Whether the write was abandoned because retries ran out.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.source.is_exhausted()
    }

    /// The store error from the last attempt.
    #[must_use]
    pub const fn store_error(&self) -> &StoreError {
        self.source.inner()
    }

    /// Fault code reported to callers.
    #[must_use]
    pub const fn fault(&self) -> Fault {
        Fault::SystemError
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    fn identity() -> OperationIdentity {
        OperationIdentity::new("CaseDocument", "case-77")
    }

    #[test]
    fn test_write_failure_with_contention_status() {
        let doc = DocumentRef::new("TEST_SCHEMA", "1");
        let err = StoreError::from_write_failure(&doc, tonic::Status::resource_exhausted("busy"));

        assert!(err.is_contention());
        assert!(err.to_string().contains("contention on schema 'TEST_SCHEMA'"));
    }

    #[test]
    fn test_write_failure_without_contention() {
        let doc = DocumentRef::new("TEST_SCHEMA", "1");
        let err = StoreError::from_write_failure(&doc, tonic::Status::already_exists("dup"));

        assert!(!err.is_contention());
        assert_eq!(err.contention_signal(), ContentionSignal::Permanent);
        assert!(err.to_string().contains("Failed to create object"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_untranslated_status_is_classified() {
        let err = StoreError::failed_with("write failed", tonic::Status::unavailable("down"));
        assert_eq!(err.contention_signal(), ContentionSignal::Retryable);

        let err = StoreError::failed("write failed");
        assert_eq!(err.contention_signal(), ContentionSignal::Permanent);
    }

    #[test]
    fn test_final_error_after_exhaustion() {
        let source = RetryError::Exhausted {
            attempts: 3,
            source: StoreError::contention("case", tonic::Status::aborted("busy")),
        };
        let err = FinalStoreError::new(identity(), source);

        assert_eq!(
            err.to_string(),
            "Retries exhausted for storage of CaseDocument: case-77"
        );
        assert!(err.is_exhausted());
        assert_eq!(err.attempts(), 3);
        assert_eq!(err.fault(), Fault::SystemError);
        assert!(err.store_error().is_contention());
    }

    #[test]
    fn test_final_error_after_permanent_failure() {
        let source = RetryError::Permanent {
            attempts: 1,
            source: StoreError::failed("permission denied"),
        };
        let err = FinalStoreError::new(identity(), source);

        assert_eq!(err.to_string(), "Failed to store CaseDocument: case-77");
        assert!(!err.is_exhausted());
        assert_eq!(err.identity().id(), "case-77");
    }
}
