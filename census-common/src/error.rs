//! Centralized error types for census services.
//!
//! This module provides the crate-wide error type together with the fault
//! codes services report to their callers.

use crate::cloud::{FinalStoreError, StoreError};
use thiserror::Error;

/// Fault code attached to errors surfaced by census services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    /// Unexpected failure inside the service or one of its dependencies
    SystemError,
    /// The requested resource does not exist
    ResourceNotFound,
    /// The resource was modified concurrently
    ResourceVersionConflict,
    /// Caller is not allowed to perform the operation
    AccessDenied,
    /// Request was malformed
    BadRequest,
    /// Request failed validation
    ValidationFailed,
    /// Caller is being throttled
    TooManyRequests,
    /// Request was accepted but cannot be processed yet
    AcceptedUnableToProcess,
}

impl Fault {
    /// Wire representation of the fault code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SystemError => "SYSTEM_ERROR",
            Self::ResourceNotFound => "RESOURCE_NOT_FOUND",
            Self::ResourceVersionConflict => "RESOURCE_VERSION_CONFLICT",
            Self::AccessDenied => "ACCESS_DENIED",
            Self::BadRequest => "BAD_REQUEST",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::TooManyRequests => "TOO_MANY_REQUESTS",
            Self::AcceptedUnableToProcess => "ACCEPTED_UNABLE_TO_PROCESS",
        }
    }
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common error type for census service operations.
#[derive(Error, Debug)]
pub enum CommonError {
    /// Document store operation failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Write failed after the retry policy gave up
    #[error(transparent)]
    FinalStore(#[from] FinalStoreError),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for census common operations.
pub type CommonResult<T> = Result<T, CommonError>;

impl CommonError {
    /// Fault code reported for this error.
    ///
    /// Every failure surfaced by this crate is a system error from the
    /// caller's point of view.
    #[must_use]
    pub const fn fault(&self) -> Fault {
        match self {
            Self::FinalStore(e) => e.fault(),
            Self::Store(_) | Self::Serialization(_) | Self::Config(_) => Fault::SystemError,
        }
    }

    /// Check if this error is retryable.
    ///
    /// Only transient store contention is retryable; a write that already
    /// went through the retry policy is final.
    ///
    /// # Examples
    ///
    /// ```
    /// use census_common::CommonError;
    ///
    /// let err = CommonError::config("CLOUD_STORAGE_BACKOFF_MAX missing");
    /// assert!(!err.is_retryable());
    /// ```
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(e) => e.contention_signal().is_retryable(),
            Self::FinalStore(_) | Self::Serialization(_) | Self::Config(_) => false,
        }
    }

    /// Create a configuration error with the given message.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
