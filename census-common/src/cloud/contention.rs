//! Classification of document store failures as transient or permanent.

use std::error::Error;
use std::fmt::Write as _;
use tonic::{Code, Status};
use tracing::info;

/// Outcome of classifying a failed store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentionSignal {
    /// Transient overload, the operation should be attempted again
    Retryable,
    /// Any other failure, retrying would not help
    Permanent,
}

impl ContentionSignal {
    /// Whether the signal asks for another attempt.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Retryable)
    }
}

/// Status codes the document store uses to report contention or overload.
#[must_use]
pub const fn is_retryable_code(code: Code) -> bool {
    matches!(
        code,
        Code::ResourceExhausted | Code::Aborted | Code::DeadlineExceeded | Code::Unavailable
    )
}

/// Classify an error by walking its cause chain.
///
/// The first [`Status`] found in the chain decides the outcome. The walk
/// stops there, so a retryable status nested below a non-retryable one is
/// never considered. A chain without any status is permanent.
///
/// # Examples
///
/// ```
/// use census_common::cloud::{classify, ContentionSignal};
///
/// let status = tonic::Status::resource_exhausted("too much contention");
/// assert_eq!(classify(&status), ContentionSignal::Retryable);
///
/// let status = tonic::Status::already_exists("document exists");
/// assert_eq!(classify(&status), ContentionSignal::Permanent);
/// ```
#[must_use]
pub fn classify(error: &(dyn Error + 'static)) -> ContentionSignal {
    let mut current = Some(error);

    while let Some(err) = current {
        if let Some(status) = err.downcast_ref::<Status>() {
            if is_retryable_code(status.code()) {
                return ContentionSignal::Retryable;
            }

            info!(
                status_code = ?status.code(),
                status_description = status.message(),
                "Status found in error chain, but it's not a retryable code"
            );
            return ContentionSignal::Permanent;
        }
        current = err.source();
    }

    ContentionSignal::Permanent
}

/// Render an error and all of its causes on one line.
///
/// Used when logging store failures, so a change in how the store SDK wraps
/// its errors shows up in the logs.
#[must_use]
pub fn describe_error_chain(error: &(dyn Error + 'static)) -> String {
    let mut description = String::new();
    let mut current = Some(error);

    while let Some(err) = current {
        if !description.is_empty() {
            description.push(' ');
        }
        let _ = write!(description, "caused by {err}");
        current = err.source();
    }

    description
}
