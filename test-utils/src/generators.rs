//! Shared proptest generators for the document store tests.

use crate::mocks::SdkError;
use census_common::RetryConfig;
use census_common::cloud::BoxError;
use proptest::prelude::*;
use std::time::Duration;
use tonic::{Code, Status};

/// Status codes that signal contention.
pub fn retryable_code_strategy() -> impl Strategy<Value = Code> {
    prop_oneof![
        Just(Code::ResourceExhausted),
        Just(Code::Aborted),
        Just(Code::DeadlineExceeded),
        Just(Code::Unavailable),
    ]
}

/// Status codes that never signal contention.
pub fn permanent_code_strategy() -> impl Strategy<Value = Code> {
    prop_oneof![
        Just(Code::Cancelled),
        Just(Code::Unknown),
        Just(Code::InvalidArgument),
        Just(Code::NotFound),
        Just(Code::AlreadyExists),
        Just(Code::PermissionDenied),
        Just(Code::FailedPrecondition),
        Just(Code::OutOfRange),
        Just(Code::Unimplemented),
        Just(Code::Internal),
        Just(Code::DataLoss),
        Just(Code::Unauthenticated),
    ]
}

/// Wrap a status with `code` under `depth` SDK errors.
#[must_use]
pub fn bury_status(code: Code, depth: usize) -> BoxError {
    let root: BoxError = Box::new(Status::new(code, format!("{code:?}")));
    (0..depth).fold(root, |source, level| -> BoxError {
        Box::new(SdkError::wrap(format!("layer {level}"), source))
    })
}

/// Valid retry configurations with small delays.
pub fn retry_config_strategy() -> impl Strategy<Value = RetryConfig> {
    (1u64..500, 1.05f64..3.0, 1u64..100, 1u32..10).prop_map(
        |(initial_ms, multiplier, cap_factor, max_attempts)| {
            RetryConfig::default()
                .with_initial_delay(Duration::from_millis(initial_ms))
                .with_multiplier(multiplier)
                .with_max_delay(Duration::from_millis(initial_ms * cap_factor))
                .with_max_attempts(max_attempts)
        },
    )
}

/// Non-empty field paths into a document.
pub fn field_path_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z][a-zA-Z]{0,12}", 1..4)
}

/// Ids used to describe a stored object.
pub fn identity_id_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9-]{1,36}"
}

/// Document keys.
pub fn document_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9-]{1,40}"
}

#[cfg(test)]
mod tests {
    use super::*;
    use census_common::cloud::{ContentionSignal, classify, is_retryable_code};
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;

    #[test]
    fn test_code_strategies_partition() {
        let mut runner = TestRunner::default();
        for _ in 0..20 {
            let retryable = retryable_code_strategy()
                .new_tree(&mut runner)
                .unwrap()
                .current();
            let permanent = permanent_code_strategy()
                .new_tree(&mut runner)
                .unwrap()
                .current();
            assert!(is_retryable_code(retryable));
            assert!(!is_retryable_code(permanent));
        }
    }

    #[test]
    fn test_bury_status_keeps_code() {
        let err = bury_status(Code::Aborted, 5);
        assert_eq!(err.to_string(), "layer 4");
        assert_eq!(classify(err.as_ref()), ContentionSignal::Retryable);
    }

    #[test]
    fn test_retry_configs_are_valid() {
        let mut runner = TestRunner::default();
        for _ in 0..20 {
            let config = retry_config_strategy()
                .new_tree(&mut runner)
                .unwrap()
                .current();
            assert!(config.validate().is_ok());
        }
    }
}
