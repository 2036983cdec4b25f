//! Cloud document store abstraction.
//!
//! This module provides:
//! - [`CloudDataStore`], the port every document database adapter implements
//! - [`classify`], which tells transient overload apart from permanent failures
//! - [`RetryableCloudDataStore`], which retries contended writes with backoff
//! - [`InMemoryDataStore`], an adapter for local development and tests

pub mod contention;
pub mod error;
pub mod memory;
pub mod retryable;
pub mod store;

pub use contention::{ContentionSignal, classify, describe_error_chain, is_retryable_code};
pub use error::{BoxError, FinalStoreError, StoreError, StoreResult};
pub use memory::InMemoryDataStore;
pub use retryable::RetryableCloudDataStore;
pub use store::{CloudDataStore, DocumentRef, OperationIdentity, single_result};
