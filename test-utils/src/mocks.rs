//! Mock implementations for testing.
//!
//! [`ScriptedDataStore`] replays a script of write outcomes and counts every
//! call, so tests can assert exactly how often the retrying store hit it.

use async_trait::async_trait;
use census_common::cloud::{
    BoxError, CloudDataStore, DocumentRef, InMemoryDataStore, StoreError, StoreResult,
    single_result,
};
use serde_json::Value;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use thiserror::Error;
use tokio::sync::Mutex;
use tonic::{Code, Status};

/// Outcome of one scripted write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Write goes through
    Succeed,
    /// Adapter reports contention directly
    Contention,
    /// SDK fails with this status, buried in a cause chain
    Status(Code),
    /// Permanent failure without any status
    Fail(String),
}

/// Error wrapper shaped like the ones a store SDK raises.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SdkError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl SdkError {
    /// Wrap `source` under `message`.
    #[must_use]
    pub fn wrap(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Build the cause chain a store SDK reports for a failed write:
/// `execution failed -> write rejected -> status`.
#[must_use]
pub fn sdk_error_chain(code: Code) -> SdkError {
    let status = Status::new(code, format!("{code:?}"));
    SdkError::wrap("execution failed", SdkError::wrap("write rejected", status))
}

/// Document store that replays scripted write outcomes.
///
/// Successful writes land in an [`InMemoryDataStore`] so they can be read
/// back. Once the script runs out every write uses the default outcome.
#[derive(Debug)]
pub struct ScriptedDataStore {
    documents: InMemoryDataStore,
    script: Mutex<VecDeque<WriteOutcome>>,
    default_outcome: WriteOutcome,
    failing_reads: bool,
    duplicate_results: bool,
    store_calls: AtomicU32,
    retrieve_calls: AtomicU32,
    search_calls: AtomicU32,
    delete_calls: AtomicU32,
}

impl Default for ScriptedDataStore {
    fn default() -> Self {
        Self {
            documents: InMemoryDataStore::new(),
            script: Mutex::new(VecDeque::new()),
            default_outcome: WriteOutcome::Succeed,
            failing_reads: false,
            duplicate_results: false,
            store_calls: AtomicU32::new(0),
            retrieve_calls: AtomicU32::new(0),
            search_calls: AtomicU32::new(0),
            delete_calls: AtomicU32::new(0),
        }
    }
}

impl ScriptedDataStore {
    /// Create a store whose writes all succeed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Play `outcomes` for the first writes, in order.
    #[must_use]
    pub fn with_script(self, outcomes: impl IntoIterator<Item = WriteOutcome>) -> Self {
        Self {
            script: Mutex::new(outcomes.into_iter().collect()),
            ..self
        }
    }

    /// Outcome for every write after the script runs out.
    #[must_use]
    pub fn then_default(mut self, outcome: WriteOutcome) -> Self {
        self.default_outcome = outcome;
        self
    }

    /// Make reads, searches and deletes fail with an overload status.
    #[must_use]
    pub const fn with_failing_reads(mut self) -> Self {
        self.failing_reads = true;
        self
    }

    /// Make key lookups report every hit twice.
    #[must_use]
    pub const fn with_duplicate_results(mut self) -> Self {
        self.duplicate_results = true;
        self
    }

    /// Number of `store_object` calls received.
    #[must_use]
    pub fn store_calls(&self) -> u32 {
        self.store_calls.load(Ordering::SeqCst)
    }

    /// Number of `retrieve_object` calls received.
    #[must_use]
    pub fn retrieve_calls(&self) -> u32 {
        self.retrieve_calls.load(Ordering::SeqCst)
    }

    /// Number of `search` calls received.
    #[must_use]
    pub fn search_calls(&self) -> u32 {
        self.search_calls.load(Ordering::SeqCst)
    }

    /// Number of `delete_object` calls received.
    #[must_use]
    pub fn delete_calls(&self) -> u32 {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Documents successfully written.
    pub async fn document_count(&self) -> usize {
        self.documents.document_count().await
    }

    fn read_failure(operation: &str) -> StoreError {
        StoreError::failed_with(
            format!("Failed to {operation} in document store"),
            sdk_error_chain(Code::Unavailable),
        )
    }
}

#[async_trait]
impl CloudDataStore for ScriptedDataStore {
    async fn store_object(&self, doc: &DocumentRef, value: Value) -> StoreResult<()> {
        self.store_calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .script
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| self.default_outcome.clone());

        match outcome {
            WriteOutcome::Succeed => self.documents.store_object(doc, value).await,
            WriteOutcome::Contention => Err(StoreError::contention(
                doc.schema.clone(),
                Status::resource_exhausted("Too much contention on these documents"),
            )),
            WriteOutcome::Status(code) => {
                Err(StoreError::from_write_failure(doc, sdk_error_chain(code)))
            }
            WriteOutcome::Fail(message) => Err(StoreError::failed(message)),
        }
    }

    async fn retrieve_object(&self, doc: &DocumentRef) -> StoreResult<Option<Value>> {
        self.retrieve_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_reads {
            return Err(Self::read_failure("retrieve object"));
        }

        let found = self.documents.retrieve_object(doc).await?;
        if self.duplicate_results {
            let hits: Vec<Value> = found.into_iter().flat_map(|v| [v.clone(), v]).collect();
            return single_result(doc, hits);
        }
        Ok(found)
    }

    async fn search(
        &self,
        schema: &str,
        field_path: &[&str],
        value: &str,
    ) -> StoreResult<Vec<Value>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_reads {
            return Err(Self::read_failure("search schema"));
        }
        self.documents.search(schema, field_path, value).await
    }

    async fn delete_object(&self, doc: &DocumentRef) -> StoreResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_reads {
            return Err(Self::read_failure("delete object"));
        }
        self.documents.delete_object(doc).await
    }

    async fn collection_names(&self) -> HashSet<String> {
        self.documents.collection_names().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use census_common::cloud::{ContentionSignal, classify};
    use serde_json::json;

    #[test]
    fn test_sdk_error_chain_carries_status() {
        assert_eq!(
            classify(&sdk_error_chain(Code::Aborted)),
            ContentionSignal::Retryable
        );
        assert_eq!(
            classify(&sdk_error_chain(Code::AlreadyExists)),
            ContentionSignal::Permanent
        );
    }

    #[tokio::test]
    async fn test_script_then_default() {
        let store = ScriptedDataStore::new()
            .with_script([WriteOutcome::Contention, WriteOutcome::Succeed])
            .then_default(WriteOutcome::Fail("disk full".to_string()));
        let doc = DocumentRef::new("case", "1");

        assert!(store.store_object(&doc, json!({})).await.unwrap_err().is_contention());
        assert!(store.store_object(&doc, json!({})).await.is_ok());
        let err = store.store_object(&doc, json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "disk full");

        assert_eq!(store.store_calls(), 3);
        assert_eq!(store.document_count().await, 1);
    }

    #[tokio::test]
    async fn test_status_outcome_is_translated() {
        let store = ScriptedDataStore::new().with_script([
            WriteOutcome::Status(Code::DeadlineExceeded),
            WriteOutcome::Status(Code::AlreadyExists),
        ]);
        let doc = DocumentRef::new("case", "1");

        let err = store.store_object(&doc, json!({})).await.unwrap_err();
        assert!(err.is_contention());

        let err = store.store_object(&doc, json!({})).await.unwrap_err();
        assert!(!err.is_contention());
        assert_eq!(err.contention_signal(), ContentionSignal::Permanent);
    }

    #[tokio::test]
    async fn test_duplicate_results() {
        let store = ScriptedDataStore::new().with_duplicate_results();
        let doc = DocumentRef::new("case", "1");
        store.store_object(&doc, json!({"id": "1"})).await.unwrap();

        let err = store.retrieve_object(&doc).await.unwrap_err();
        assert!(matches!(err, StoreError::MultipleResults { count: 2, .. }));

        let missing = store
            .retrieve_object(&DocumentRef::new("case", "2"))
            .await
            .unwrap();
        assert_eq!(missing, None);
    }
}
