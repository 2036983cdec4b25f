//! Retrying decorator for a [`CloudDataStore`].

use super::contention::describe_error_chain;
use super::error::{FinalStoreError, StoreError, StoreResult};
use super::store::{CloudDataStore, DocumentRef, OperationIdentity};
use crate::retry::{RetryError, RetryPolicy};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{error, info};

/// Decorator for [`CloudDataStore`] that retries contended writes with
/// exponential backoff.
///
/// Only writes are retried. Reads, searches and deletes go straight to the
/// wrapped store, once, and their errors are returned unchanged.
pub struct RetryableCloudDataStore<S> {
    store: S,
    policy: RetryPolicy,
}

impl<S: CloudDataStore> RetryableCloudDataStore<S> {
    /// Wrap `store`, retrying writes according to `policy`.
    #[must_use]
    pub fn new(store: S, policy: RetryPolicy) -> Self {
        info!(
            config = ?policy.config(),
            worst_case_delay_ms = policy.worst_case_delay().as_millis(),
            "Cloud data store retry configuration"
        );
        Self { store, policy }
    }

    /// Write `value` to `schema`/`key`, retrying while the store reports
    /// contention.
    ///
    /// `id` is a human readable identity for the value, combined with the
    /// value's type name in logs and in the returned error.
    ///
    /// # Errors
    ///
    /// Returns [`FinalStoreError`] if the value cannot be serialised, the
    /// store fails permanently, or every attempt hit contention.
    pub async fn store_object<T>(
        &self,
        schema: &str,
        key: &str,
        value: &T,
        id: &str,
    ) -> Result<(), FinalStoreError>
    where
        T: Serialize + ?Sized,
    {
        let doc = DocumentRef::new(schema, key);
        let identity = OperationIdentity::of::<T>(id);

        let document = match serde_json::to_value(value) {
            Ok(document) => document,
            Err(e) => {
                let source = RetryError::Permanent {
                    attempts: 0,
                    source: StoreError::from(e),
                };
                return Err(Self::report(&doc, FinalStoreError::new(identity, source)));
            }
        };

        self.store_value(&doc, document, identity).await
    }

    /// Write an already converted document, retrying while the store
    /// reports contention.
    ///
    /// # Errors
    ///
    /// Returns [`FinalStoreError`] if the store fails permanently or every
    /// attempt hit contention.
    pub async fn store_value(
        &self,
        doc: &DocumentRef,
        value: Value,
        identity: OperationIdentity,
    ) -> Result<(), FinalStoreError> {
        self.policy
            .execute(
                "storeObject",
                || self.store.store_object(doc, value.clone()),
                StoreError::contention_signal,
            )
            .await
            .map_err(|source| Self::report(doc, FinalStoreError::new(identity, source)))
    }

    /// Read the document at `schema`/`key` as a `T`.
    ///
    /// # Errors
    ///
    /// Returns the wrapped store's error, or [`StoreError::Serialization`] if
    /// the document does not convert into `T`.
    pub async fn retrieve_object<T: DeserializeOwned>(
        &self,
        schema: &str,
        key: &str,
    ) -> StoreResult<Option<T>> {
        let doc = DocumentRef::new(schema, key);
        let document = self.store.retrieve_object(&doc).await?;
        Ok(document.map(serde_json::from_value).transpose()?)
    }

    /// Find every document in `schema` whose field at `field_path` equals
    /// `value`, converted into `T`.
    ///
    /// # Errors
    ///
    /// Returns the wrapped store's error, or [`StoreError::Serialization`] if
    /// a document does not convert into `T`.
    pub async fn search<T: DeserializeOwned>(
        &self,
        schema: &str,
        field_path: &[&str],
        value: &str,
    ) -> StoreResult<Vec<T>> {
        let documents = self.store.search(schema, field_path, value).await?;
        Ok(documents
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()?)
    }

    /// Delete the document at `schema`/`key`.
    ///
    /// # Errors
    ///
    /// Returns the wrapped store's error.
    pub async fn delete_object(&self, schema: &str, key: &str) -> StoreResult<()> {
        self.store
            .delete_object(&DocumentRef::new(schema, key))
            .await
    }

    /// Names of the top level collections currently present.
    pub async fn collection_names(&self) -> HashSet<String> {
        self.store.collection_names().await
    }

    /// The wrapped store.
    pub const fn inner(&self) -> &S {
        &self.store
    }

    /// The retry policy applied to writes.
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn report(doc: &DocumentRef, err: FinalStoreError) -> FinalStoreError {
        let message = if err.is_exhausted() {
            "Retries exhausted for storage"
        } else {
            "Failed to store object"
        };
        error!(
            schema = %doc.schema,
            key = %doc.key,
            identity = %err.identity(),
            attempts = err.attempts(),
            error_chain = %describe_error_chain(&err),
            "{message}"
        );
        err
    }
}
