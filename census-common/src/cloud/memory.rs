//! In-memory document store.
//!
//! Implements [`CloudDataStore`] over a map of collections, for local
//! development and tests where no cloud project is available.

use super::error::{StoreError, StoreResult};
use super::store::{CloudDataStore, DocumentRef};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::{debug, info};

type Collection = BTreeMap<String, Value>;

/// Document store held entirely in process memory.
#[derive(Debug, Default)]
pub struct InMemoryDataStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryDataStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents held across all collections.
    pub async fn document_count(&self) -> usize {
        self.collections.read().await.values().map(BTreeMap::len).sum()
    }
}

/// Follow `path` through nested objects.
fn field_at<'a>(document: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(document, |current, segment| current.get(*segment))
}

#[async_trait]
impl CloudDataStore for InMemoryDataStore {
    async fn store_object(&self, doc: &DocumentRef, value: Value) -> StoreResult<()> {
        info!(schema = %doc.schema, key = %doc.key, "Saving object to document store");

        self.collections
            .write()
            .await
            .entry(doc.schema.clone())
            .or_default()
            .insert(doc.key.clone(), value);

        info!(schema = %doc.schema, key = %doc.key, "Document store save completed");
        Ok(())
    }

    async fn retrieve_object(&self, doc: &DocumentRef) -> StoreResult<Option<Value>> {
        info!(schema = %doc.schema, key = %doc.key, "Fetching object from document store");

        let found = self
            .collections
            .read()
            .await
            .get(&doc.schema)
            .and_then(|collection| collection.get(&doc.key))
            .cloned();

        if found.is_none() {
            debug!(schema = %doc.schema, key = %doc.key, "Search didn't find any objects");
        }
        Ok(found)
    }

    async fn search(
        &self,
        schema: &str,
        field_path: &[&str],
        value: &str,
    ) -> StoreResult<Vec<Value>> {
        if field_path.is_empty() {
            return Err(StoreError::InvalidFieldPath {
                schema: schema.to_string(),
            });
        }
        debug!(schema, field_path = ?field_path, value, "Searching document store");

        let collections = self.collections.read().await;
        let results: Vec<Value> = collections
            .get(schema)
            .map(|collection| {
                collection
                    .values()
                    .filter(|document| {
                        matches!(field_at(document, field_path), Some(Value::String(s)) if s == value)
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        debug!(result_size = results.len(), "Document store search returning results");
        Ok(results)
    }

    async fn delete_object(&self, doc: &DocumentRef) -> StoreResult<()> {
        info!(schema = %doc.schema, key = %doc.key, "Deleting object from document store");

        let mut collections = self.collections.write().await;
        if let Some(collection) = collections.get_mut(&doc.schema) {
            collection.remove(&doc.key);
            if collection.is_empty() {
                collections.remove(&doc.schema);
            }
        }

        info!(schema = %doc.schema, key = %doc.key, "Document store delete completed");
        Ok(())
    }

    async fn collection_names(&self) -> HashSet<String> {
        self.collections.read().await.keys().cloned().collect()
    }
}
