//! Document store port.
//!
//! [`CloudDataStore`] is the contract every document database adapter
//! satisfies. Documents are schema-less JSON values addressed by a
//! [`DocumentRef`]; typed conversion is left to the caller.

use super::error::{StoreError, StoreResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Address of a document: a collection name plus a key unique within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentRef {
    /// Logical collection name
    pub schema: String,
    /// Identifier of the document within the collection
    pub key: String,
}

impl DocumentRef {
    /// Create a new document reference.
    #[must_use]
    pub fn new(schema: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.schema, self.key)
    }
}

/// Diagnostic label for a store operation, e.g. `CaseDocument: case-123`.
///
/// Only used in logs and error messages; it has no effect on where the
/// document is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationIdentity {
    descriptor: String,
    id: String,
}

impl OperationIdentity {
    /// Create an identity from an explicit descriptor.
    #[must_use]
    pub fn new(descriptor: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            descriptor: descriptor.into(),
            id: id.into(),
        }
    }

    /// Create an identity described by the unqualified name of `T`.
    #[must_use]
    pub fn of<T: ?Sized>(id: impl Into<String>) -> Self {
        Self::new(simple_name(std::any::type_name::<T>()), id)
    }

    /// Type descriptor part of the identity.
    #[must_use]
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// Caller supplied part of the identity.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for OperationIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.descriptor, self.id)
    }
}

/// Unqualified name of a type as printed by [`std::any::type_name`].
///
/// Generic arguments and references are dropped. Slices and arrays render
/// as `Element[]`, tuples as `(A, B)`.
fn simple_name(full: &str) -> String {
    let name = full
        .trim()
        .trim_start_matches('&')
        .trim_start_matches("mut ")
        .trim_start_matches("dyn ");

    if let Some(inner) = name.strip_prefix('[').and_then(|n| n.strip_suffix(']')) {
        let element = split_top_level(inner, ';')[0];
        return format!("{}[]", simple_name(element));
    }
    if let Some(inner) = name.strip_prefix('(').and_then(|n| n.strip_suffix(')')) {
        let elements: Vec<String> = split_top_level(inner, ',')
            .into_iter()
            .filter(|element| !element.trim().is_empty())
            .map(simple_name)
            .collect();
        return format!("({})", elements.join(", "));
    }

    let name = name.split(" + ").next().unwrap_or(name);
    let base = name.split('<').next().unwrap_or(name);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

/// Split `s` on `separator` where it is not nested in brackets.
fn split_top_level(s: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            '<' | '[' | '(' => depth += 1,
            '>' | ']' | ')' => depth = depth.saturating_sub(1),
            c if c == separator && depth == 0 => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

/// Abstraction for a document data store in the cloud.
///
/// Most callers should go through
/// [`RetryableCloudDataStore`](super::RetryableCloudDataStore), which adds
/// retries with backoff to writes.
#[async_trait]
pub trait CloudDataStore: Send + Sync {
    /// Write a document, replacing any document already stored at `doc`.
    ///
    /// Fails with [`StoreError::Contention`] when the store is overloaded and
    /// the write should be retried later.
    async fn store_object(&self, doc: &DocumentRef, value: Value) -> StoreResult<()>;

    /// Read a document. Returns `Ok(None)` when nothing is stored at `doc`.
    async fn retrieve_object(&self, doc: &DocumentRef) -> StoreResult<Option<Value>>;

    /// Find every document in `schema` whose field at `field_path` equals
    /// `value`. `field_path` lists nested field names, e.g.
    /// `["contact", "surname"]`.
    async fn search(&self, schema: &str, field_path: &[&str], value: &str)
    -> StoreResult<Vec<Value>>;

    /// Delete a document. Deleting a missing document is not an error.
    async fn delete_object(&self, doc: &DocumentRef) -> StoreResult<()>;

    /// Names of the top level collections currently present.
    async fn collection_names(&self) -> HashSet<String>;
}

#[async_trait]
impl<S: CloudDataStore + ?Sized> CloudDataStore for Arc<S> {
    async fn store_object(&self, doc: &DocumentRef, value: Value) -> StoreResult<()> {
        (**self).store_object(doc, value).await
    }

    async fn retrieve_object(&self, doc: &DocumentRef) -> StoreResult<Option<Value>> {
        (**self).retrieve_object(doc).await
    }

    async fn search(
        &self,
        schema: &str,
        field_path: &[&str],
        value: &str,
    ) -> StoreResult<Vec<Value>> {
        (**self).search(schema, field_path, value).await
    }

    async fn delete_object(&self, doc: &DocumentRef) -> StoreResult<()> {
        (**self).delete_object(doc).await
    }

    async fn collection_names(&self) -> HashSet<String> {
        (**self).collection_names().await
    }
}

#[async_trait]
impl<S: CloudDataStore + ?Sized> CloudDataStore for Box<S> {
    async fn store_object(&self, doc: &DocumentRef, value: Value) -> StoreResult<()> {
        (**self).store_object(doc, value).await
    }

    async fn retrieve_object(&self, doc: &DocumentRef) -> StoreResult<Option<Value>> {
        (**self).retrieve_object(doc).await
    }

    async fn search(
        &self,
        schema: &str,
        field_path: &[&str],
        value: &str,
    ) -> StoreResult<Vec<Value>> {
        (**self).search(schema, field_path, value).await
    }

    async fn delete_object(&self, doc: &DocumentRef) -> StoreResult<()> {
        (**self).delete_object(doc).await
    }

    async fn collection_names(&self) -> HashSet<String> {
        (**self).collection_names().await
    }
}

/// Squash the results of a key lookup query down to a single document.
///
/// For adapters whose native lookup is a query on the document id.
///
/// # Errors
///
/// Returns [`StoreError::MultipleResults`] if the query found more than one
/// document for what must be a unique key.
pub fn single_result(doc: &DocumentRef, mut documents: Vec<Value>) -> StoreResult<Option<Value>> {
    match documents.len() {
        0 => Ok(None),
        1 => Ok(documents.pop()),
        count => {
            tracing::error!(
                schema = %doc.schema,
                key = %doc.key,
                results = count,
                "Document store found more than one result object"
            );
            Err(StoreError::MultipleResults {
                schema: doc.schema.clone(),
                key: doc.key.clone(),
                count,
            })
        }
    }
}
