//! Document store persisted through any [`object_store::ObjectStore`].
//!
//! Each document is one JSON object at `collections/<collection>/<id>.json`.
//! Listing sorts by object location, which follows the time-ordered ids
//! assigned on insert.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutMode};
use tracing::{debug, warn};

use datacat_core::{CollectionName, CoreError, CoreResult, Document, DocumentStore, Filter, Window};

use crate::error::storage_error;
use crate::matcher::DocumentMatcher;
use crate::memory::{assign_id, merge};

const COLLECTIONS_ROOT: &str = "collections";
const DOCUMENT_SUFFIX: &str = ".json";

/// Object-store backed document store.
#[derive(Clone)]
pub struct ObjectDocumentStore {
    object_store: Arc<dyn ObjectStore>,
}

impl ObjectDocumentStore {
    pub fn new(object_store: Arc<dyn ObjectStore>) -> Self {
        Self { object_store }
    }

    fn collection_path(collection: &CollectionName) -> ObjectPath {
        ObjectPath::from_iter([COLLECTIONS_ROOT, collection.as_str()])
    }

    fn document_path(collection: &CollectionName, id: &str) -> ObjectPath {
        let file = format!("{id}{DOCUMENT_SUFFIX}");
        ObjectPath::from_iter([COLLECTIONS_ROOT, collection.as_str(), file.as_str()])
    }

    async fn read(&self, path: &ObjectPath) -> CoreResult<Option<Document>> {
        let result = match self.object_store.get(path).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(storage_error("read document", e)),
        };
        let bytes = result
            .bytes()
            .await
            .map_err(|e| storage_error("read document bytes", e))?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn write(&self, path: &ObjectPath, document: &Document) -> CoreResult<()> {
        let payload = Bytes::from(serde_json::to_vec(document)?);
        self.object_store
            .put(path, payload.into())
            .await
            .map_err(|e| storage_error("write document", e))?;
        Ok(())
    }

    /// Every document of `collection` that satisfies `matcher`, in listing order.
    async fn matching(
        &self,
        collection: &CollectionName,
        matcher: &DocumentMatcher,
    ) -> CoreResult<Vec<Document>> {
        let prefix = Self::collection_path(collection);
        let mut objects = self
            .object_store
            .list(Some(&prefix))
            .try_collect::<Vec<_>>()
            .await
            .map_err(|e| storage_error("list documents", e))?;
        objects.sort_by(|a, b| a.location.cmp(&b.location));

        let mut documents = Vec::new();
        for meta in objects {
            if !meta.location.as_ref().ends_with(DOCUMENT_SUFFIX) {
                continue;
            }
            // A document may be deleted between listing and reading.
            match self.read(&meta.location).await? {
                Some(document) if matcher.matches(&document) => documents.push(document),
                Some(_) => {}
                None => warn!(location = %meta.location, "Listed document vanished before read"),
            }
        }
        Ok(documents)
    }
}

#[async_trait]
impl DocumentStore for ObjectDocumentStore {
    async fn find(
        &self,
        collection: &CollectionName,
        filter: &Filter,
        window: Window,
    ) -> CoreResult<Vec<Document>> {
        let matcher = DocumentMatcher::new(filter)?;
        let documents = self.matching(collection, &matcher).await?;
        Ok(documents
            .into_iter()
            .skip(window.offset)
            .take(window.limit)
            .collect())
    }

    async fn count(&self, collection: &CollectionName, filter: &Filter) -> CoreResult<u64> {
        let matcher = DocumentMatcher::new(filter)?;
        Ok(self.matching(collection, &matcher).await?.len() as u64)
    }

    async fn find_by_id(
        &self,
        collection: &CollectionName,
        id: &str,
    ) -> CoreResult<Option<Document>> {
        self.read(&Self::document_path(collection, id)).await
    }

    async fn insert(
        &self,
        collection: &CollectionName,
        mut document: Document,
    ) -> CoreResult<Document> {
        let id = assign_id(&mut document)?;
        let path = Self::document_path(collection, &id);

        let payload = Bytes::from(serde_json::to_vec(&document)?);
        match self
            .object_store
            .put_opts(&path, payload.into(), PutMode::Create.into())
            .await
        {
            Ok(_) => {}
            Err(object_store::Error::AlreadyExists { .. }) => {
                return Err(CoreError::storage(format!(
                    "document `{id}` already exists in `{collection}`"
                )));
            }
            Err(e) => return Err(storage_error("insert document", e)),
        }

        debug!(collection = %collection, id = %id, "Inserted document");
        Ok(document)
    }

    async fn update_by_id(
        &self,
        collection: &CollectionName,
        id: &str,
        changes: Document,
    ) -> CoreResult<Option<Document>> {
        let path = Self::document_path(collection, id);
        let Some(mut document) = self.read(&path).await? else {
            return Ok(None);
        };
        merge(&mut document, changes);
        self.write(&path, &document).await?;

        debug!(collection = %collection, id = %id, "Updated document");
        Ok(Some(document))
    }

    async fn delete_by_id(
        &self,
        collection: &CollectionName,
        id: &str,
    ) -> CoreResult<Option<Document>> {
        let path = Self::document_path(collection, id);
        let Some(document) = self.read(&path).await? else {
            return Ok(None);
        };
        match self.object_store.delete(&path).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => {}
            Err(e) => return Err(storage_error("delete document", e)),
        }

        debug!(collection = %collection, id = %id, "Deleted document");
        Ok(Some(document))
    }
}
