//! In-memory document store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use datacat_core::document::ID_FIELD;
use datacat_core::ids::new_document_id;
use datacat_core::{CollectionName, CoreError, CoreResult, Document, DocumentStore, Filter, Window};

use crate::matcher::DocumentMatcher;

#[derive(Debug, Default)]
struct CollectionData {
    order: Vec<String>,
    documents: HashMap<String, Document>,
}

/// Document store kept in process memory. Documents are listed in insertion order.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    collections: Arc<RwLock<HashMap<String, CollectionData>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn matching(
        &self,
        collection: &CollectionName,
        matcher: &DocumentMatcher,
    ) -> Vec<Document> {
        let collections = self.collections.read();
        let Some(data) = collections.get(collection.as_str()) else {
            return Vec::new();
        };
        data.order
            .iter()
            .filter_map(|id| data.documents.get(id))
            .filter(|document| matcher.matches(document))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find(
        &self,
        collection: &CollectionName,
        filter: &Filter,
        window: Window,
    ) -> CoreResult<Vec<Document>> {
        let matcher = DocumentMatcher::new(filter)?;
        Ok(self
            .matching(collection, &matcher)
            .into_iter()
            .skip(window.offset)
            .take(window.limit)
            .collect())
    }

    async fn count(&self, collection: &CollectionName, filter: &Filter) -> CoreResult<u64> {
        let matcher = DocumentMatcher::new(filter)?;
        Ok(self.matching(collection, &matcher).len() as u64)
    }

    async fn find_by_id(
        &self,
        collection: &CollectionName,
        id: &str,
    ) -> CoreResult<Option<Document>> {
        Ok(self
            .collections
            .read()
            .get(collection.as_str())
            .and_then(|data| data.documents.get(id))
            .cloned())
    }

    async fn insert(
        &self,
        collection: &CollectionName,
        mut document: Document,
    ) -> CoreResult<Document> {
        let id = assign_id(&mut document)?;

        let mut collections = self.collections.write();
        let data = collections.entry(collection.to_string()).or_default();
        if data.documents.contains_key(&id) {
            return Err(CoreError::storage(format!(
                "document `{id}` already exists in `{collection}`"
            )));
        }
        data.order.push(id.clone());
        data.documents.insert(id, document.clone());
        Ok(document)
    }

    async fn update_by_id(
        &self,
        collection: &CollectionName,
        id: &str,
        changes: Document,
    ) -> CoreResult<Option<Document>> {
        let mut collections = self.collections.write();
        let Some(document) = collections
            .get_mut(collection.as_str())
            .and_then(|data| data.documents.get_mut(id))
        else {
            return Ok(None);
        };
        merge(document, changes);
        Ok(Some(document.clone()))
    }

    async fn delete_by_id(
        &self,
        collection: &CollectionName,
        id: &str,
    ) -> CoreResult<Option<Document>> {
        let mut collections = self.collections.write();
        let Some(data) = collections.get_mut(collection.as_str()) else {
            return Ok(None);
        };
        let removed = data.documents.remove(id);
        if removed.is_some() {
            data.order.retain(|existing| existing != id);
        }
        Ok(removed)
    }
}

/// Keeps a caller-supplied `_id`, otherwise assigns a fresh one.
///
/// Numbers and booleans are stored in their text form. Objects and arrays
/// are not identifiers.
pub(crate) fn assign_id(document: &mut Document) -> CoreResult<String> {
    let supplied = match document.get(ID_FIELD) {
        None | Some(Value::Null) => None,
        Some(Value::String(id)) if id.is_empty() => None,
        Some(Value::String(id)) => Some(id.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(other) => {
            return Err(CoreError::InvalidRequestBody(format!(
                "`{ID_FIELD}` must be a string or a number, got {other}"
            )))
        }
    };
    let id = supplied.unwrap_or_else(new_document_id);
    document.insert(ID_FIELD.to_string(), Value::String(id.clone()));
    Ok(id)
}

/// Applies `$set`-style top-level changes. `_id` is never replaced.
pub(crate) fn merge(document: &mut Document, changes: Document) {
    for (key, value) in changes {
        if key != ID_FIELD {
            document.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use datacat_core::document::document_id;

    use super::*;

    fn widgets() -> CollectionName {
        CollectionName::parse("widgets").unwrap()
    }

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_keeps_supplied_one() {
        let store = MemoryDocumentStore::new();

        let generated = store.insert(&widgets(), doc(json!({ "a": 1 }))).await.unwrap();
        let id = document_id(&generated).unwrap().to_string();
        assert!(!id.is_empty());

        let supplied = store
            .insert(&widgets(), doc(json!({ "_id": "w-1", "a": 2 })))
            .await
            .unwrap();
        assert_eq!(document_id(&supplied), Some("w-1"));

        let duplicate = store
            .insert(&widgets(), doc(json!({ "_id": "w-1" })))
            .await
            .unwrap_err();
        assert_eq!(duplicate.code(), "STORAGE_ERROR");

        assert!(store.find_by_id(&widgets(), &id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_insert_stringifies_scalar_ids_and_rejects_structured_ones() {
        let store = MemoryDocumentStore::new();

        let numeric = store
            .insert(&widgets(), doc(json!({ "_id": 5, "a": 1 })))
            .await
            .unwrap();
        assert_eq!(numeric["_id"], "5");
        assert!(store.find_by_id(&widgets(), "5").await.unwrap().is_some());

        let flag = store
            .insert(&widgets(), doc(json!({ "_id": true })))
            .await
            .unwrap();
        assert_eq!(document_id(&flag), Some("true"));

        let generated = store
            .insert(&widgets(), doc(json!({ "_id": null })))
            .await
            .unwrap();
        assert!(!document_id(&generated).unwrap().is_empty());

        for id in [json!({ "nested": 1 }), json!([1, 2])] {
            let err = store
                .insert(&widgets(), doc(json!({ "_id": id })))
                .await
                .unwrap_err();
            assert_eq!(err.code(), "INVALID_REQUEST_BODY");
        }
        assert_eq!(store.count(&widgets(), &Filter::all()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_find_respects_order_and_window() {
        let store = MemoryDocumentStore::new();
        for n in 0..10 {
            store
                .insert(&widgets(), doc(json!({ "n": n })))
                .await
                .unwrap();
        }

        let page = store
            .find(&widgets(), &Filter::all(), Window::new(3, 4))
            .await
            .unwrap();
        let ns: Vec<i64> = page.iter().map(|d| d["n"].as_i64().unwrap()).collect();
        assert_eq!(ns, vec![3, 4, 5, 6]);
        assert_eq!(store.count(&widgets(), &Filter::all()).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_update_merges_and_protects_id() {
        let store = MemoryDocumentStore::new();
        store
            .insert(&widgets(), doc(json!({ "_id": "w-1", "a": 1, "b": 2 })))
            .await
            .unwrap();

        let updated = store
            .update_by_id(&widgets(), "w-1", doc(json!({ "_id": "other", "b": 3, "c": 4 })))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            Value::Object(updated),
            json!({ "_id": "w-1", "a": 1, "b": 3, "c": 4 })
        );
        assert!(store
            .update_by_id(&widgets(), "missing", Document::new())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_delete_returns_removed_document() {
        let store = MemoryDocumentStore::new();
        store
            .insert(&widgets(), doc(json!({ "_id": "w-1" })))
            .await
            .unwrap();

        assert!(store.delete_by_id(&widgets(), "w-1").await.unwrap().is_some());
        assert!(store.delete_by_id(&widgets(), "w-1").await.unwrap().is_none());
        assert_eq!(store.count(&widgets(), &Filter::all()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let store = MemoryDocumentStore::new();
        let gadgets = CollectionName::parse("gadgets").unwrap();
        store
            .insert(&widgets(), doc(json!({ "_id": "same" })))
            .await
            .unwrap();

        assert!(store.find_by_id(&gadgets, "same").await.unwrap().is_none());
        store
            .insert(&gadgets, doc(json!({ "_id": "same" })))
            .await
            .unwrap();
    }
}
