//! Filtered queries, document passthrough and the dataset catalog.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use datacat_core::document::ID_FIELD;
use datacat_core::metrics::QUERIES;
use datacat_core::{CollectionName, CoreError, CoreResult, Document, DocumentStore, Filter};
use datacat_query::{paginate, FilterCompiler, PageRequest, Pagination};

use crate::config::CatalogConfig;

/// Response of a filtered collection query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub results: Vec<Document>,
    pub pagination: Pagination,
}

/// Catalog header plus the datasets of one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogMetadata {
    #[serde(rename = "@type")]
    pub kind: String,
    pub title: String,
    pub description: String,
    pub dataset: Vec<Value>,
}

/// Response of a catalog listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogResponse {
    pub metadata: CatalogMetadata,
    pub pagination: Pagination,
}

/// Generic data access over caller-named collections.
///
/// Every operation that takes a collection name passes it through the
/// namespace guard before the store is touched.
#[derive(Clone)]
pub struct DataService {
    store: Arc<dyn DocumentStore>,
    compiler: FilterCompiler,
    catalog: CatalogConfig,
    catalog_collection: CollectionName,
}

impl DataService {
    /// Creates the service. Fails when the catalog collection is not reserved.
    pub fn new(store: Arc<dyn DocumentStore>, catalog: CatalogConfig) -> CoreResult<Self> {
        let catalog_collection = CollectionName::system(&catalog.collection)?;
        Ok(Self {
            store,
            compiler: FilterCompiler::new(),
            catalog,
            catalog_collection,
        })
    }

    /// Runs a filtered, paginated query against `collection`.
    pub async fn run_query<I, K, V>(&self, collection: &str, params: I) -> CoreResult<QueryResponse>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let result = self.execute_query(collection, params).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(CoreError::RestrictedCollection(_)) => {
                tracing::info!(collection, "Restricted query");
                "restricted"
            }
            Err(_) => "failure",
        };
        QUERIES.with_label_values(&[outcome]).inc();
        result
    }

    async fn execute_query<I, K, V>(&self, collection: &str, params: I) -> CoreResult<QueryResponse>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let query = self.compiler.compile_query(collection, params)?;

        tracing::info!(collection = %query.collection, "Run query");
        let page = paginate(
            self.store.as_ref(),
            &query.collection,
            &query.filter,
            query.page,
        )
        .await?;

        Ok(QueryResponse {
            results: page.items,
            pagination: page.pagination,
        })
    }

    /// Retrieves one document.
    pub async fn get_document(&self, collection: &str, id: &str) -> CoreResult<Document> {
        let collection = CollectionName::parse(collection)?;
        tracing::info!(collection = %collection, id, "Retrieve document");

        self.store
            .find_by_id(&collection, id)
            .await?
            .ok_or_else(|| CoreError::InvalidDocumentId(id.to_string()))
    }

    /// Stores a new document. When `id` is given it becomes the document's `_id`.
    pub async fn register_document(
        &self,
        collection: &str,
        id: Option<&str>,
        body: Value,
    ) -> CoreResult<Document> {
        let collection = CollectionName::parse(collection)?;
        tracing::info!(collection = %collection, "Register document");

        let mut document = non_empty_object(body)?;
        if let Some(id) = id {
            document.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        }

        let stored = self.store.insert(&collection, document).await?;
        tracing::debug!(collection = %collection, document = ?stored, "Document registered");
        Ok(stored)
    }

    /// Merges `body` into an existing document.
    pub async fn update_document(
        &self,
        collection: &str,
        id: &str,
        body: Value,
    ) -> CoreResult<Document> {
        let collection = CollectionName::parse(collection)?;
        tracing::info!(collection = %collection, id, "Update document");

        let changes = non_empty_object(body)?;
        self.store
            .update_by_id(&collection, id, changes)
            .await?
            .ok_or_else(|| CoreError::InvalidDocumentId(id.to_string()))
    }

    /// Removes a document and returns it.
    pub async fn delete_document(&self, collection: &str, id: &str) -> CoreResult<Document> {
        let collection = CollectionName::parse(collection)?;
        tracing::info!(collection = %collection, id, "Delete document");

        self.store
            .delete_by_id(&collection, id)
            .await?
            .ok_or_else(|| CoreError::InvalidDocumentId(id.to_string()))
    }

    /// Lists the datasets of the catalog collection as DCAT entries.
    pub async fn catalog(&self, page: PageRequest) -> CoreResult<CatalogResponse> {
        tracing::info!("Retrieve catalog metadata");

        let page = paginate(
            self.store.as_ref(),
            &self.catalog_collection,
            &Filter::all(),
            page,
        )
        .await?;

        Ok(CatalogResponse {
            metadata: CatalogMetadata {
                kind: "dcat:Catalog".to_string(),
                title: self.catalog.title.clone(),
                description: self.catalog.description.clone(),
                dataset: page.items.iter().map(to_dcat).collect(),
            },
            pagination: page.pagination,
        })
    }
}

fn non_empty_object(body: Value) -> CoreResult<Document> {
    match body {
        Value::Object(document) if !document.is_empty() => Ok(document),
        _ => Err(CoreError::NoDataProvided),
    }
}

/// Renders a stored dataset description as a `dcat:Dataset` entry.
///
/// Dataset records keep their descriptive fields under `metadata` and the
/// backing collection under `data.storage.collection`.
fn to_dcat(dataset: &Document) -> Value {
    let dataset = Value::Object(dataset.clone());
    let field = |name: &str| {
        dataset
            .pointer(&format!("/metadata/{name}"))
            .filter(|value| !value.is_null())
            .cloned()
    };
    // Keeps only the attributes the record actually defines.
    let object = |kind: &str, attributes: &[(&str, &str)]| {
        let mut object = Map::new();
        object.insert("@type".into(), kind.into());
        for (key, name) in attributes {
            if let Some(value) = field(name) {
                object.insert((*key).into(), value);
            }
        }
        Value::Object(object)
    };
    let collection = dataset
        .pointer("/data/storage/collection")
        .and_then(Value::as_str)
        .unwrap_or_default();

    let mut entry = Map::new();
    entry.insert("@type".into(), "dcat:Dataset".into());
    for name in [
        "title",
        "description",
        "keyword",
        "issued",
        "modified",
        "accessLevel",
        "language",
        "license",
    ] {
        if let Some(value) = field(name) {
            entry.insert(name.into(), value);
        }
    }
    entry.insert("identifier".into(), collection.into());
    entry.insert(
        "publisher".into(),
        object("org:Organization", &[("name", "organization")]),
    );
    entry.insert(
        "contactPoint".into(),
        object(
            "vcard:Contact",
            &[("fn", "contactName"), ("hasEmail", "contactEmail")],
        ),
    );
    entry.insert(
        "distribution".into(),
        json!([{
            "@type": "dcat:Distribution",
            "mediaType": "application/json",
            "accessURL": format!("/v1/{collection}"),
        }]),
    );
    Value::Object(entry)
}

#[cfg(test)]
mod tests {
    use datacat_storage::MemoryDocumentStore;

    use super::*;

    fn service() -> (Arc<MemoryDocumentStore>, DataService) {
        let store = Arc::new(MemoryDocumentStore::new());
        let service = DataService::new(store.clone(), CatalogConfig::default()).unwrap();
        (store, service)
    }

    async fn seed(service: &DataService) {
        for (name, price) in [("bolt", 3), ("nut", 1), ("gear", 12), ("axle", 25)] {
            service
                .register_document("parts", None, json!({ "name": name, "price": price }))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_run_query_envelope() {
        let (_, service) = service();
        seed(&service).await;

        let response = service
            .run_query("parts", [("price", "[gte:3]"), ("pageSize", "2")])
            .await
            .unwrap();

        assert_eq!(response.pagination.total, 3);
        assert_eq!(response.pagination.page, 1);
        assert_eq!(response.pagination.page_size, 2);
        assert_eq!(response.results.len(), 2);
        assert_eq!(response.results[0]["name"], "bolt");
    }

    #[tokio::test]
    async fn test_restricted_collections_never_reach_the_store() {
        let (_, service) = service();
        for collection in ["sys.consumers", "system.users"] {
            let err = service
                .run_query(collection, Vec::<(String, String)>::new())
                .await
                .unwrap_err();
            assert_eq!(err.code(), "RESTRICTED_DATA_COLLECTION");

            let err = service.get_document(collection, "x").await.unwrap_err();
            assert_eq!(err.code(), "RESTRICTED_DATA_COLLECTION");

            let err = service
                .register_document(collection, None, json!({ "a": 1 }))
                .await
                .unwrap_err();
            assert_eq!(err.code(), "RESTRICTED_DATA_COLLECTION");

            let err = service.delete_document(collection, "x").await.unwrap_err();
            assert_eq!(err.code(), "RESTRICTED_DATA_COLLECTION");
        }
    }

    #[tokio::test]
    async fn test_document_lifecycle() {
        let (_, service) = service();

        let stored = service
            .register_document("parts", Some("p-1"), json!({ "name": "bolt" }))
            .await
            .unwrap();
        assert_eq!(stored["_id"], "p-1");

        let updated = service
            .update_document("parts", "p-1", json!({ "price": 4 }))
            .await
            .unwrap();
        assert_eq!(updated["name"], "bolt");
        assert_eq!(updated["price"], 4);

        assert_eq!(service.get_document("parts", "p-1").await.unwrap(), updated);
        service.delete_document("parts", "p-1").await.unwrap();

        let err = service.get_document("parts", "p-1").await.unwrap_err();
        assert_eq!(err.code(), "INVALID_DOCUMENT_ID");
        let err = service
            .update_document("parts", "p-1", json!({ "price": 5 }))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_DOCUMENT_ID");
        let err = service.delete_document("parts", "p-1").await.unwrap_err();
        assert_eq!(err.code(), "INVALID_DOCUMENT_ID");
    }

    #[tokio::test]
    async fn test_empty_bodies_are_rejected() {
        let (_, service) = service();
        for body in [json!({}), json!([1, 2]), json!("text"), Value::Null] {
            let err = service
                .register_document("parts", None, body.clone())
                .await
                .unwrap_err();
            assert_eq!(err.code(), "NO_DATA_PROVIDED");

            let err = service
                .update_document("parts", "p-1", body)
                .await
                .unwrap_err();
            assert_eq!(err.code(), "NO_DATA_PROVIDED");
        }
    }

    #[tokio::test]
    async fn test_catalog_renders_dcat_entries() {
        let (store, service) = service();
        let datasets = CollectionName::system("sys.datasets").unwrap();
        store
            .insert(
                &datasets,
                json!({
                    "metadata": {
                        "title": "Parts",
                        "description": "Spare parts",
                        "keyword": ["hardware"],
                        "license": "CC-BY",
                        "organization": "Acme",
                        "contactName": "Jo",
                        "contactEmail": "jo@example.com"
                    },
                    "data": { "storage": { "collection": "parts" } }
                })
                .as_object()
                .cloned()
                .unwrap(),
            )
            .await
            .unwrap();

        let response = service.catalog(PageRequest::default()).await.unwrap();
        assert_eq!(response.pagination.total, 1);
        assert_eq!(response.metadata.kind, "dcat:Catalog");
        assert_eq!(response.metadata.title, "Data Catalog");

        let entry = &response.metadata.dataset[0];
        assert_eq!(entry["@type"], "dcat:Dataset");
        assert_eq!(entry["identifier"], "parts");
        assert_eq!(entry["keyword"], json!(["hardware"]));
        assert_eq!(entry["publisher"]["name"], "Acme");
        assert_eq!(entry["contactPoint"]["hasEmail"], "jo@example.com");
        assert_eq!(entry["distribution"][0]["accessURL"], "/v1/parts");
        assert!(entry.get("issued").is_none());
    }

    #[tokio::test]
    async fn test_catalog_omits_undefined_contact_fields() {
        let (store, service) = service();
        let datasets = CollectionName::system("sys.datasets").unwrap();
        store
            .insert(
                &datasets,
                json!({
                    "metadata": { "title": "Bare", "contactName": "Jo", "contactEmail": null },
                    "data": { "storage": { "collection": "bare" } }
                })
                .as_object()
                .cloned()
                .unwrap(),
            )
            .await
            .unwrap();

        let response = service.catalog(PageRequest::default()).await.unwrap();
        let entry = &response.metadata.dataset[0];
        assert_eq!(entry["publisher"], json!({ "@type": "org:Organization" }));
        assert_eq!(
            entry["contactPoint"],
            json!({ "@type": "vcard:Contact", "fn": "Jo" })
        );
        assert!(entry.get("description").is_none());
    }

    #[test]
    fn test_catalog_collection_must_be_reserved() {
        let catalog = CatalogConfig {
            collection: "datasets".to_string(),
            ..CatalogConfig::default()
        };
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        assert!(DataService::new(store, catalog).is_err());
    }
}
