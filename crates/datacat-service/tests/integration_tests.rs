//! End-to-End Integration Tests for the datacat service layer
//!
//! These tests wire the registry and data service onto one document store,
//! the way the API server does, and check that they stay isolated.

use std::sync::Arc;

use datacat_core::{CollectionName, DocumentStore, Filter, KeyService};
use datacat_query::PageRequest;
use datacat_service::{
    open_document_store, CatalogConfig, ConsumerRegistry, DataService, StorageBackendKind,
    StorageConfig,
};
use datacat_storage::DocumentRegistryStore;
use serde_json::{json, Map};

struct Services {
    store: Arc<dyn DocumentStore>,
    registry: ConsumerRegistry,
    data: DataService,
}

fn setup_services(store: Arc<dyn DocumentStore>) -> Services {
    let records = Arc::new(DocumentRegistryStore::new(store.clone()));
    let registry = ConsumerRegistry::new(records.clone(), records, KeyService::new(512));
    let data = DataService::new(store.clone(), CatalogConfig::default()).unwrap();
    Services {
        store,
        registry,
        data,
    }
}

#[tokio::test]
async fn test_registry_records_are_hidden_from_data_api() {
    let services = setup_services(open_document_store(&StorageConfig::default()).unwrap());

    let consumer = services.registry.register(Map::new(), None).await.unwrap();
    let consumer_id = consumer.id.to_string();

    assert_eq!(
        services
            .store
            .count(&CollectionName::consumers(), &Filter::all())
            .await
            .unwrap(),
        1
    );

    let err = services
        .data
        .get_document("sys.consumers", &consumer_id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "RESTRICTED_DATA_COLLECTION");

    let err = services
        .data
        .run_query("sys.keys", [("fingerprint", "[regex:.*]")])
        .await
        .unwrap_err();
    assert_eq!(err.code(), "RESTRICTED_DATA_COLLECTION");
}

#[tokio::test]
async fn test_consumers_survive_restart_on_local_backend() {
    let dir = tempfile::tempdir().unwrap();
    let config = StorageConfig {
        backend: StorageBackendKind::Local,
        path: dir.path().to_path_buf(),
    };

    let (consumer_id, api_key) = {
        let services = setup_services(open_document_store(&config).unwrap());
        let consumer = services
            .registry
            .register(json!({ "team": "x" }).as_object().cloned().unwrap(), None)
            .await
            .unwrap();
        (consumer.id.to_string(), consumer.api_key)
    };

    let services = setup_services(open_document_store(&config).unwrap());
    let info = services.registry.get_info(&consumer_id).await.unwrap();
    assert_eq!(info.api_key, api_key);
    assert_eq!(info.details["team"], "x");
}

#[tokio::test]
async fn test_catalog_and_data_queries_share_the_store() {
    let services = setup_services(open_document_store(&StorageConfig::default()).unwrap());
    let datasets = CollectionName::system("sys.datasets").unwrap();

    services
        .store
        .insert(
            &datasets,
            json!({
                "metadata": { "title": "Sensors" },
                "data": { "storage": { "collection": "sensors" } }
            })
            .as_object()
            .cloned()
            .unwrap(),
        )
        .await
        .unwrap();
    for reading in 0..3 {
        services
            .data
            .register_document(
                "sensors",
                None,
                json!({ "reading": reading, "at": format!("2024-0{}-15", reading + 1) }),
            )
            .await
            .unwrap();
    }

    let catalog = services.data.catalog(PageRequest::default()).await.unwrap();
    assert_eq!(catalog.metadata.dataset.len(), 1);
    assert_eq!(
        catalog.metadata.dataset[0]["distribution"][0]["accessURL"],
        "/v1/sensors"
    );

    let response = services
        .data
        .run_query("sensors", [("at", "[range:2024-02-01|2024-12-31]")])
        .await
        .unwrap();
    assert_eq!(response.pagination.total, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_key_changes_keep_every_key_on_local_backend() {
    let dir = tempfile::tempdir().unwrap();
    let config = StorageConfig {
        backend: StorageBackendKind::Local,
        path: dir.path().to_path_buf(),
    };
    let services = setup_services(open_document_store(&config).unwrap());
    let consumer = services.registry.register(Map::new(), None).await.unwrap();
    let consumer_id = consumer.id.to_string();

    let key_service = KeyService::new(512);
    let texts: Vec<String> = (0..16)
        .map(|_| key_service.generate().unwrap().public)
        .collect();

    let handles: Vec<_> = texts
        .into_iter()
        .map(|text| {
            let registry = services.registry.clone();
            let consumer_id = consumer_id.clone();
            tokio::spawn(async move { registry.add_access_key(&consumer_id, Some(&text)).await })
        })
        .collect();

    let mut added = Vec::new();
    for handle in handles {
        added.push(handle.await.unwrap().unwrap().id.unwrap());
    }

    let info = services.registry.get_info(&consumer_id).await.unwrap();
    assert_eq!(info.access_keys.len(), 16);

    // Concurrent removals of half the keys leave exactly the other half.
    let handles: Vec<_> = added[..8]
        .iter()
        .map(|key_id| {
            let registry = services.registry.clone();
            let consumer_id = consumer_id.clone();
            let key_id = key_id.to_string();
            tokio::spawn(async move { registry.remove_access_key(&consumer_id, &key_id).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let info = services.registry.get_info(&consumer_id).await.unwrap();
    assert_eq!(info.access_keys.len(), 8);
    assert_eq!(
        services
            .store
            .count(&CollectionName::keys(), &Filter::all())
            .await
            .unwrap(),
        9
    );
}
