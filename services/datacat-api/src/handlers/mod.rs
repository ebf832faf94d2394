//! HTTP handlers for REST API endpoints

pub mod catalog;
pub mod consumers;
pub mod data;
pub mod metrics;

pub use catalog::catalog_info;
pub use consumers::{
    add_consumer_key, delete_consumer_key, get_consumer, register_consumer, AddAccessKeyRequest,
    RegisterConsumerRequest,
};
pub use data::{
    delete_document, get_document, register_document, register_document_with_id, run_query,
    update_document,
};
pub use metrics::metrics_handler;
