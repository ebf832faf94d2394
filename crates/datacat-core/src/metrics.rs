//! Central metrics registry and metric definitions
//!
//! Metrics are registered lazily on first access using once_cell::Lazy.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, HistogramVec,
    IntCounterVec, IntGauge,
};

// ===== API Request Metrics =====

/// Total number of API requests by method, endpoint, and status code
pub static API_REQUEST_COUNT: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "datacat_api_requests_total",
        "Total number of API requests",
        &["method", "endpoint", "status"]
    )
    .expect("Failed to register API request counter")
});

/// API request duration histogram
pub static API_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "datacat_api_request_duration_seconds",
        "API request duration in seconds",
        &["method", "endpoint"],
        // Buckets: 1ms .. 10s; key generation lands in the upper buckets
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to register API request duration histogram")
});

/// Number of requests currently in flight
pub static ACTIVE_CONNECTIONS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "datacat_api_active_connections",
        "Number of active connections to the API server"
    )
    .expect("Failed to register active connections gauge")
});

// ===== Consumer Metrics =====

/// Consumer registrations by outcome (success/failure)
pub static CONSUMER_REGISTRATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "datacat_consumer_registrations_total",
        "Total number of consumer registrations",
        &["outcome"]
    )
    .expect("Failed to register consumer registrations counter")
});

/// Access keys rejected on import, by operation (register/add)
pub static ACCESS_KEY_REJECTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "datacat_access_key_rejections_total",
        "Total number of rejected access key imports",
        &["operation"]
    )
    .expect("Failed to register access key rejections counter")
});

// ===== Query Metrics =====

/// Data queries by outcome (success/restricted/failure)
pub static QUERIES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "datacat_queries_total",
        "Total number of data queries",
        &["outcome"]
    )
    .expect("Failed to register queries counter")
});
