//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Follow-graph Metrics
    pub static ref GRAPH_OPERATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("linkup_graph_operations_total", "Follow-graph operations by outcome"),
        &["operation", "outcome"]
    ).expect("metric can be created");
    pub static ref CASCADE_PEERS_PRUNED_TOTAL: IntCounter = IntCounter::new(
        "linkup_cascade_peers_pruned_total",
        "Peer references pruned while deleting accounts"
    ).expect("metric can be created");
    pub static ref CASCADE_STALE_REFERENCES_TOTAL: IntCounter = IntCounter::new(
        "linkup_cascade_stale_references_total",
        "References to already-deleted accounts skipped during deletion"
    ).expect("metric can be created");

    // Account Metrics
    pub static ref ACCOUNTS_REGISTERED_TOTAL: IntCounter = IntCounter::new(
        "linkup_accounts_registered_total",
        "Total number of registered accounts"
    ).expect("metric can be created");
    pub static ref LOGINS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("linkup_logins_total", "Login attempts by outcome"),
        &["outcome"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("linkup_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

static INIT: Once = Once::new();

/// Initialize metrics registry.
///
/// Safe to call more than once; only the first call registers.
pub fn init_metrics() {
    INIT.call_once(register_all);
}

fn register_all() {
    REGISTRY
        .register(Box::new(GRAPH_OPERATIONS_TOTAL.clone()))
        .expect("GRAPH_OPERATIONS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(CASCADE_PEERS_PRUNED_TOTAL.clone()))
        .expect("CASCADE_PEERS_PRUNED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(CASCADE_STALE_REFERENCES_TOTAL.clone()))
        .expect("CASCADE_STALE_REFERENCES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ACCOUNTS_REGISTERED_TOTAL.clone()))
        .expect("ACCOUNTS_REGISTERED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(LOGINS_TOTAL.clone()))
        .expect("LOGINS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}

/// Record the outcome of a follow-graph operation.
pub fn record_graph_outcome(operation: &str, outcome: &str) {
    GRAPH_OPERATIONS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
}
