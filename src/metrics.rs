//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // OAuth Metrics
    pub static ref OAUTH_LOGINS_TOTAL: IntCounter = IntCounter::new(
        "makin_oauth_logins_total",
        "Total number of redirects to the Spotify authorize endpoint"
    ).expect("metric can be created");
    pub static ref OAUTH_TOKEN_EXCHANGES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("makin_oauth_token_exchanges_total", "Total number of authorization code exchanges"),
        &["outcome"]
    ).expect("metric can be created");

    // Session Metrics
    pub static ref SESSIONS_ACTIVE: IntGauge = IntGauge::new(
        "makin_sessions_active",
        "Current number of sessions held by the session store"
    ).expect("metric can be created");

    // Database Metrics
    pub static ref DB_CONNECTIONS: IntGaugeVec = IntGaugeVec::new(
        Opts::new("makin_db_connections", "Current number of pooled database connections"),
        &["state"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("makin_errors_total", "Total number of error responses"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
///
/// Must be called once per process.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(OAUTH_LOGINS_TOTAL.clone()))
        .expect("OAUTH_LOGINS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(OAUTH_TOKEN_EXCHANGES_TOTAL.clone()))
        .expect("OAUTH_TOKEN_EXCHANGES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(SESSIONS_ACTIVE.clone()))
        .expect("SESSIONS_ACTIVE can be registered");
    REGISTRY
        .register(Box::new(DB_CONNECTIONS.clone()))
        .expect("DB_CONNECTIONS can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}
