//! Prometheus metrics for the resolver service
//!
//! NOTE: user ids never appear in metric labels to prevent
//! high-cardinality explosion that can crash Prometheus.

use lazy_static::lazy_static;
use prometheus::{
    HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
};

lazy_static! {
    /// Global metrics registry
    pub static ref METRICS_REGISTRY: Registry = Registry::new();

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "voicefit_http_request_duration_seconds",
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["method", "endpoint", "status"]
    ).unwrap();

    /// Total HTTP requests
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("voicefit_http_requests_total", "Total HTTP requests"),
        &["method", "endpoint", "status"]
    ).unwrap();

    /// Resolutions by terminal stage (exact/fuzzy/semantic/created/none)
    pub static ref RESOLVE_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("voicefit_resolve_total", "Total resolve operations by stage"),
        &["stage"]
    ).unwrap();

    /// Creation races where a concurrent request won
    pub static ref ENTITY_CREATE_RACES_TOTAL: IntCounter = IntCounter::new(
        "voicefit_entity_create_races_total",
        "Entity creations that lost a same-name race"
    ).unwrap();

    /// AI reranks that timed out or returned nothing usable
    pub static ref RERANK_FALLBACKS_TOTAL: IntCounter = IntCounter::new(
        "voicefit_rerank_fallbacks_total",
        "Rerank attempts that fell back to the deterministic order"
    ).unwrap();

    /// Context lookups that degraded to unknown, by dimension
    pub static ref CONTEXT_PARTIAL_FAILURES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "voicefit_context_partial_failures_total",
            "Context lookups that failed or timed out"
        ),
        &["dimension"]
    ).unwrap();
}

/// Register all metrics with the global registry
pub fn register_metrics() -> Result<(), prometheus::Error> {
    METRICS_REGISTRY.register(Box::new(HTTP_REQUEST_DURATION.clone()))?;
    METRICS_REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()))?;
    METRICS_REGISTRY.register(Box::new(RESOLVE_TOTAL.clone()))?;
    METRICS_REGISTRY.register(Box::new(ENTITY_CREATE_RACES_TOTAL.clone()))?;
    METRICS_REGISTRY.register(Box::new(RERANK_FALLBACKS_TOTAL.clone()))?;
    METRICS_REGISTRY.register(Box::new(CONTEXT_PARTIAL_FAILURES_TOTAL.clone()))?;
    Ok(())
}

/// Render the registry in Prometheus text exposition format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut buffer) {
        tracing::error!("failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
