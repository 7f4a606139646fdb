//! Prometheus metrics for the rewards server.
//!
//! Metrics are exposed in Prometheus text format on a separate listener
//! configured by `METRICS_BIND`.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use tr_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", "/api/v1/games/complete", 200);
//! metrics::settlements_total("spin", true);
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use ton_rewards::cache::CacheStats;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Ledger Metrics
// ============================================================================

/// Count a settlement attempt by game type and outcome.
pub fn settlements_total(game_type: &str, success: bool) {
    metrics::counter!("settlements_total",
        "game_type" => game_type.to_string(),
        "success" => success.to_string()
    )
    .increment(1);
}

/// Count a bonus claim attempt by outcome.
pub fn bonus_claims_total(success: bool) {
    metrics::counter!("bonus_claims_total",
        "success" => success.to_string()
    )
    .increment(1);
}

// ============================================================================
// Cache Metrics
// ============================================================================

/// Publish cumulative hit/miss counts of a named cache.
pub fn cache_stats(cache: &'static str, stats: CacheStats) {
    metrics::counter!("cache_hits_total", "cache" => cache).absolute(stats.hits);
    metrics::counter!("cache_misses_total", "cache" => cache).absolute(stats.misses);
}
