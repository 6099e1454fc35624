//! Metrics collection and exposition.
//!
//! # Metrics
//! - `tilegate_requests_total` (counter): tile and overlay requests by status
//! - `tilegate_route_cache_hits_total` (counter): route cache hits
//! - `tilegate_route_cache_misses_total` (counter): route cache misses
//! - `tilegate_route_cache_evictions_total` (counter): LRU evictions
//! - `tilegate_overlays_mounted_total` (counter): inspection overlays mounted

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter and register metric descriptions.
///
/// Failure to bind the exporter is logged but never fatal; the gateway
/// keeps serving without metrics.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);
    if let Err(error) = builder.install() {
        tracing::error!(%error, "failed to install metrics exporter");
        return;
    }

    metrics::describe_counter!(
        "tilegate_requests_total",
        "Tile and overlay requests by response status"
    );
    metrics::describe_counter!("tilegate_route_cache_hits_total", "Route cache hits");
    metrics::describe_counter!("tilegate_route_cache_misses_total", "Route cache misses");
    metrics::describe_counter!(
        "tilegate_route_cache_evictions_total",
        "Route cache LRU evictions"
    );
    metrics::describe_counter!(
        "tilegate_overlays_mounted_total",
        "Inspection overlays mounted at load time"
    );

    tracing::info!(address = %addr, "metrics exporter listening");
}

pub fn record_request(status: u16) {
    metrics::counter!("tilegate_requests_total", "status" => status.to_string()).increment(1);
}

pub fn record_route_cache_hit() {
    metrics::counter!("tilegate_route_cache_hits_total").increment(1);
}

pub fn record_route_cache_miss() {
    metrics::counter!("tilegate_route_cache_misses_total").increment(1);
}

pub fn record_route_cache_eviction() {
    metrics::counter!("tilegate_route_cache_evictions_total").increment(1);
}

pub fn record_overlay_mounted() {
    metrics::counter!("tilegate_overlays_mounted_total").increment(1);
}
