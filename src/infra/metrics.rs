//! Prometheus recorder and metric descriptions.

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

pub const HTTP_REQUESTS_TOTAL: &str = "realstack_http_requests_total";
pub const HTTP_REQUEST_DURATION: &str = "realstack_http_request_duration_seconds";
pub const SOLANA_RPC_DURATION: &str = "realstack_solana_rpc_duration_seconds";
pub const SOLANA_RPC_FAILURES: &str = "realstack_solana_rpc_failures_total";
pub const RATE_LIMITED_TOTAL: &str = "realstack_rate_limited_total";
pub const RATE_LIMITER_IP_CACHE_SIZE: &str = "realstack_rate_limiter_ip_cache_size";
pub const RATE_LIMITER_EVICTIONS: &str = "realstack_rate_limiter_evictions_total";
pub const ASSET_TRANSITIONS_TOTAL: &str = "realstack_asset_transitions_total";

const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Installs the global Prometheus recorder. Call once per process.
pub fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            LATENCY_BUCKETS,
        )?
        .install_recorder()?;
    describe_metrics();
    Ok(handle)
}

pub fn describe_metrics() {
    describe_counter!(HTTP_REQUESTS_TOTAL, "HTTP requests by method, route and status");
    describe_histogram!(
        HTTP_REQUEST_DURATION,
        Unit::Seconds,
        "HTTP request latency by method and route"
    );
    describe_histogram!(
        SOLANA_RPC_DURATION,
        Unit::Seconds,
        "Latency of Solana RPC submissions by operation"
    );
    describe_counter!(SOLANA_RPC_FAILURES, "Failed Solana RPC submissions by operation");
    describe_counter!(RATE_LIMITED_TOTAL, "Requests rejected by the rate limiter");
    describe_gauge!(
        RATE_LIMITER_IP_CACHE_SIZE,
        "Client addresses tracked by the rate limiter"
    );
    describe_counter!(
        RATE_LIMITER_EVICTIONS,
        "LRU evictions in the rate limiter address cache"
    );
    describe_counter!(ASSET_TRANSITIONS_TOTAL, "Asset lifecycle transitions by target status");
}
