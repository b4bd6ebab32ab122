//! Metrics collection and exposition.
//!
//! # Metrics
//! - `graph_requests_total` (counter): requests by route and canonical domain
//! - `graph_request_failures_total` (counter): failed requests by error kind
//! - `graph_stage_duration_seconds` (histogram): `fetch`, `render`, `total`
//! - `graph_upstream_calls_total` (counter): content API calls by outcome
//! - `graph_upstream_call_seconds` (histogram): latency of one content API call
//! - `graph_upstream_calls_per_request` (histogram): pages needed to find a spec
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until a
//!   recorder is installed, so tests never need an exporter
//! - Prometheus exposition runs on its own listener, separate from traffic

use std::net::SocketAddr;
use std::sync::Once;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::pipeline::ErrorKind;

static DESCRIBE: Once = Once::new();

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    describe_metrics();
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

fn describe_metrics() {
    DESCRIBE.call_once(|| {
        describe_counter!("graph_requests_total", Unit::Count, "Graph requests received.");
        describe_counter!(
            "graph_request_failures_total",
            Unit::Count,
            "Graph requests that failed, by error kind."
        );
        describe_histogram!(
            "graph_stage_duration_seconds",
            Unit::Seconds,
            "Duration of pipeline stages."
        );
        describe_counter!("graph_upstream_calls_total", Unit::Count, "Content API calls.");
        describe_histogram!(
            "graph_upstream_call_seconds",
            Unit::Seconds,
            "Latency of a single content API call."
        );
        describe_histogram!(
            "graph_upstream_calls_per_request",
            Unit::Count,
            "Content API calls needed to locate one spec."
        );
    });
}

pub fn record_request(route: &'static str, domain: &str) {
    counter!("graph_requests_total", "route" => route, "domain" => domain.to_string()).increment(1);
}

pub fn record_failure(kind: ErrorKind) {
    counter!("graph_request_failures_total", "kind" => kind.as_str()).increment(1);
}

pub fn record_stage(stage: &'static str, started: Instant) {
    histogram!("graph_stage_duration_seconds", "stage" => stage).record(started.elapsed().as_secs_f64());
}

pub fn record_upstream_call(outcome: &'static str, started: Instant) {
    counter!("graph_upstream_calls_total", "outcome" => outcome).increment(1);
    histogram!("graph_upstream_call_seconds").record(started.elapsed().as_secs_f64());
}

pub fn record_upstream_calls_per_request(calls: u32) {
    histogram!("graph_upstream_calls_per_request").record(f64::from(calls));
}
