//! # Prometheus Metrics
//!
//! HTTP-level metrics (request counts, latency, errors) are recorded in
//! middleware. Signing and verification outcomes are pushed by the
//! handlers. The catalog size gauge is refreshed on each `/metrics` scrape.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use prometheus::core::Collector;
use prometheus::{
    Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,

    // -- HTTP middleware metrics --
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,

    // -- Domain metrics --
    uploads_total: IntCounterVec,
    verifications_total: IntCounterVec,
    documents_total: GaugeVec,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .field("errors", &self.errors())
            .finish()
    }
}

impl ApiMetrics {
    /// Create a new metrics instance with a fresh Prometheus registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("docseal_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )?;
        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "docseal_http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
            ]),
            &["method", "path"],
        )?;
        let http_errors_total = IntCounterVec::new(
            Opts::new("docseal_http_errors_total", "Total HTTP errors (4xx and 5xx)"),
            &["method", "path", "status"],
        )?;
        let uploads_total = IntCounterVec::new(
            Opts::new("docseal_uploads_total", "Processed uploads by outcome"),
            &["outcome"],
        )?;
        let verifications_total = IntCounterVec::new(
            Opts::new("docseal_verifications_total", "Verification lookups by result"),
            &["result"],
        )?;
        let documents_total = GaugeVec::new(
            Opts::new("docseal_documents_total", "Cataloged documents by visibility"),
            &["visibility"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(http_errors_total.clone()))?;
        registry.register(Box::new(uploads_total.clone()))?;
        registry.register(Box::new(verifications_total.clone()))?;
        registry.register(Box::new(documents_total.clone()))?;

        Ok(Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                uploads_total,
                verifications_total,
                documents_total,
            }),
        })
    }

    /// Total request count, summed across labels.
    pub fn requests(&self) -> u64 {
        sum_counter(&self.inner.http_requests_total)
    }

    /// Total 4xx/5xx count, summed across labels.
    pub fn errors(&self) -> u64 {
        sum_counter(&self.inner.http_errors_total)
    }

    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
        if status >= 400 {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status_str])
                .inc();
        }
    }

    /// Count one upload. `outcome` is `created`, `duplicate` or a
    /// pipeline failure kind.
    pub fn record_upload(&self, outcome: &str) {
        self.inner.uploads_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_verification(&self, found: bool) {
        let result = if found { "found" } else { "not_found" };
        self.inner
            .verifications_total
            .with_label_values(&[result])
            .inc();
    }

    pub fn uploads(&self, outcome: &str) -> u64 {
        self.inner.uploads_total.with_label_values(&[outcome]).get()
    }

    pub fn set_document_counts(&self, visible: u64, hidden: u64) {
        let g = &self.inner.documents_total;
        g.with_label_values(&["visible"]).set(visible as f64);
        g.with_label_values(&["hidden"]).set(hidden as f64);
    }

    /// Gather all metrics and encode to Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer)
            .map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

fn sum_counter(counter: &IntCounterVec) -> u64 {
    counter
        .collect()
        .iter()
        .flat_map(|mf| mf.get_metric())
        .map(|m| m.get_counter().get_value() as u64)
        .sum()
}

/// Replace UUID segments with `{id}` to bound label cardinality.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            let hyphenated = segment.len() == 36
                && segment.chars().enumerate().all(|(i, c)| {
                    if matches!(i, 8 | 13 | 18 | 23) {
                        c == '-'
                    } else {
                        c.is_ascii_hexdigit()
                    }
                });
            let simple = segment.len() == 32 && segment.chars().all(|c| c.is_ascii_hexdigit());
            if hyphenated || simple {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Middleware that records HTTP request metrics via Prometheus.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        let status = response.status().as_u16();
        m.record_request(&method, &path, status, start.elapsed().as_secs_f64());
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let m = ApiMetrics::new().unwrap();
        assert_eq!(m.requests(), 0);
        assert_eq!(m.errors(), 0);
    }

    #[test]
    fn errors_counted_separately() {
        let m = ApiMetrics::new().unwrap();
        m.record_request("GET", "/api/verify/{id}", 200, 0.01);
        m.record_request("GET", "/api/verify/{id}", 404, 0.01);
        m.record_request("POST", "/api/upload", 500, 0.2);
        assert_eq!(m.requests(), 3);
        assert_eq!(m.errors(), 2);
    }

    #[test]
    fn domain_counters_are_exported() {
        let m = ApiMetrics::new().unwrap();
        m.record_upload("created");
        m.record_upload("created");
        m.record_upload("duplicate");
        m.record_verification(true);
        m.set_document_counts(4, 1);
        assert_eq!(m.uploads("created"), 2);

        let text = m.gather_and_encode().unwrap();
        assert!(text.contains("docseal_uploads_total{outcome=\"duplicate\"} 1"));
        assert!(text.contains("docseal_verifications_total{result=\"found\"} 1"));
        assert!(text.contains("docseal_documents_total{visibility=\"hidden\"} 1"));
    }

    #[test]
    fn registries_are_independent() {
        let a = ApiMetrics::new().unwrap();
        let b = ApiMetrics::new().unwrap();
        a.record_upload("created");
        assert_eq!(b.uploads("created"), 0);
    }

    #[test]
    fn normalize_replaces_uuids() {
        assert_eq!(
            normalize_path("/api/verify/550e8400-e29b-41d4-a716-446655440000"),
            "/api/verify/{id}"
        );
        assert_eq!(
            normalize_path("/api/documents/550e8400e29b41d4a716446655440000/hide"),
            "/api/documents/{id}/hide"
        );
        assert_eq!(normalize_path("/api/documents/my"), "/api/documents/my");
        assert_eq!(normalize_path("/health/liveness"), "/health/liveness");
    }
}
