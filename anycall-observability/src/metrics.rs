use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use tracing::debug;

/// Metrics collector — all counters are gated behind `enabled`.
///
/// When `enabled = false` no registry is created and every `record_*` call
/// returns immediately.
pub struct MetricsCollector {
    enabled: bool,
    registry: Option<Registry>,
    pub ingested_requests_total: Option<IntCounterVec>,
    pub ingested_body_bytes: Option<HistogramVec>,
    pub query_requests_total: Option<IntCounter>,
    pub store_entries: Option<IntGauge>,
}

impl MetricsCollector {
    /// Create a new collector. When `enabled = false`, everything is None.
    pub fn new(enabled: bool) -> anyhow::Result<Self> {
        if !enabled {
            return Ok(Self::disabled());
        }

        let registry = Registry::new();

        let ingested_requests_total = IntCounterVec::new(
            Opts::new("ingested_requests_total", "Requests recorded by the ingest endpoint")
                .namespace("anycall"),
            &["method"],
        )?;

        let ingested_body_bytes = HistogramVec::new(
            HistogramOpts::new("ingested_body_bytes", "Size of recorded request bodies")
                .namespace("anycall")
                .buckets(vec![
                    0.0, 64.0, 256.0, 1024.0, 4096.0, 16384.0, 65536.0, 262144.0, 1048576.0,
                ]),
            &["method"],
        )?;

        let query_requests_total = IntCounter::with_opts(
            Opts::new("query_requests_total", "Reads of the full request log").namespace("anycall"),
        )?;

        let store_entries = IntGauge::with_opts(
            Opts::new("store_entries", "Entries currently held in memory").namespace("anycall"),
        )?;

        registry.register(Box::new(ingested_requests_total.clone()))?;
        registry.register(Box::new(ingested_body_bytes.clone()))?;
        registry.register(Box::new(query_requests_total.clone()))?;
        registry.register(Box::new(store_entries.clone()))?;

        debug!("Prometheus metrics registered");

        Ok(Self {
            enabled: true,
            registry: Some(registry),
            ingested_requests_total: Some(ingested_requests_total),
            ingested_body_bytes: Some(ingested_body_bytes),
            query_requests_total: Some(query_requests_total),
            store_entries: Some(store_entries),
        })
    }

    /// No-op collector.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            registry: None,
            ingested_requests_total: None,
            ingested_body_bytes: None,
            query_requests_total: None,
            store_entries: None,
        }
    }

    /// Record one ingested request (no-op when disabled).
    #[inline]
    pub fn record_ingest(&self, method: &str, body_bytes: usize, store_len: usize) {
        if !self.enabled {
            return;
        }
        let method = method_label(method);
        if let Some(ref counter) = self.ingested_requests_total {
            counter.with_label_values(&[method]).inc();
        }
        if let Some(ref hist) = self.ingested_body_bytes {
            hist.with_label_values(&[method]).observe(body_bytes as f64);
        }
        if let Some(ref gauge) = self.store_entries {
            gauge.set(store_len as i64);
        }
    }

    /// Record one read of the log (no-op when disabled).
    #[inline]
    pub fn record_query(&self) {
        if let Some(ref counter) = self.query_requests_total {
            counter.inc();
        }
    }

    /// Text exposition of every registered family. Empty when disabled.
    pub fn render(&self) -> prometheus::Result<String> {
        let Some(ref registry) = self.registry else {
            return Ok(String::new());
        };
        let families = registry.gather();
        let mut buffer = Vec::with_capacity(4096);
        TextEncoder::new().encode(&families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Standard methods keep their name; extension methods share one series.
fn method_label(method: &str) -> &str {
    match method {
        "GET" | "HEAD" | "POST" | "PUT" | "DELETE" | "CONNECT" | "OPTIONS" | "TRACE"
        | "PATCH" => method,
        _ => "OTHER",
    }
}
