//! Observability for remote calls and local fallbacks.
//!
//! `metrics` feature: OpenTelemetry instruments exported through a Prometheus registry.
//! `tracing` feature: spans around repository and adapter operations.

#[cfg(feature = "metrics")]
use once_cell::sync::Lazy;
#[cfg(feature = "metrics")]
use opentelemetry::{
    metrics::{Counter, Histogram, MeterProvider},
    KeyValue,
};
#[cfg(feature = "metrics")]
use opentelemetry_sdk::metrics::SdkMeterProvider;

#[cfg(feature = "metrics")]
pub static METRICS: Lazy<CatalogMetrics> = Lazy::new(CatalogMetrics::init);

#[cfg(feature = "metrics")]
pub struct CatalogMetrics {
    registry: prometheus::Registry,
    _provider: SdkMeterProvider,
    pub remote_ops_total: Counter<u64>,
    pub remote_errors_total: Counter<u64>,
    pub fallbacks_total: Counter<u64>,
    pub remote_duration: Histogram<f64>,
}

#[cfg(feature = "metrics")]
impl CatalogMetrics {
    pub fn init() -> Self {
        let registry = prometheus::Registry::new();
        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()
            .expect("failed to build prometheus exporter");
        let provider = SdkMeterProvider::builder().with_reader(exporter).build();
        let meter = provider.meter("barback");

        let remote_ops_total = meter
            .u64_counter("barback_remote_ops_total")
            .with_description("Remote store operations attempted")
            .build();

        let remote_errors_total = meter
            .u64_counter("barback_remote_errors_total")
            .with_description("Remote store operations that returned an error")
            .build();

        let fallbacks_total = meter
            .u64_counter("barback_fallbacks_total")
            .with_description("Repository operations served by local storage")
            .build();

        let remote_duration = meter
            .f64_histogram("barback_remote_duration_seconds")
            .with_description("Duration of remote store operations")
            .build();

        Self {
            registry,
            _provider: provider,
            remote_ops_total,
            remote_errors_total,
            fallbacks_total,
            remote_duration,
        }
    }

    pub fn record_remote(&self, table: &'static str, op: &'static str, elapsed: std::time::Duration, ok: bool) {
        let attrs = [KeyValue::new("table", table), KeyValue::new("op", op)];
        self.remote_ops_total.add(1, &attrs);
        if !ok {
            self.remote_errors_total.add(1, &attrs);
        }
        self.remote_duration.record(elapsed.as_secs_f64(), &attrs);
    }

    pub fn record_fallback(&self, table: &'static str, op: &'static str) {
        self.fallbacks_total
            .add(1, &[KeyValue::new("table", table), KeyValue::new("op", op)]);
    }

    /// Render the registry in Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        prometheus::TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::Span;

    pub fn repository_span(table: &'static str, op: &'static str) -> Span {
        tracing::info_span!("barback.repository", table, op)
    }

    pub fn remote_span(table: &'static str, op: &'static str) -> Span {
        tracing::debug_span!("barback.remote", table, op)
    }

    pub fn push_span(table: &'static str, id: &str) -> Span {
        tracing::debug_span!("barback.push", table, id)
    }
}
