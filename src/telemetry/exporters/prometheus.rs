use crate::telemetry::{metrics::MetricsExporter, RequestMetrics};
use async_trait::async_trait;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Installs the process-wide Prometheus recorder behind the `metrics`
/// facade. The handle renders the scrape output served at `/metrics`.
pub fn install_prometheus_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Forwards records to the `metrics` facade.
pub struct PrometheusExporter {
    namespace: String,
}

impl PrometheusExporter {
    pub fn new(namespace: String) -> Self {
        Self { namespace }
    }

    fn record(&self, metrics: &RequestMetrics) {
        let status = metrics
            .status_code
            .map(|s| s.to_string())
            .unwrap_or_else(|| "none".to_string());
        let labels = [
            ("direction", metrics.direction.as_str().to_string()),
            ("method", metrics.method.clone()),
            ("status", status),
        ];

        let name = format!("{}_requests_total", self.namespace);
        counter!(name, &labels).increment(1);

        let name = format!("{}_request_latency_seconds", self.namespace);
        histogram!(name, &labels).record(metrics.latency.as_secs_f64());

        let name = format!("{}_response_size_bytes", self.namespace);
        histogram!(name, &labels).record(metrics.response_size as f64);

        if metrics.is_error() {
            let name = format!("{}_errors_total", self.namespace);
            counter!(name, &labels).increment(1);
        }
    }
}

#[async_trait]
impl MetricsExporter for PrometheusExporter {
    async fn export_metrics(&self, metrics: RequestMetrics) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.record(&metrics);
        Ok(())
    }

    fn name(&self) -> &str {
        "prometheus"
    }
}
