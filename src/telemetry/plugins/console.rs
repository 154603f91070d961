use crate::telemetry::{metrics::MetricsExporter, RequestMetrics};
use async_trait::async_trait;
use std::error::Error;

/// Prints one line per record; registered in debug mode only.
#[derive(Debug, Default)]
pub struct ConsolePlugin;

impl ConsolePlugin {
    pub fn new() -> Self {
        ConsolePlugin
    }

    fn line(metrics: &RequestMetrics) -> String {
        let status = metrics
            .status_code
            .map(|s| s.to_string())
            .unwrap_or_else(|| metrics.error_type.clone().unwrap_or_else(|| "-".to_string()));
        format!(
            "[{}] {} {} -> {} ({} ms, {} bytes){}",
            metrics.direction.as_str(),
            metrics.method,
            metrics.path,
            status,
            metrics.latency.as_millis(),
            metrics.response_size,
            metrics
                .request_id
                .as_deref()
                .map(|id| format!(" request_id={}", id))
                .unwrap_or_default(),
        )
    }
}

#[async_trait]
impl MetricsExporter for ConsolePlugin {
    async fn export_metrics(&self, metrics: RequestMetrics) -> Result<(), Box<dyn Error + Send + Sync>> {
        println!("{}", Self::line(&metrics));
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}
