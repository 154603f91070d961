use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::AppConfig;
use crate::error::GatewayError;
use crate::gateway::ApiGateway;
use crate::telemetry::MetricsRegistry;

/// Shared by every handler; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub gateway: ApiGateway,
    pub metrics: Arc<MetricsRegistry>,
    pub secure_cookies: bool,
    /// Renders `/metrics`; `None` when Prometheus is disabled.
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(gateway: ApiGateway, metrics: Arc<MetricsRegistry>, secure_cookies: bool) -> Self {
        Self {
            gateway: gateway.with_metrics(metrics.clone()),
            metrics,
            secure_cookies,
            prometheus: None,
        }
    }

    pub fn from_config(config: &AppConfig, metrics: Arc<MetricsRegistry>) -> Result<Self, GatewayError> {
        let gateway = ApiGateway::new(config.gateway.clone())?;
        Ok(Self::new(gateway, metrics, config.secure_cookies))
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }
}
