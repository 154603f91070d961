pub mod exporters;
pub mod metrics;
pub mod middleware;
pub mod plugins;

pub use self::{
    exporters::prometheus::{install_prometheus_recorder, PrometheusExporter},
    metrics::{MetricsExporter, MetricsRegistry},
    middleware::{metrics_middleware, REQUEST_ID_HEADER},
    plugins::ConsolePlugin,
};

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// A request served by this gateway.
    #[default]
    Inbound,
    /// A call made by the gateway to the API.
    Outbound,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestMetrics {
    pub direction: Direction,
    pub method: String,
    /// Route template for inbound requests, API path for outbound calls.
    pub path: String,

    pub latency: Duration,
    pub response_size: usize,

    /// `None` when no response arrived.
    pub status_code: Option<u16>,
    pub error_type: Option<String>,

    pub request_id: Option<String>,
}

impl RequestMetrics {
    pub fn is_error(&self) -> bool {
        self.error_type.is_some() || self.status_code.map_or(true, |s| s != 200)
    }
}
