use std::time::Duration;

use crate::error::GatewayError;

use super::GatewayConfig;

/// Builds the pooled client shared by every clone of a gateway.
pub fn build_client(config: &GatewayConfig) -> Result<reqwest::Client, GatewayError> {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .pool_idle_timeout(config.pool_idle_timeout)
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .map_err(GatewayError::ClientBuild)
}
