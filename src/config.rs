use std::env;
use std::str::FromStr;
use std::time::Duration;

use dotenv::dotenv;

use crate::error::ConfigError;
use crate::gateway::{CredentialPolicy, GatewayConfig};

/// Environment variable holding the API origin every gateway call is resolved against.
pub const API_URL_VAR: &str = "PUBLIC_API_URL";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub host: String,
    pub gateway: GatewayConfig,
    /// Adds `Secure` to cookies issued by the login and registration routes.
    pub secure_cookies: bool,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
    pub debug_mode: bool,
    pub prometheus_enabled: bool,
    pub json_logs: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let api_url = env::var(API_URL_VAR).map_err(|_| ConfigError::Missing(API_URL_VAR))?;

        let credential_policy = if parse_var("ALLOW_MISSING_TOKEN", false)? {
            CredentialPolicy::Legacy
        } else {
            CredentialPolicy::Require
        };

        Ok(Self {
            port: parse_var("PORT", 3000)?,
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            gateway: GatewayConfig {
                base_url: api_url,
                timeout: Duration::from_secs(parse_var("API_TIMEOUT_SECS", 30)?),
                connect_timeout: Duration::from_secs(parse_var("API_CONNECT_TIMEOUT_SECS", 5)?),
                retry_attempts: parse_var("API_RETRY_ATTEMPTS", 0)?,
                credential_policy,
                ..GatewayConfig::default()
            },
            secure_cookies: parse_var("COOKIE_SECURE", true)?,
            telemetry: TelemetryConfig {
                debug_mode: parse_var("TELEMETRY_DEBUG", false)?,
                prometheus_enabled: parse_var("ENABLE_PROMETHEUS", false)?,
                json_logs: env::var("LOG_FORMAT")
                    .map(|v| v.eq_ignore_ascii_case("json"))
                    .unwrap_or(false),
            },
        })
    }
}

/// Reads `var`, falling back to `default` when unset. A value that is set but
/// does not parse is an error rather than a silent default.
fn parse_var<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        Err(_) => Ok(default),
    }
}
