use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::io;

/// Failures of a single outbound API call.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("API base URL is not configured")]
    MissingBaseUrl,

    #[error("invalid API base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("could not build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("no '{0}' cookie present for an authenticated request")]
    MissingCredential(&'static str),

    #[error("invalid value for header '{0}'")]
    InvalidHeader(String),

    #[error("could not encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} failed with status {status}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl GatewayError {
    /// Upstream status code, if the API answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            GatewayError::Status { status, .. } => Some(*status),
            GatewayError::Transport { source, .. } => source.status(),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has an invalid value: '{value}'")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Invalid header value")]
    InvalidHeader,

    #[error("invalid path segment '{0}'")]
    InvalidPathSegment(String),

    #[error("could not install metrics recorder: {0}")]
    MetricsRecorder(#[from] metrics_exporter_prometheus::BuildError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Gateway(GatewayError::Status { status, body, .. }) => {
                (*status, format!("API request failed: {}", body))
            }
            AppError::Gateway(GatewayError::MissingCredential(_)) => {
                (StatusCode::UNAUTHORIZED, "Not logged in".to_string())
            }
            AppError::Gateway(e @ GatewayError::Transport { .. })
            | AppError::Gateway(e @ GatewayError::Decode { .. }) => {
                (StatusCode::BAD_GATEWAY, format!("API request failed: {}", e))
            }
            AppError::Gateway(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Gateway error: {}", e),
            ),
            AppError::IoError(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal server error: {}", e),
            ),
            AppError::InvalidHeader => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Invalid header value".to_string(),
            ),
            AppError::InvalidPathSegment(segment) => (
                StatusCode::BAD_REQUEST,
                format!("Invalid path segment: {}", segment),
            ),
            AppError::MetricsRecorder(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Metrics error: {}", e),
            ),
        };

        let body = Json(json!({
            "error": {
                "message": error_message,
                "type": error_type(&self),
            }
        }));

        (status, body).into_response()
    }
}

fn error_type(error: &AppError) -> &'static str {
    match error {
        AppError::Gateway(GatewayError::Status { .. }) => "status",
        AppError::Gateway(GatewayError::Transport { .. }) => "transport",
        AppError::Gateway(GatewayError::Decode { .. }) => "decode",
        AppError::Gateway(GatewayError::MissingCredential(_)) => "missing_credential",
        AppError::Gateway(_) => "gateway",
        AppError::IoError(_) => "io",
        AppError::InvalidHeader => "invalid_header",
        AppError::InvalidPathSegment(_) => "invalid_path",
        AppError::MetricsRecorder(_) => "metrics",
    }
}
