//! Outbound calls to the tournament API.
//!
//! [`ApiGateway`] is the single place that knows the API origin and attaches
//! credentials. Every loader and route handler goes through it.
//!
//! A response with any status other than 200 is logged once and still handed
//! back to the caller unchanged. Callers that want a hard failure use
//! [`ApiResponse::error_for_status`] or the `*_json` helpers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use http::{header, HeaderMap, HeaderValue, Method};
use serde::de::DeserializeOwned;
use tokio_retry::{
    strategy::{jitter, ExponentialBackoff},
    RetryIf,
};
use tracing::{debug, error, warn};

use crate::cookies::{CookieSource, TOKEN_COOKIE};
use crate::error::GatewayError;
use crate::telemetry::{Direction, MetricsRegistry, RequestMetrics};

mod client;
mod options;
mod response;

pub use options::{merge_headers, BasicAuth, RequestOptions};
pub use response::ApiResponse;

/// Longest body excerpt written to the log for a failed call.
const DIAGNOSTIC_BODY_LIMIT: usize = 512;

/// What to do when an authenticated call finds no token cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CredentialPolicy {
    /// Fail with [`GatewayError::MissingCredential`] before sending anything.
    #[default]
    Require,
    /// Send `Authorization: Bearer undefined`, as the old front end did, and
    /// let the API reject it.
    Legacy,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// API origin, e.g. `https://api.example.test`.
    pub base_url: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: Duration,
    /// Extra attempts after a connect or timeout failure of an idempotent call.
    pub retry_attempts: usize,
    pub credential_policy: CredentialPolicy,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            pool_max_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
            retry_attempts: 0,
            credential_policy: CredentialPolicy::Require,
        }
    }
}

impl GatewayConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }
}

#[derive(Clone)]
pub struct ApiGateway {
    client: reqwest::Client,
    base_url: Arc<str>,
    credential_policy: CredentialPolicy,
    retry_attempts: usize,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl ApiGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        if config.base_url.trim().is_empty() {
            return Err(GatewayError::MissingBaseUrl);
        }
        if let Err(e) = reqwest::Url::parse(&config.base_url) {
            return Err(GatewayError::InvalidBaseUrl {
                url: config.base_url.clone(),
                reason: e.to_string(),
            });
        }

        let client = client::build_client(&config)?;

        Ok(Self {
            client,
            base_url: Arc::from(config.base_url.trim_end_matches('/')),
            credential_policy: config.credential_policy,
            retry_attempts: config.retry_attempts,
            metrics: None,
        })
    }

    /// Records one outbound [`RequestMetrics`] per call into `registry`.
    pub fn with_metrics(mut self, registry: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(registry);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credential_policy(&self) -> CredentialPolicy {
        self.credential_policy
    }

    /// `<base>/<path>` with exactly one `/` between the two.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Calls the API with `Authorization: Bearer <token cookie>`.
    ///
    /// Headers in `options` are merged over the default; an `Authorization`
    /// header supplied by the caller replaces the bearer token and makes the
    /// token cookie unnecessary.
    pub async fn authenticated_request<C>(
        &self,
        path: &str,
        cookies: &C,
        mut options: RequestOptions,
    ) -> Result<ApiResponse, GatewayError>
    where
        C: CookieSource + ?Sized,
    {
        let caller_headers = std::mem::take(&mut options.headers);
        let defaults = if caller_headers.contains_key(header::AUTHORIZATION) {
            HeaderMap::new()
        } else {
            self.credential_headers(cookies.get(TOKEN_COOKIE))?
        };
        let headers = merge_headers(defaults, &caller_headers);
        self.dispatch(path, headers, options).await
    }

    /// Calls the API with an explicitly supplied bearer token.
    pub async fn bearer_request(
        &self,
        path: &str,
        token: &str,
        mut options: RequestOptions,
    ) -> Result<ApiResponse, GatewayError> {
        let caller_headers = std::mem::take(&mut options.headers);
        let headers = merge_headers(self.credential_headers(Some(token))?, &caller_headers);
        self.dispatch(path, headers, options).await
    }

    /// Calls the API without credentials. The body is declared as JSON unless
    /// the caller says otherwise.
    pub async fn request(
        &self,
        path: &str,
        mut options: RequestOptions,
    ) -> Result<ApiResponse, GatewayError> {
        let caller_headers = std::mem::take(&mut options.headers);
        let mut defaults = HeaderMap::new();
        defaults.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        let headers = merge_headers(defaults, &caller_headers);
        self.dispatch(path, headers, options).await
    }

    /// Unauthenticated call that leaves the body unread, for streaming it on.
    pub async fn stream(
        &self,
        path: &str,
        mut options: RequestOptions,
    ) -> Result<reqwest::Response, GatewayError> {
        let url = self.endpoint(path);
        let headers = std::mem::take(&mut options.headers);
        let start = Instant::now();
        let method = options.method.clone();

        let result = self.send(&url, headers, options).await;
        let (status_code, error_type) = match &result {
            Ok(response) => {
                let status = response.status();
                if status != reqwest::StatusCode::OK {
                    error!(url = %url, status = %status, "API request returned non-success status");
                }
                (Some(status.as_u16()), None)
            }
            Err(e) => (None, Some(error_kind(e))),
        };
        self.record(&method, path, status_code, start, 0, error_type)
            .await;
        result
    }

    /// Authenticated call that must return 200 with a JSON body.
    pub async fn authenticated_json<T, C>(
        &self,
        path: &str,
        cookies: &C,
        options: RequestOptions,
    ) -> Result<T, GatewayError>
    where
        T: DeserializeOwned,
        C: CookieSource + ?Sized,
    {
        self.authenticated_request(path, cookies, options)
            .await?
            .error_for_status()?
            .json()
    }

    /// Unauthenticated call that must return 200 with a JSON body.
    pub async fn public_json<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, GatewayError> {
        self.request(path, options).await?.error_for_status()?.json()
    }

    fn credential_headers(&self, token: Option<&str>) -> Result<HeaderMap, GatewayError> {
        let token = match (token, self.credential_policy) {
            (Some(token), _) => token,
            (None, CredentialPolicy::Require) => {
                warn!("Authenticated request without a token cookie");
                return Err(GatewayError::MissingCredential(TOKEN_COOKIE));
            }
            (None, CredentialPolicy::Legacy) => {
                warn!("No token cookie, sending legacy 'Bearer undefined' credential");
                "undefined"
            }
        };

        let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| GatewayError::InvalidHeader(header::AUTHORIZATION.to_string()))?;
        value.set_sensitive(true);

        let mut headers = HeaderMap::with_capacity(1);
        headers.insert(header::AUTHORIZATION, value);
        Ok(headers)
    }

    async fn dispatch(
        &self,
        path: &str,
        headers: HeaderMap,
        options: RequestOptions,
    ) -> Result<ApiResponse, GatewayError> {
        let url = self.endpoint(path);
        let method = options.method.clone();
        let start = Instant::now();

        let response = match self.send(&url, headers, options).await {
            Ok(response) => response,
            Err(e) => {
                self.record(&method, path, None, start, 0, Some(error_kind(&e)))
                    .await;
                return Err(e);
            }
        };

        let status = response.status();
        let response_headers = response.headers().clone();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(source) => {
                let e = GatewayError::Transport {
                    url: url.clone(),
                    source,
                };
                self.record(&method, path, Some(status.as_u16()), start, 0, Some(error_kind(&e)))
                    .await;
                return Err(e);
            }
        };

        let response = ApiResponse::new(url, status, response_headers, body);
        if !response.is_ok() {
            let text = response.text();
            error!(
                url = %response.url(),
                status = %status,
                body = %truncate(&text, DIAGNOSTIC_BODY_LIMIT),
                "API request returned non-success status"
            );
        }

        self.record(&method, path, Some(status.as_u16()), start, response.body().len(), None)
            .await;
        Ok(response)
    }

    async fn send(
        &self,
        url: &str,
        headers: HeaderMap,
        options: RequestOptions,
    ) -> Result<reqwest::Response, GatewayError> {
        let RequestOptions {
            method,
            body,
            basic_auth,
            ..
        } = options;

        debug!(method = %method, url = %url, "Sending API request");

        let attempts = if is_idempotent(&method) {
            self.retry_attempts
        } else {
            0
        };
        let strategy = ExponentialBackoff::from_millis(50)
            .max_delay(Duration::from_secs(2))
            .map(jitter)
            .take(attempts);

        let action = || {
            let mut builder = self
                .client
                .request(method.clone(), url)
                .headers(headers.clone());
            if let Some(body) = &body {
                builder = builder.body(body.clone());
            }
            if let Some(auth) = &basic_auth {
                builder = builder.basic_auth(&auth.username, auth.password.as_ref());
            }
            builder.send()
        };

        RetryIf::spawn(strategy, action, |e: &reqwest::Error| {
            let retry = e.is_connect() || e.is_timeout();
            if retry {
                warn!(url = %url, error = %e, "Retrying API request after transport failure");
            }
            retry
        })
        .await
        .map_err(|source| GatewayError::Transport {
            url: url.to_string(),
            source,
        })
    }

    async fn record(
        &self,
        method: &Method,
        path: &str,
        status_code: Option<u16>,
        start: Instant,
        response_size: usize,
        error_type: Option<&'static str>,
    ) {
        let Some(registry) = &self.metrics else {
            return;
        };
        registry
            .record_metrics(RequestMetrics {
                direction: Direction::Outbound,
                method: method.to_string(),
                path: path.to_string(),
                status_code,
                latency: start.elapsed(),
                response_size,
                error_type: error_type.map(str::to_string),
                request_id: None,
            })
            .await;
    }
}

fn is_idempotent(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::PUT | Method::DELETE | Method::OPTIONS
    )
}

fn error_kind(error: &GatewayError) -> &'static str {
    match error {
        GatewayError::Transport { source, .. } if source.is_timeout() => "timeout",
        GatewayError::Transport { source, .. } if source.is_connect() => "connect",
        GatewayError::Transport { .. } => "transport",
        _ => "gateway",
    }
}

fn truncate(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
