//! Short-lived API tokens for callers that hold no cookie store.
//!
//! The `/auth` route trades the session cookie for a token the client can
//! send itself. [`TokenCache`] keeps that token until it is within a second
//! of expiring. [`BrowserSession`] presents the session cookie to `/auth`
//! and the short-lived token to the API.

use std::future::Future;

use http::{header, HeaderValue};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::cookies::TOKEN_COOKIE;
use crate::error::GatewayError;
use crate::gateway::{ApiGateway, ApiResponse, RequestOptions};

/// Tokens are refreshed this long before their stated expiry.
const EXPIRY_MARGIN_MS: i64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    pub token: String,
    /// Unix time in milliseconds; `None` never expires.
    #[serde(default)]
    pub expires: Option<i64>,
}

impl SessionToken {
    pub fn is_fresh_at(&self, now_ms: i64) -> bool {
        match self.expires {
            None => true,
            Some(expires) => now_ms + EXPIRY_MARGIN_MS <= expires,
        }
    }
}

#[derive(Debug, Default)]
pub struct TokenCache {
    cached: Mutex<Option<SessionToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached token, or awaits `refresh` once and caches its result.
    pub async fn token<F, Fut>(&self, refresh: F) -> Result<String, GatewayError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<SessionToken, GatewayError>>,
    {
        let mut cached = self.cached.lock().await;
        let now = chrono::Utc::now().timestamp_millis();
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh_at(now)) {
            return Ok(token.token.clone());
        }

        debug!("Session token missing or expiring, requesting a new one");
        let token = refresh().await?;
        let value = token.token.clone();
        *cached = Some(token);
        Ok(value)
    }

    pub async fn clear(&self) {
        *self.cached.lock().await = None;
    }
}

/// API access for a client that authenticates through the front end's `/auth` route.
pub struct BrowserSession {
    api: ApiGateway,
    frontend: ApiGateway,
    session_cookie: HeaderValue,
    cache: TokenCache,
}

impl BrowserSession {
    /// `api` points at the API origin, `frontend` at the server exposing
    /// `/auth`. `session_token` is the value of the session's `token` cookie.
    pub fn new(
        api: ApiGateway,
        frontend: ApiGateway,
        session_token: &str,
    ) -> Result<Self, GatewayError> {
        let mut session_cookie = HeaderValue::from_str(&format!("{}={}", TOKEN_COOKIE, session_token))
            .map_err(|_| GatewayError::InvalidHeader(header::COOKIE.to_string()))?;
        session_cookie.set_sensitive(true);

        Ok(Self {
            api,
            frontend,
            session_cookie,
            cache: TokenCache::new(),
        })
    }

    pub async fn request(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<ApiResponse, GatewayError> {
        let token = self
            .cache
            .token(|| {
                let options =
                    RequestOptions::post().header(header::COOKIE, self.session_cookie.clone());
                self.frontend.public_json::<SessionToken>("auth", options)
            })
            .await?;
        self.api.bearer_request(path, &token, options).await
    }

    /// Drops the cached token, e.g. after the API rejected it.
    pub async fn invalidate(&self) {
        self.cache.clear().await;
    }
}
