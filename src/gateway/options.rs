use bytes::Bytes;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;

use crate::error::GatewayError;

/// Everything a caller can say about one outbound call besides its path.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    /// Extra headers, applied over the gateway's defaults.
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub basic_auth: Option<BasicAuth>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: Option<String>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post() -> Self {
        Self::with_method(Method::POST)
    }

    pub fn delete() -> Self {
        Self::with_method(Method::DELETE)
    }

    pub fn with_method(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Like [`header`](Self::header) for values that are not known to be valid.
    pub fn try_header(self, name: HeaderName, value: &str) -> Result<Self, GatewayError> {
        let value = HeaderValue::from_str(value)
            .map_err(|_| GatewayError::InvalidHeader(name.to_string()))?;
        Ok(self.header(name, value))
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serializes `value` as the body and marks it as JSON.
    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, GatewayError> {
        let body = serde_json::to_vec(value).map_err(GatewayError::Encode)?;
        Ok(self
            .header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body))
    }

    pub fn basic_auth(mut self, username: impl Into<String>, password: Option<String>) -> Self {
        self.basic_auth = Some(BasicAuth {
            username: username.into(),
            password,
        });
        self
    }
}

/// Shallow merge: every header named in `overrides` replaces all values of
/// that header in `defaults`; headers only in `defaults` are kept.
pub fn merge_headers(mut defaults: HeaderMap, overrides: &HeaderMap) -> HeaderMap {
    for name in overrides.keys() {
        defaults.remove(name);
        for value in overrides.get_all(name) {
            defaults.append(name.clone(), value.clone());
        }
    }
    defaults
}
