use std::borrow::Cow;

use bytes::Bytes;
use http::{header, HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::GatewayError;

/// A fully buffered API response. Status and body are exactly what the API sent.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    url: String,
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl ApiResponse {
    pub fn new(url: String, status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            url,
            status,
            headers,
            body,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// The API signals success with exactly 200; other 2xx codes are not treated as success.
    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, GatewayError> {
        serde_json::from_slice(&self.body).map_err(|source| GatewayError::Decode {
            url: self.url.clone(),
            source,
        })
    }

    /// Turns a non-200 response into [`GatewayError::Status`], keeping the body text.
    pub fn error_for_status(self) -> Result<Self, GatewayError> {
        if self.is_ok() {
            return Ok(self);
        }
        Err(GatewayError::Status {
            body: self.text().into_owned(),
            url: self.url,
            status: self.status,
        })
    }
}
