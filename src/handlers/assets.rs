use axum::{
    body::Body,
    extract::{Path, State},
    http::header::CONTENT_TYPE,
    response::Response,
};
use futures_util::StreamExt;
use tracing::error;

use super::api_segment;
use crate::error::AppError;
use crate::gateway::RequestOptions;
use crate::state::AppState;

/// Streams `<api>/assets/<path>` through unchanged, keeping status and content type.
pub async fn proxy_asset(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response, AppError> {
    let upstream = state
        .gateway
        .stream(&format!("assets/{}", api_segment(&path)?), RequestOptions::get())
        .await?;

    let status = upstream.status();
    let content_type = upstream.headers().get(CONTENT_TYPE).cloned();

    let stream = upstream.bytes_stream().map(|result| match result {
        Ok(bytes) => Ok(bytes),
        Err(e) => {
            error!("Asset stream error: {}", e);
            Err(std::io::Error::new(std::io::ErrorKind::Other, e))
        }
    });

    let mut builder = Response::builder().status(status);
    if let Some(content_type) = content_type {
        builder = builder.header(CONTENT_TYPE, content_type);
    }
    builder
        .body(Body::from_stream(stream))
        .map_err(|_| AppError::InvalidHeader)
}
