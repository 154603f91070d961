//! Routes served to participants' browsers. Every handler is a thin caller
//! of [`ApiGateway`](crate::gateway::ApiGateway).

use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};

use crate::error::AppError;
use crate::state::AppState;
use crate::telemetry::metrics_middleware;

pub mod assets;
pub mod auth;
pub mod layout;
pub mod pages;
pub mod participant;

pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Prometheus scrape output; 404 unless Prometheus is enabled.
pub async fn prometheus_metrics(State(state): State<AppState>) -> Response {
    match &state.prometheus {
        Some(handle) => (
            [(CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Route parameters arrive percent-decoded. One that would change the shape
/// of the API path it is spliced into is rejected.
pub fn api_segment(value: &str) -> Result<&str, AppError> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(|c: char| matches!(c, '/' | '\\' | '?' | '#') || c.is_control());
    if invalid {
        return Err(AppError::InvalidPathSegment(value.to_string()));
    }
    Ok(value)
}

pub fn router(state: AppState) -> Router {
    let metrics = state.metrics.clone();

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(prometheus_metrics))
        .route("/", get(pages::index))
        .route("/layout", get(layout::layout))
        .route("/auth", post(auth::issue_token))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/create_account", post(auth::create_account))
        .route("/register", post(auth::register))
        .route("/register/:key", get(auth::registration_info))
        .route("/assets/:path", get(assets::proxy_asset))
        .route("/user/:user_id", get(pages::user_statistics))
        .route("/tournament/:tournament_id", get(pages::tournament_entry))
        .route("/tournament/:tournament_id/public", get(pages::public_tournament))
        .route("/tournament/:tournament_id/tab", get(pages::tab))
        .route("/tournament/:tournament_id/participants", get(pages::participants))
        .route("/tournament/:tournament_id/round/:round_id/draw", get(pages::draw))
        .route("/tournament/:tournament_id/debate/:debate_id", get(pages::debate))
        .route(
            "/tournament/:tournament_id/submission/:ballot_id",
            get(pages::submission),
        )
        .route(
            "/tournament/:tournament_id/debate/:debate_id/timer/notify",
            post(pages::notify_timer),
        )
        .route(
            "/tournament/:tournament_id/round/:round_id/presentation/motion",
            post(pages::release_motion),
        )
        .route("/tournament/:tournament_id/home", get(pages::tournament_entry))
        .route(
            "/tournament/:tournament_id/home/:participant_id",
            get(participant::home),
        )
        .route(
            "/tournament/:tournament_id/home/:participant_id/release-motion",
            post(participant::release_motion_to_non_aligned),
        )
        .route(
            "/tournament/:tournament_id/home/:participant_id/clashes",
            get(participant::clashes),
        )
        .route(
            "/tournament/:tournament_id/home/:participant_id/feedback",
            get(participant::feedback),
        )
        .route(
            "/tournament/:tournament_id/home/:participant_id/settings",
            get(participant::settings).post(participant::update_settings),
        )
        .layer(from_fn_with_state(metrics, metrics_middleware))
        .with_state(state)
}
