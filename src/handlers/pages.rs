use axum::{
    extract::{Path, State},
    http::{header::CONTENT_TYPE, HeaderValue},
    response::Redirect,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::api_segment;
use crate::cookies::{participant_id_in_tournament, CookieJar};
use crate::error::AppError;
use crate::gateway::RequestOptions;
use crate::state::AppState;

/// Landing page: every tournament that is publicly listed.
pub async fn index(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let tournaments: Value = state
        .gateway
        .public_json("api/public_tournaments", RequestOptions::get())
        .await?;
    Ok(Json(json!({ "tournamentsInfo": tournaments })))
}

/// Sends participants to their home page and everybody else to the public page.
pub async fn tournament_entry(
    Path(tournament_id): Path<String>,
    cookies: CookieJar,
) -> Result<Redirect, AppError> {
    let tournament_id = api_segment(&tournament_id)?;
    let participant_id = participant_id_in_tournament(&cookies, tournament_id)
        .and_then(|id| api_segment(id).ok());

    Ok(match participant_id {
        Some(participant_id) => Redirect::temporary(&format!(
            "/tournament/{}/home/{}",
            tournament_id, participant_id
        )),
        None => Redirect::temporary(&format!("/tournament/{}/public", tournament_id)),
    })
}

pub async fn public_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<String>,
) -> Result<Json<Map<String, Value>>, AppError> {
    let info: Map<String, Value> = state
        .gateway
        .public_json(
            &format!("api/tournament/{}/public", api_segment(&tournament_id)?),
            RequestOptions::get(),
        )
        .await?;

    // Fields from the API take precedence over the route parameter.
    let mut page = Map::new();
    page.insert("tournamentId".to_string(), Value::String(tournament_id));
    page.extend(info);
    Ok(Json(page))
}

pub async fn user_statistics(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    cookies: CookieJar,
) -> Result<Json<Value>, AppError> {
    let statistics: Value = state
        .gateway
        .authenticated_json(
            &format!("api/user/{}/stats", api_segment(&user_id)?),
            &cookies,
            RequestOptions::get(),
        )
        .await?;
    Ok(Json(json!({ "statistics": statistics })))
}

/// Loads `path` with the visitor's token and hands the body back as is.
async fn relay_json(state: &AppState, path: &str, cookies: &CookieJar) -> Result<Json<Value>, AppError> {
    let body: Value = state
        .gateway
        .authenticated_json(path, cookies, RequestOptions::get())
        .await?;
    Ok(Json(body))
}

pub async fn tab(
    State(state): State<AppState>,
    Path(tournament_id): Path<String>,
    cookies: CookieJar,
) -> Result<Json<Value>, AppError> {
    let path = format!("api/tournament/{}/tab", api_segment(&tournament_id)?);
    relay_json(&state, &path, &cookies).await
}

pub async fn participants(
    State(state): State<AppState>,
    Path(tournament_id): Path<String>,
    cookies: CookieJar,
) -> Result<Json<Value>, AppError> {
    let path = format!("api/tournament/{}/participants", api_segment(&tournament_id)?);
    relay_json(&state, &path, &cookies).await
}

pub async fn draw(
    State(state): State<AppState>,
    Path((tournament_id, round_id)): Path<(String, String)>,
    cookies: CookieJar,
) -> Result<Json<Value>, AppError> {
    api_segment(&tournament_id)?;
    let path = format!("api/rounds/{}/draw", api_segment(&round_id)?);
    relay_json(&state, &path, &cookies).await
}

#[derive(Debug, Deserialize)]
struct DebateBallot {
    #[serde(default)]
    ballot: Value,
}

/// Ballot entry page for one debate.
pub async fn debate(
    State(state): State<AppState>,
    Path((tournament_id, debate_id)): Path<(String, String)>,
    cookies: CookieJar,
) -> Result<Json<Value>, AppError> {
    api_segment(&tournament_id)?;
    let debate: DebateBallot = state
        .gateway
        .authenticated_json(
            &format!("api/debate/{}", api_segment(&debate_id)?),
            &cookies,
            RequestOptions::get(),
        )
        .await?;
    Ok(Json(json!({ "ballot": debate.ballot })))
}

#[derive(Debug, Deserialize)]
struct Submission {
    #[serde(default)]
    ballot: Value,
    #[serde(default)]
    debate_id: Value,
}

pub async fn submission(
    State(state): State<AppState>,
    Path((tournament_id, ballot_id)): Path<(String, String)>,
    cookies: CookieJar,
) -> Result<Json<Value>, AppError> {
    api_segment(&tournament_id)?;
    let submission: Submission = state
        .gateway
        .authenticated_json(
            &format!("api/submission/{}", api_segment(&ballot_id)?),
            &cookies,
            RequestOptions::get(),
        )
        .await?;
    Ok(Json(json!({
        "ballot": submission.ballot,
        "debate": { "uuid": submission.debate_id },
    })))
}

/// Relays a speech timer event from the timer page to the API.
pub async fn notify_timer(
    State(state): State<AppState>,
    Path((tournament_id, debate_id)): Path<(String, String)>,
    cookies: CookieJar,
    body: String,
) -> Result<&'static str, AppError> {
    api_segment(&tournament_id)?;
    let options = RequestOptions::post()
        .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .body(body);

    state
        .gateway
        .authenticated_request(
            &format!("api/debate/{}/timing/notify", api_segment(&debate_id)?),
            &cookies,
            options,
        )
        .await?
        .error_for_status()?;
    Ok("")
}

pub async fn release_motion(
    State(state): State<AppState>,
    Path((tournament_id, round_id)): Path<(String, String)>,
    cookies: CookieJar,
) -> Result<Json<Value>, AppError> {
    api_segment(&tournament_id)?;
    let info: Value = state
        .gateway
        .authenticated_json(
            &format!("api/draw/{}/release-motion", api_segment(&round_id)?),
            &cookies,
            RequestOptions::post(),
        )
        .await?;
    Ok(Json(info))
}
