//! Pages under `/tournament/<id>/home/<participant>`: overview, clashes,
//! feedback and settings for one participant.

use axum::{
    extract::{Path, Query, State},
    Form, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::api_segment;
use crate::cookies::CookieJar;
use crate::error::AppError;
use crate::gateway::RequestOptions;
use crate::state::AppState;

const NON_ALIGNED_MOTION_RELEASE: &str = "NonAlignedMotionRelease";

#[derive(Debug, Deserialize)]
struct ParticipantOverview {
    #[serde(default)]
    name: Value,
    #[serde(default)]
    rounds: Value,
    #[serde(default)]
    feedback_submissions: Value,
    #[serde(default)]
    role: Value,
}

/// Both ids from `/tournament/<tournament>/home/<participant>`, checked.
fn participant_path(ids: &(String, String)) -> Result<&str, AppError> {
    api_segment(&ids.0)?;
    api_segment(&ids.1)
}

pub async fn home(
    State(state): State<AppState>,
    Path(ids): Path<(String, String)>,
    cookies: CookieJar,
) -> Result<Json<Value>, AppError> {
    let participant_id = participant_path(&ids)?;
    let overview: ParticipantOverview = state
        .gateway
        .authenticated_json(
            &format!("api/participant/{}", participant_id),
            &cookies,
            RequestOptions::get(),
        )
        .await?;

    Ok(Json(json!({
        "name": overview.name,
        "rounds": overview.rounds,
        "feedback_submissions": overview.feedback_submissions,
        "tournamentId": ids.0,
        "role": overview.role,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotionReleaseForm {
    pub debate_id: String,
    #[serde(default)]
    pub release: String,
}

/// Lets a chair show the motion to non-aligned participants before the round starts.
pub async fn release_motion_to_non_aligned(
    State(state): State<AppState>,
    Path(ids): Path<(String, String)>,
    cookies: CookieJar,
    Form(form): Form<MotionReleaseForm>,
) -> Result<Json<Value>, AppError> {
    participant_path(&ids)?;
    let release = form.release == "true";
    let options = RequestOptions::post().json(&json!({
        "release": release,
        "state": NON_ALIGNED_MOTION_RELEASE,
    }))?;

    state
        .gateway
        .authenticated_request(
            &format!("api/debate/{}/state", api_segment(&form.debate_id)?),
            &cookies,
            options,
        )
        .await?
        .error_for_status()?;

    info!(debate_id = %form.debate_id, release, "Motion release to non-aligned changed");
    Ok(Json(json!({ "isMotionReleasedToNonAligned": release })))
}

#[derive(Debug, Deserialize)]
pub struct ClashQuery {
    pub edit: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeclaredClashes {
    #[serde(default)]
    declared_clashes: Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct TournamentParticipants {
    #[serde(default)]
    pub adjudicators: Vec<NamedParticipant>,
    #[serde(default)]
    pub teams: Vec<Team>,
}

#[derive(Debug, Deserialize)]
pub struct Team {
    #[serde(default)]
    pub members: Vec<NamedParticipant>,
}

#[derive(Debug, Deserialize)]
pub struct NamedParticipant {
    pub uuid: String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct ClashTarget {
    pub uuid: String,
    pub participant_name: String,
    pub participant_role: &'static str,
}

/// Adjudicators first, then every speaker in team order.
pub fn clash_targets(participants: TournamentParticipants) -> Vec<ClashTarget> {
    let adjudicators = participants.adjudicators.into_iter().map(|a| ClashTarget {
        uuid: a.uuid,
        participant_name: a.display_name,
        participant_role: "adjudicator",
    });
    let speakers = participants
        .teams
        .into_iter()
        .flat_map(|team| team.members)
        .map(|m| ClashTarget {
            uuid: m.uuid,
            participant_name: m.display_name,
            participant_role: "speaker",
        });
    adjudicators.chain(speakers).collect()
}

/// Declared clashes; with `?edit` also everybody a clash could be declared against.
pub async fn clashes(
    State(state): State<AppState>,
    Path(ids): Path<(String, String)>,
    Query(query): Query<ClashQuery>,
    cookies: CookieJar,
) -> Result<Json<Value>, AppError> {
    let participant_id = participant_path(&ids)?;
    let declared: DeclaredClashes = state
        .gateway
        .authenticated_json(
            &format!("api/participant/{}/clashes", participant_id),
            &cookies,
            RequestOptions::get(),
        )
        .await?;

    if query.edit.is_none() {
        return Ok(Json(json!({
            "declared_clashes": declared.declared_clashes,
            "isEditing": false,
        })));
    }

    let participants: TournamentParticipants = state
        .gateway
        .authenticated_json(
            &format!("api/tournament/{}/participants", ids.0),
            &cookies,
            RequestOptions::get(),
        )
        .await?;

    Ok(Json(json!({
        "declared_clashes": declared.declared_clashes,
        "isEditing": true,
        "targets": clash_targets(participants),
    })))
}

#[derive(Debug, Deserialize)]
struct FeedbackSummary {
    #[serde(default)]
    individual_values: Value,
    #[serde(default)]
    summary_values: Value,
}

pub async fn feedback(
    State(state): State<AppState>,
    Path(ids): Path<(String, String)>,
    cookies: CookieJar,
) -> Result<Json<Value>, AppError> {
    let participant_id = participant_path(&ids)?;
    let summary: FeedbackSummary = state
        .gateway
        .authenticated_json(
            &format!("api/participant/{}/feedback", participant_id),
            &cookies,
            RequestOptions::get(),
        )
        .await?;

    Ok(Json(json!({
        "individualValues": summary.individual_values,
        "summaryValues": summary.summary_values,
    })))
}

#[derive(Debug, Deserialize)]
struct ParticipantSettings {
    #[serde(default)]
    is_anonymous: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsForm {
    #[serde(default)]
    pub is_anonymous: Option<String>,
}

pub async fn settings(
    State(state): State<AppState>,
    Path(ids): Path<(String, String)>,
    cookies: CookieJar,
) -> Result<Json<Value>, AppError> {
    let participant_id = participant_path(&ids)?;
    let settings: ParticipantSettings = state
        .gateway
        .authenticated_json(
            &format!("api/participant/{}/settings", participant_id),
            &cookies,
            RequestOptions::get(),
        )
        .await?;
    Ok(Json(json!({ "isAnonymous": settings.is_anonymous })))
}

/// The settings form sends `isAnonymous=t` when the box is ticked and nothing otherwise.
pub async fn update_settings(
    State(state): State<AppState>,
    Path(ids): Path<(String, String)>,
    cookies: CookieJar,
    Form(form): Form<SettingsForm>,
) -> Result<Json<Value>, AppError> {
    let participant_id = participant_path(&ids)?;
    let is_anonymous = form.is_anonymous.as_deref() == Some("t");
    let options = RequestOptions::post().json(&json!({ "is_anonymous": is_anonymous }))?;

    state
        .gateway
        .authenticated_request(
            &format!("api/participant/{}/settings", participant_id),
            &cookies,
            options,
        )
        .await?
        .error_for_status()?;
    Ok(Json(json!({ "isAnonymous": is_anonymous })))
}
