//! Navigation shown around every page: title, title link and the links a
//! participant (or an anonymous visitor) gets for a tournament.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::api_segment;
use crate::cookies::{participant_id_in_tournament, CookieJar};
use crate::error::{AppError, GatewayError};
use crate::gateway::{ApiGateway, RequestOptions};
use crate::state::AppState;

const DEFAULT_TITLE: &str = "OpenTab";

#[derive(Debug, Deserialize)]
pub struct LayoutQuery {
    #[serde(default = "root_path")]
    pub path: String,
    pub participant_id: Option<String>,
}

fn root_path() -> String {
    "/".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavLink {
    pub name: String,
    pub url: String,
}

impl NavLink {
    fn new(name: &str, url: String) -> Self {
        Self {
            name: name.to_string(),
            url,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutInfo {
    pub is_authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_identifier: Option<String>,
    pub page_title: String,
    pub title_link: String,
    pub additional_links: Vec<NavLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tournament_id: Option<String>,
    pub hide_navbar: bool,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    #[serde(default)]
    identifier: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserTournamentInfo {
    #[serde(default)]
    participant_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ParticipantInfo {
    pub tournament_name: String,
    #[serde(default)]
    pub can_edit_clashes: bool,
    pub role: ParticipantRole,
}

#[derive(Debug, Deserialize)]
pub struct ParticipantRole {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub struct PublicTournamentInfo {
    pub tournament_name: String,
    #[serde(default)]
    pub show_tab: bool,
    #[serde(default)]
    pub show_participants: bool,
}

struct TournamentNav {
    tournament_id: String,
    title: String,
    links: Vec<NavLink>,
}

pub async fn layout(
    State(state): State<AppState>,
    Query(query): Query<LayoutQuery>,
    cookies: CookieJar,
) -> Result<Json<LayoutInfo>, AppError> {
    // Any failure here just means the visitor is anonymous.
    let user = state
        .gateway
        .authenticated_json::<UserInfo, _>("api/user", &cookies, RequestOptions::get())
        .await
        .map_err(|e| debug!(error = %e, "No user for layout"))
        .ok();

    let hide_navbar = hide_navbar(&query.path);

    let info = match tournament_id_from_path(&query.path) {
        Some(tournament_id) => {
            let participant_id = query.participant_id.as_deref().map(api_segment).transpose()?;
            let nav = tournament_nav(
                &state.gateway,
                &cookies,
                api_segment(tournament_id)?,
                participant_id,
            )
            .await?;
            LayoutInfo {
                is_authenticated: user.is_some(),
                user_identifier: user.and_then(|u| u.identifier),
                page_title: nav.title,
                title_link: format!("/tournament/{}", nav.tournament_id),
                additional_links: nav.links,
                tournament_id: Some(nav.tournament_id),
                hide_navbar,
            }
        }
        None => LayoutInfo {
            is_authenticated: user.is_some(),
            user_identifier: user.and_then(|u| u.identifier),
            page_title: DEFAULT_TITLE.to_string(),
            title_link: "/".to_string(),
            additional_links: Vec::new(),
            tournament_id: None,
            hide_navbar,
        },
    };

    Ok(Json(info))
}

async fn tournament_nav(
    gateway: &ApiGateway,
    cookies: &CookieJar,
    tournament_id: &str,
    participant_id: Option<&str>,
) -> Result<TournamentNav, GatewayError> {
    let participant_id = match participant_id.or_else(|| {
        participant_id_in_tournament(cookies, tournament_id).and_then(|id| api_segment(id).ok())
    }) {
        Some(id) => Some(id.to_string()),
        None => gateway
            .authenticated_json::<UserTournamentInfo, _>(
                &format!("api/user/tournament/{}", tournament_id),
                cookies,
                RequestOptions::get(),
            )
            .await
            .ok()
            .and_then(|info| info.participant_id),
    };

    let participant = match &participant_id {
        Some(id) => gateway
            .authenticated_json::<ParticipantInfo, _>(
                &format!("api/participant/{}/info", id),
                cookies,
                RequestOptions::get(),
            )
            .await
            .map_err(|e| debug!(error = %e, "Participant info unavailable"))
            .ok(),
        None => None,
    };

    if let (Some(id), Some(info)) = (&participant_id, participant) {
        return Ok(TournamentNav {
            tournament_id: tournament_id.to_string(),
            links: participant_links(tournament_id, id, &info),
            title: info.tournament_name,
        });
    }

    let path = format!("api/tournament/{}/public", tournament_id);
    let response = match gateway
        .authenticated_request(&path, cookies, RequestOptions::get())
        .await
    {
        // Anonymous visitors still get the public view.
        Err(GatewayError::MissingCredential(_)) => {
            gateway.request(&path, RequestOptions::get()).await?
        }
        other => other?,
    };
    let public: PublicTournamentInfo = response.error_for_status()?.json()?;

    Ok(TournamentNav {
        tournament_id: tournament_id.to_string(),
        links: public_links(tournament_id, &public),
        title: public.tournament_name,
    })
}

pub fn participant_links(
    tournament_id: &str,
    participant_id: &str,
    info: &ParticipantInfo,
) -> Vec<NavLink> {
    let base = format!("/tournament/{}", tournament_id);
    let mut links = vec![
        NavLink::new("Overview", format!("{}/home", base)),
        NavLink::new("Tab", format!("{}/tab", base)),
    ];
    if info.can_edit_clashes {
        links.push(NavLink::new(
            "Clashes",
            format!("{}/home/{}/clashes", base, participant_id),
        ));
    }
    links.push(NavLink::new(
        "Settings",
        format!("{}/home/{}/settings", base, participant_id),
    ));
    links.push(NavLink::new("Participants", format!("{}/participants", base)));
    if info.role.kind == "Adjudicator" {
        links.push(NavLink::new(
            "Feedback",
            format!("{}/home/{}/feedback", base, participant_id),
        ));
    }
    links
}

pub fn public_links(tournament_id: &str, info: &PublicTournamentInfo) -> Vec<NavLink> {
    let base = format!("/tournament/{}", tournament_id);
    let mut links = vec![NavLink::new("Overview", format!("{}/public", base))];
    if info.show_tab {
        links.push(NavLink::new("Tab", format!("{}/tab", base)));
    }
    if info.show_participants {
        links.push(NavLink::new("Participants", format!("{}/participants", base)));
    }
    links
}

/// `/tournament/<id>/...` yields `<id>`.
pub fn tournament_id_from_path(path: &str) -> Option<&str> {
    let mut segments = path.trim_start_matches('/').split('/');
    match (segments.next(), segments.next()) {
        (Some("tournament"), Some(id)) if !id.is_empty() => Some(id),
        _ => None,
    }
}

/// Presentation pages (`/tournament/<id>/admin/round/<id>/presentation...`) run full screen.
pub fn hide_navbar(path: &str) -> bool {
    let segments: Vec<&str> = path.split('/').collect();
    segments.windows(6).any(|w| {
        w[0] == "tournament"
            && is_slug(w[1])
            && w[2] == "admin"
            && w[3] == "round"
            && is_slug(w[4])
            && w[5].starts_with("presentation")
    })
}

fn is_slug(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}
