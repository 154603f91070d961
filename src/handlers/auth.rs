use std::collections::BTreeSet;

use axum::{
    extract::{Path, State},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::api_segment;
use crate::cookies::{removal_cookie, set_cookie, CookieJar, TOKEN_COOKIE, USER_ID_COOKIE};
use crate::error::AppError;
use crate::gateway::RequestOptions;
use crate::session::SessionToken;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub user_name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub key: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateAccountForm {
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirmation: String,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct RegistrationResponse {
    participant_id: String,
    #[serde(default)]
    token: Option<String>,
}

/// Exchanges the session cookie for a short-lived token the browser can hold.
pub async fn issue_token(
    State(state): State<AppState>,
    cookies: CookieJar,
) -> Result<Json<SessionToken>, AppError> {
    let options = RequestOptions::post().json(&json!({}))?;
    let token: SessionToken = state
        .gateway
        .authenticated_json("api/tokens", &cookies, options)
        .await?;
    Ok(Json(token))
}

pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let options = RequestOptions::post()
        .json(&json!({}))?
        .basic_auth(format!("mail#{}", form.user_name), Some(form.password));

    let response = state.gateway.request("api/tokens", options).await?;
    if response.status() == StatusCode::UNAUTHORIZED {
        info!(user = %form.user_name, "Rejected login");
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "errors": ["Invalid username or password"] })),
        )
            .into_response());
    }

    let login: LoginResponse = response.error_for_status()?.json()?;

    let mut headers = HeaderMap::new();
    headers.append(
        SET_COOKIE,
        set_cookie(TOKEN_COOKIE, &login.token, state.secure_cookies).ok_or(AppError::InvalidHeader)?,
    );
    headers.append(
        SET_COOKIE,
        set_cookie(USER_ID_COOKIE, &login.user_id, state.secure_cookies)
            .ok_or(AppError::InvalidHeader)?,
    );

    Ok((headers, Redirect::to("/")).into_response())
}

/// Revokes the API token and clears every cookie. If the API refuses, the
/// cookies are left in place.
pub async fn logout(State(state): State<AppState>, cookies: CookieJar) -> Response {
    let revoked = state
        .gateway
        .authenticated_request("api/token", &cookies, RequestOptions::delete())
        .await
        .and_then(|response| response.error_for_status());
    if let Err(e) = revoked {
        warn!(error = %e, "Could not revoke token on logout");
        return Redirect::to("/").into_response();
    }

    let names: BTreeSet<&str> = [TOKEN_COOKIE, USER_ID_COOKIE]
        .into_iter()
        .chain(cookies.names())
        .collect();

    let mut headers = HeaderMap::new();
    for name in names {
        if let Some(value) = removal_cookie(name) {
            headers.append(SET_COOKIE, value);
        }
    }

    (headers, Redirect::to("/")).into_response()
}

/// Redeems a participant registration key.
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    let options = RequestOptions::post().json(&json!({ "secret": form.key }))?;
    let response = state.gateway.request("api/register", options).await?;
    if !response.is_ok() {
        return Ok((response.status(), response.text().into_owned()).into_response());
    }

    let registration: RegistrationResponse = response.json()?;

    let mut headers = HeaderMap::new();
    if let Some(token) = &registration.token {
        headers.append(
            SET_COOKIE,
            set_cookie(TOKEN_COOKIE, token, state.secure_cookies).ok_or(AppError::InvalidHeader)?,
        );
    }

    let target = format!("/tournament/home/{}", registration.participant_id);
    Ok((headers, Redirect::to(&target)).into_response())
}

/// Problems with the form itself, in the order they are shown.
pub fn account_form_errors(form: &CreateAccountForm) -> Vec<String> {
    let mut errors = Vec::new();
    if form.user_name.is_empty() {
        errors.push("Username is required.".to_string());
    }
    if form.password.is_empty() {
        errors.push("Password is required.".to_string());
    }
    if form.password_confirmation != form.password {
        errors.push("Passwords do not match.".to_string());
    }
    errors
}

/// Turns the API's error code into something a person can act on.
/// Unknown codes are shown as they are.
pub fn account_error_message(code: &str) -> String {
    match code {
        "UserExists" => "This user is already registered. Perhaps you meant to log in?".to_string(),
        "PasswordTooShort" => {
            "Your password is too short. It must be at least eight characters long.".to_string()
        }
        "Other" => "Unknown Error".to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct AccountFailure {
    message: AccountFailureMessage,
}

#[derive(Debug, Deserialize)]
struct AccountFailureMessage {
    error: String,
}

fn unprocessable(errors: Vec<String>) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "errors": errors }))).into_response()
}

/// Creates a user account, then sends the browser to the login form.
pub async fn create_account(
    State(state): State<AppState>,
    Form(form): Form<CreateAccountForm>,
) -> Result<Response, AppError> {
    let errors = account_form_errors(&form);
    if !errors.is_empty() {
        return Ok(unprocessable(errors));
    }

    let options = RequestOptions::post().json(&json!({
        "password": form.password,
        "user_email": form.user_name,
    }))?;
    let response = state.gateway.request("api/users", options).await?;
    if response.is_ok() {
        info!(user = %form.user_name, "Created account");
        return Ok(Redirect::to("/login").into_response());
    }

    let message = match response.json::<AccountFailure>() {
        Ok(failure) => account_error_message(&failure.message.error),
        Err(e) => {
            warn!(error = %e, "Unreadable account creation failure");
            account_error_message("Other")
        }
    };
    Ok(unprocessable(vec![message]))
}

#[derive(Debug, Deserialize)]
struct RegistrationInfo {
    #[serde(default)]
    participant_name: Value,
    #[serde(default)]
    tournament_name: Value,
}

/// Who a registration key belongs to, shown before the key is redeemed.
pub async fn registration_info(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Value>, AppError> {
    let info: RegistrationInfo = state
        .gateway
        .public_json(
            &format!("api/register/{}", api_segment(&key)?),
            RequestOptions::get(),
        )
        .await?;

    Ok(Json(json!({
        "key": key,
        "participant_name": info.participant_name,
        "tournament_name": info.tournament_name,
    })))
}
