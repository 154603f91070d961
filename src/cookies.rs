//! Request-scoped cookie access.
//!
//! The gateway only ever reads cookies through [`CookieSource`]. The routes
//! that issue or revoke credentials build `Set-Cookie` values with
//! [`set_cookie`] and [`removal_cookie`].

use std::collections::{BTreeMap, HashMap};
use std::convert::Infallible;

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use http::{header, HeaderMap, HeaderValue};

/// Cookie holding the bearer token for the API.
pub const TOKEN_COOKIE: &str = "token";
/// Cookie holding the logged-in user's id.
pub const USER_ID_COOKIE: &str = "user_id";

const PARTICIPANT_COOKIE_PREFIX: &str = "participant_id:";

/// Read-only cookie lookup.
pub trait CookieSource {
    fn get(&self, name: &str) -> Option<&str>;
}

impl CookieSource for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<&str> {
        HashMap::get(self, name).map(String::as_str)
    }
}

impl CookieSource for BTreeMap<String, String> {
    fn get(&self, name: &str) -> Option<&str> {
        BTreeMap::get(self, name).map(String::as_str)
    }
}

/// Cookies sent with an incoming request.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    cookies: Vec<(String, String)>,
}

impl CookieJar {
    /// Parses every `Cookie` header. The first occurrence of a name wins and
    /// pairs without `=` are skipped.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut cookies: Vec<(String, String)> = Vec::new();
        for value in headers.get_all(header::COOKIE) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            for pair in value.split(';') {
                let Some((name, value)) = pair.trim().split_once('=') else {
                    continue;
                };
                let name = name.trim();
                if name.is_empty() || cookies.iter().any(|(n, _)| n == name) {
                    continue;
                }
                cookies.push((name.to_string(), value.trim().to_string()));
            }
        }
        Self { cookies }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cookies.iter().map(|(name, _)| name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

impl CookieSource for CookieJar {
    fn get(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value.as_str())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CookieJar
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

/// `Set-Cookie` value for a site-wide, HTTP-only cookie.
pub fn set_cookie(name: &str, value: &str, secure: bool) -> Option<HeaderValue> {
    let mut cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", name, value);
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).ok()
}

/// `Set-Cookie` value that expires `name` immediately.
pub fn removal_cookie(name: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!("{}=; Path=/; Max-Age=0", name)).ok()
}

/// Name of the cookie remembering which participant the user acts as in a tournament.
pub fn participant_cookie_name(tournament_id: &str) -> String {
    format!("{}{}", PARTICIPANT_COOKIE_PREFIX, tournament_id)
}

pub fn is_participant_cookie(name: &str) -> bool {
    name.starts_with(PARTICIPANT_COOKIE_PREFIX)
}

pub fn participant_id_in_tournament<'a, C>(cookies: &'a C, tournament_id: &str) -> Option<&'a str>
where
    C: CookieSource + ?Sized,
{
    cookies.get(&participant_cookie_name(tournament_id))
}
