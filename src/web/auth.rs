//! Session cookie handling and the logged-in user extractors.

use axum::extract::FromRequestParts;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use std::convert::Infallible;
use tracing::error;

use super::server::AppState;
use crate::types::{User, UserId};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "sessionid";

/// Read the session token from the request's `Cookie` headers.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// `Set-Cookie` value that starts a session.
pub fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    )
}

/// `Set-Cookie` value that ends a session.
pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// Attach a `Set-Cookie` header to a response.
pub fn with_cookie(mut response: Response, cookie: &str) -> Response {
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
        }
        Err(e) => error!("Invalid cookie value: {}", e),
    }
    response
}

fn login_redirect(parts: &Parts) -> Response {
    let next = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/tasks/");
    Redirect::to(&format!("/signin/?next={}", urlencoding::encode(next))).into_response()
}

fn lookup_user(parts: &Parts, state: &AppState) -> Result<Option<(User, String)>, Response> {
    let Some(token) = session_token(&parts.headers) else {
        return Ok(None);
    };
    match state.db().session_user(&token) {
        Ok(user) => Ok(user.map(|u| (u, token))),
        Err(e) => {
            error!("Session lookup failed: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
    }
}

/// The authenticated caller. Requests without a valid session are redirected
/// to the sign-in page.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

impl CurrentUser {
    pub fn id(&self) -> UserId {
        self.user.id
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match lookup_user(parts, state)? {
            Some((user, token)) => Ok(CurrentUser { user, token }),
            None => Err(login_redirect(parts)),
        }
    }
}

/// The caller if logged in, for pages that render either way.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = lookup_user(parts, state)
            .ok()
            .flatten()
            .map(|(user, token)| CurrentUser { user, token });
        Ok(MaybeUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_session_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; sessionid=abc123; x=1"));
        assert_eq!(session_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn empty_or_missing_session_is_none() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);
        headers.insert(COOKIE, HeaderValue::from_static("sessionid="));
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn cookie_attributes() {
        let cookie = session_cookie("tok", 60);
        assert!(cookie.starts_with("sessionid=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(clear_session_cookie().contains("Max-Age=0"));
    }
}
