//! Sign-up, sign-in and logout.

use axum::extract::{Form, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use tracing::{info, warn};

use super::auth::{MaybeUser, clear_session_cookie, session_cookie, session_token, with_cookie};
use super::forms::{PageParams, SigninForm, SignupForm, safe_next};
use super::response::PageError;
use super::server::AppState;
use super::templates::{self, html_escape, render};
use crate::error::TaskError;
use crate::types::User;

pub const PASSWORD_MISMATCH: &str = "Passwords do not match";
pub const BAD_CREDENTIALS: &str = "Username or password is incorrect";

fn signup_page(username: &str, error: Option<&str>) -> Html<String> {
    let username = html_escape(username);
    let error = templates::error_html(error);
    let content = render(
        templates::SIGNUP_TEMPLATE,
        &[("username", username.as_str()), ("error", error.as_str())],
    );
    Html(templates::page("Registrarse", None, "", &content))
}

fn signin_page(username: &str, next: &str, error: Option<&str>) -> Html<String> {
    let username = html_escape(username);
    let next = html_escape(next);
    let error = templates::error_html(error);
    let content = render(
        templates::SIGNIN_TEMPLATE,
        &[
            ("username", username.as_str()),
            ("next", next.as_str()),
            ("error", error.as_str()),
        ],
    );
    Html(templates::page("Iniciar sesión", None, "", &content))
}

/// Open a session for `user` and redirect with the cookie set.
fn login(state: &AppState, user: &User, to: &str) -> Result<Response, TaskError> {
    let ttl = state.session_ttl();
    let token = state.db().create_session(user.id, ttl)?;
    info!(user_id = user.id.0, username = %user.username, "User logged in");
    Ok(with_cookie(
        Redirect::to(to).into_response(),
        &session_cookie(&token, ttl.num_seconds()),
    ))
}

pub async fn signup_form(user: MaybeUser) -> Response {
    if user.0.is_some() {
        return Redirect::to("/tasks/").into_response();
    }
    signup_page("", None).into_response()
}

pub async fn signup(
    State(state): State<AppState>,
    Form(form): Form<SignupForm>,
) -> Result<Response, PageError> {
    if form.password1 != form.password2 {
        return Ok((
            StatusCode::BAD_REQUEST,
            signup_page(&form.username, Some(PASSWORD_MISMATCH)),
        )
            .into_response());
    }

    match state.db().create_user(&form.username, &form.password1) {
        Ok(user) => Ok(login(&state, &user, "/tasks/")?),
        Err(TaskError::Integrity(message)) => Ok((
            StatusCode::BAD_REQUEST,
            signup_page(&form.username, Some(&message)),
        )
            .into_response()),
        Err(TaskError::Validation(errors)) => {
            let message = errors.to_string();
            Ok((
                StatusCode::BAD_REQUEST,
                signup_page(&form.username, Some(&message)),
            )
                .into_response())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn signin_form(user: MaybeUser, Query(params): Query<PageParams>) -> Response {
    if user.0.is_some() {
        return Redirect::to("/tasks/").into_response();
    }
    signin_page("", params.next.as_deref().unwrap_or(""), None).into_response()
}

pub async fn signin(
    State(state): State<AppState>,
    Form(form): Form<SigninForm>,
) -> Result<Response, PageError> {
    match state.db().authenticate(&form.username, &form.password)? {
        Some(user) => {
            let to = safe_next(&form.next).unwrap_or("/tasks/");
            Ok(login(&state, &user, to)?)
        }
        None => {
            warn!(username = %form.username, "Failed sign-in attempt");
            Ok((
                StatusCode::BAD_REQUEST,
                signin_page(&form.username, &form.next, Some(BAD_CREDENTIALS)),
            )
                .into_response())
        }
    }
}

/// End the current session, if any, and return to the home page.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        if let Err(e) = state.db().delete_session(&token) {
            warn!("Failed to delete session: {}", e);
        }
    }
    with_cookie(Redirect::to("/").into_response(), &clear_session_cookie())
}
