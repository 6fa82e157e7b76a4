//! Request bodies and path parameters for the HTML forms and AJAX endpoints.
//!
//! Every field is optional at the wire level; missing fields come through
//! empty and are reported by validation rather than by a deserializer
//! rejection. Bodies that cannot be decoded at all are answered with a JSON
//! 400, and path ids that are not integers are answered with a 404.

use axum::extract::{Form, FromRequest, FromRequestParts, Json, Path, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::request::Parts;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use tracing::debug;

use super::response::{JsonError, PageError};
use crate::error::{Entity, TaskError};
use crate::types::TaskFields;

/// Field key for problems with the body as a whole.
pub const BODY_ERROR_FIELD: &str = "__all__";

fn undecodable_body(detail: String) -> JsonError {
    debug!("Rejected request body: {}", detail);
    JsonError(TaskError::invalid(BODY_ERROR_FIELD, detail))
}

/// Accepts either `application/json` or urlencoded form bodies.
pub struct FormOrJson<T>(pub T);

impl<T, S> FromRequest<S> for FormOrJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = JsonError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        if is_json {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(|rejection| undecodable_body(rejection.body_text()))?;
            Ok(Self(value))
        } else {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|rejection| undecodable_body(rejection.body_text()))?;
            Ok(Self(value))
        }
    }
}

fn unroutable(parts: &Parts, detail: String) -> TaskError {
    debug!(path = %parts.uri.path(), "Rejected path parameters: {}", detail);
    TaskError::NotFound {
        entity: Entity::Task,
        id: parts.uri.path().to_string(),
    }
}

/// Path ids for page routes. Ids that do not parse render the 404 page.
pub struct PagePath<T>(pub T);

impl<T, S> FromRequestParts<S> for PagePath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = PageError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => Err(PageError(unroutable(parts, rejection.body_text()))),
        }
    }
}

/// Path ids for JSON routes. Ids that do not parse get a 404 JSON body.
pub struct ApiPath<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = JsonError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => Err(JsonError(unroutable(parts, rejection.body_text()))),
        }
    }
}

/// A checkbox arrives as `"on"` from a browser form or as a JSON boolean.
#[derive(Deserialize)]
#[serde(untagged)]
enum Checkbox {
    Bool(bool),
    Text(String),
}

/// Unchecked boxes are simply absent from a form body; the few strings
/// that still mean "off" are accepted for API clients.
pub fn checkbox_value(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "false" | "0" | "off"
    )
}

fn deserialize_checkbox<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Checkbox>::deserialize(deserializer)? {
        Some(Checkbox::Bool(b)) => b,
        Some(Checkbox::Text(s)) => checkbox_value(&s),
        None => false,
    })
}

/// Task and subtask form.
#[derive(Debug, Default, Deserialize)]
pub struct TaskForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "deserialize_checkbox")]
    pub important: bool,
}

impl TaskForm {
    /// Normalise into store fields. Validation happens in [`TaskFields::validate`].
    pub fn into_fields(self) -> TaskFields {
        TaskFields {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            important: self.important,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SigninForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: String,
}

/// Query string carried by redirects.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub next: Option<String>,
}

impl PageParams {
    pub fn message(&self) -> &str {
        self.msg.as_deref().unwrap_or("")
    }
}

/// Only local absolute paths are followed after login.
pub fn safe_next(next: &str) -> Option<&str> {
    let next = next.trim();
    (next.starts_with('/') && !next.starts_with("//") && !next.contains('\\')).then_some(next)
}
