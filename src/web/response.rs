//! Mapping of [`TaskError`] onto HTTP responses.
//!
//! HTML pages get an error page; AJAX endpoints get a JSON body with an
//! `error` message and, for validation failures, an `errors` field map.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Redirect, Response};
use serde_json::json;
use tracing::error;

use super::templates;
use crate::error::TaskError;

pub const INVALID_FORM_MESSAGE: &str = "Formulario inválido.";
pub const NOT_FOUND_MESSAGE: &str = "No encontrado.";

/// HTTP status for an error.
pub fn status_for(err: &TaskError) -> StatusCode {
    match err {
        TaskError::Validation(_) | TaskError::Integrity(_) => StatusCode::BAD_REQUEST,
        TaskError::NotFound { .. } => StatusCode::NOT_FOUND,
        TaskError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
        TaskError::Database(_) | TaskError::Migration(_) | TaskError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn log_if_internal(err: &TaskError) {
    if status_for(err).is_server_error() {
        error!(code = ?err.code(), "Request failed: {}", err);
    }
}

/// Error rendered as an HTML page.
#[derive(Debug)]
pub struct PageError(pub TaskError);

impl From<TaskError> for PageError {
    fn from(err: TaskError) -> Self {
        Self(err)
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        log_if_internal(&self.0);
        let status = status_for(&self.0);
        let message = match &self.0 {
            TaskError::NotFound { .. } => NOT_FOUND_MESSAGE.to_string(),
            _ if status.is_server_error() => "Ha ocurrido un error inesperado.".to_string(),
            err => err.to_string(),
        };
        (status, Html(error_page(status, &message))).into_response()
    }
}

pub fn error_page(status: StatusCode, message: &str) -> String {
    let status_text = status.to_string();
    let message = templates::html_escape(message);
    let content = templates::render(
        templates::ERROR_TEMPLATE,
        &[
            ("status", status_text.as_str()),
            ("message", message.as_str()),
        ],
    );
    templates::page(&status_text, None, "", &content)
}

/// Error rendered as JSON for AJAX endpoints.
#[derive(Debug)]
pub struct JsonError(pub TaskError);

impl From<TaskError> for JsonError {
    fn from(err: TaskError) -> Self {
        Self(err)
    }
}

impl IntoResponse for JsonError {
    fn into_response(self) -> Response {
        log_if_internal(&self.0);
        let status = status_for(&self.0);
        let body = match &self.0 {
            TaskError::Validation(errors) => json!({
                "error": INVALID_FORM_MESSAGE,
                "errors": errors,
            }),
            TaskError::NotFound { .. } => json!({ "error": NOT_FOUND_MESSAGE }),
            err => json!({ "error": err.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

/// JSON body with a bare error message and an explicit status.
pub fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Redirect carrying a flash message in the query string.
pub fn redirect_with_message(path: &str, message: &str) -> Response {
    Redirect::to(&format!("{}?msg={}", path, urlencoding::encode(message))).into_response()
}
