//! Subtask endpoints. Mutations answer with JSON for the detail page's scripts.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use serde::Serialize;
use tracing::error;

use super::auth::CurrentUser;
use super::forms::{ApiPath, FormOrJson, PagePath, TaskForm};
use super::response::{JsonError, NOT_FOUND_MESSAGE, PageError, json_error};
use super::server::AppState;
use super::templates::{self, html_escape, render};
use crate::error::TaskError;
use crate::types::{Task, TaskFields};

pub const CREATED_MESSAGE: &str = "Subtarea creada con éxito.";
pub const UPDATED_MESSAGE: &str = "Subtarea actualizada con éxito.";
pub const DELETED_MESSAGE: &str = "Subtarea eliminada con éxito.";
pub const COMPLETED_MESSAGE: &str = "Subtarea completada con éxito.";
pub const REOPENED_MESSAGE: &str = "Subtarea marcada como incompleta.";
pub const TOGGLE_FAILED_MESSAGE: &str = "Error al actualizar la finalización de la subtarea";
pub const TOGGLE_NOT_ALLOWED_MESSAGE: &str = "Método no permitido para completar la subtarea";
pub const DELETE_NOT_ALLOWED_MESSAGE: &str = "Método no permitido para eliminar la subtarea";

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: &'static str,
}

/// Response of the completion toggle.
#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub message: &'static str,
    pub completed: bool,
    pub all_subtasks_completed: bool,
}

fn message(message: &'static str) -> Json<MessageResponse> {
    Json(MessageResponse { message })
}

fn form_page(
    user: &CurrentUser,
    heading: &str,
    parent: &Task,
    action: &str,
    fields: &TaskFields,
) -> Html<String> {
    let heading_html = html_escape(heading);
    let task_id = parent.id.to_string();
    let parent_title = html_escape(&parent.title);
    let action = html_escape(action);
    let form = templates::task_form_fields(fields, None, true);
    let content = render(
        templates::SUBTASK_FORM_TEMPLATE,
        &[
            ("heading", heading_html.as_str()),
            ("task_id", task_id.as_str()),
            ("parent_title", parent_title.as_str()),
            ("action", action.as_str()),
            ("form", form.as_str()),
        ],
    );
    Html(templates::page(heading, Some(&user.user), "", &content))
}

/// Form for a new subtask.
pub async fn create_form(
    State(state): State<AppState>,
    user: CurrentUser,
    PagePath(task_id): PagePath<i64>,
) -> Result<Html<String>, PageError> {
    let parent = state.db().get_task(user.id(), task_id)?;
    Ok(form_page(
        &user,
        "Nueva subtarea",
        &parent,
        &format!("/tasks/{}/subtasks/create/", parent.id),
        &TaskFields::default(),
    ))
}

pub async fn create_subtask(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath(task_id): ApiPath<i64>,
    FormOrJson(form): FormOrJson<TaskForm>,
) -> Result<Response, JsonError> {
    // The parent check comes first so an unknown parent is a 404 even with a bad form.
    state.db().get_task(user.id(), task_id)?;
    state
        .db()
        .create_task(user.id(), &form.into_fields(), Some(task_id))?;
    Ok(message(CREATED_MESSAGE).into_response())
}

/// Read-only view of one subtask.
pub async fn subtask_detail(
    State(state): State<AppState>,
    user: CurrentUser,
    PagePath((task_id, subtask_id)): PagePath<(i64, i64)>,
) -> Result<Html<String>, PageError> {
    let parent = state.db().get_task(user.id(), task_id)?;
    let subtask = state.db().get_subtask(user.id(), task_id, subtask_id)?;

    let (status_badge, status_label) = if subtask.completed() {
        ("badge-success", "Completada")
    } else {
        ("badge-pending", "Pendiente")
    };
    let task_id = parent.id.to_string();
    let subtask_id = subtask.id.to_string();
    let parent_title = html_escape(&parent.title);
    let title = html_escape(&subtask.title);
    let description = html_escape(&subtask.description);
    let created_at = templates::format_timestamp(Some(subtask.created_at));
    let completed_at = templates::format_timestamp(subtask.completed_at);

    let content = render(
        templates::SUBTASK_DETAIL_TEMPLATE,
        &[
            ("task_id", task_id.as_str()),
            ("subtask_id", subtask_id.as_str()),
            ("parent_title", parent_title.as_str()),
            ("subtask_title", title.as_str()),
            ("subtask_description", description.as_str()),
            ("status_badge", status_badge),
            ("status_label", status_label),
            ("important", if subtask.important { " &#9733; Importante" } else { "" }),
            ("created_at", created_at.as_str()),
            ("completed_at", completed_at.as_str()),
        ],
    );
    Ok(Html(templates::page(
        &subtask.title,
        Some(&user.user),
        "",
        &content,
    )))
}

/// Edit form for a subtask.
pub async fn update_form(
    State(state): State<AppState>,
    user: CurrentUser,
    PagePath((task_id, subtask_id)): PagePath<(i64, i64)>,
) -> Result<Html<String>, PageError> {
    let parent = state.db().get_task(user.id(), task_id)?;
    let subtask = state.db().get_subtask(user.id(), task_id, subtask_id)?;
    let fields = TaskFields {
        title: subtask.title,
        description: subtask.description,
        important: subtask.important,
    };
    Ok(form_page(
        &user,
        "Editar subtarea",
        &parent,
        &format!("/tasks/{}/subtasks/{}/update/", task_id, subtask_id),
        &fields,
    ))
}

pub async fn update_subtask(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath((task_id, subtask_id)): ApiPath<(i64, i64)>,
    FormOrJson(form): FormOrJson<TaskForm>,
) -> Result<Response, JsonError> {
    state.db().get_subtask(user.id(), task_id, subtask_id)?;
    state
        .db()
        .update_subtask(user.id(), task_id, subtask_id, &form.into_fields())?;
    Ok(message(UPDATED_MESSAGE).into_response())
}

/// Flip a subtask's completion and report whether its siblings are all done.
pub async fn toggle_completion(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath((task_id, subtask_id)): ApiPath<(i64, i64)>,
) -> Response {
    match state
        .db()
        .toggle_subtask_completion(user.id(), task_id, subtask_id)
    {
        Ok(outcome) => Json(ToggleResponse {
            message: if outcome.completed {
                COMPLETED_MESSAGE
            } else {
                REOPENED_MESSAGE
            },
            completed: outcome.completed,
            all_subtasks_completed: outcome.all_subtasks_completed,
        })
        .into_response(),
        Err(TaskError::NotFound { .. }) => json_error(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE),
        Err(e) => {
            error!(
                task_id,
                subtask_id,
                user_id = user.id().0,
                "Failed to toggle subtask completion: {}",
                e
            );
            json_error(StatusCode::BAD_REQUEST, TOGGLE_FAILED_MESSAGE)
        }
    }
}

pub async fn toggle_not_allowed() -> JsonError {
    JsonError(TaskError::MethodNotAllowed(
        TOGGLE_NOT_ALLOWED_MESSAGE.to_string(),
    ))
}

pub async fn delete_subtask(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiPath((task_id, subtask_id)): ApiPath<(i64, i64)>,
) -> Result<Response, JsonError> {
    state.db().delete_subtask(user.id(), task_id, subtask_id)?;
    Ok(message(DELETED_MESSAGE).into_response())
}

pub async fn delete_not_allowed() -> JsonError {
    JsonError(TaskError::MethodNotAllowed(
        DELETE_NOT_ALLOWED_MESSAGE.to_string(),
    ))
}
