//! Top-level task pages: lists, create, detail/edit, complete, delete.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

use super::auth::CurrentUser;
use super::forms::{FormOrJson, PagePath, PageParams, TaskForm};
use super::response::{JsonError, PageError, redirect_with_message};
use super::server::AppState;
use super::templates::{self, html_escape, render};
use crate::error::{FieldErrors, TaskError};
use crate::types::{Task, TaskFields, TaskQuery};

fn list_page(
    user: &CurrentUser,
    heading: &str,
    tasks: &[Task],
    message: &str,
) -> Html<String> {
    let heading_html = html_escape(heading);
    let rows = templates::task_rows(tasks);
    let content = render(
        templates::TASKS_TEMPLATE,
        &[("heading", heading_html.as_str()), ("rows", rows.as_str())],
    );
    Html(templates::page(heading, Some(&user.user), message, &content))
}

/// Pending top-level tasks.
pub async fn list_pending(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<PageParams>,
) -> Result<Html<String>, PageError> {
    let tasks = state.db().list_tasks(user.id(), &TaskQuery::pending())?;
    Ok(list_page(&user, "Tareas Pendientes", &tasks, params.message()))
}

/// Completed top-level tasks, most recently completed first.
pub async fn list_completed(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<PageParams>,
) -> Result<Html<String>, PageError> {
    let tasks = state.db().list_tasks(user.id(), &TaskQuery::completed())?;
    Ok(list_page(&user, "Tareas Completadas", &tasks, params.message()))
}

fn create_page(
    user: &CurrentUser,
    fields: &TaskFields,
    errors: Option<&FieldErrors>,
    error: Option<&str>,
) -> Html<String> {
    let form = templates::task_form_fields(fields, errors, false);
    let error = templates::error_html(error);
    let content = render(
        templates::CREATE_TASK_TEMPLATE,
        &[("form", form.as_str()), ("error", error.as_str())],
    );
    Html(templates::page("Crear tarea", Some(&user.user), "", &content))
}

pub async fn create_form(user: CurrentUser) -> Html<String> {
    create_page(&user, &TaskFields::default(), None, None)
}

pub async fn create_task(
    State(state): State<AppState>,
    user: CurrentUser,
    FormOrJson(form): FormOrJson<TaskForm>,
) -> Result<Response, PageError> {
    let fields = form.into_fields();
    match state.db().create_task(user.id(), &fields, None) {
        Ok(_) => Ok(redirect_with_message("/tasks/", "Tarea creada con éxito.")),
        Err(TaskError::Validation(errors)) => Ok((
            StatusCode::BAD_REQUEST,
            create_page(
                &user,
                &fields,
                Some(&errors),
                Some("Ingrese tipos de datos correctos"),
            ),
        )
            .into_response()),
        Err(e) => Err(e.into()),
    }
}

fn detail_page(
    state: &AppState,
    user: &CurrentUser,
    task: &Task,
    fields: &TaskFields,
    errors: Option<&FieldErrors>,
    message: &str,
) -> Result<Html<String>, TaskError> {
    let subtasks = state.db().list_subtasks(user.id(), task.id)?;
    let all_done = state.db().all_subtasks_completed(user.id(), task.id)?;

    let (status_badge, status_label) = if task.completed() {
        ("badge-success", "Completada")
    } else {
        ("badge-pending", "Pendiente")
    };

    let complete_button = if task.completed() || task.is_subtask() {
        String::new()
    } else {
        format!(
            r#"<form method="post" action="/tasks/{}/complete/">
                <button type="submit" class="btn btn-success">Completar</button>
            </form>"#,
            task.id
        )
    };

    let all_subtasks_label = if subtasks.is_empty() {
        "Esta tarea no tiene subtareas."
    } else if all_done {
        "Todas las subtareas están completadas."
    } else {
        "Quedan subtareas pendientes."
    };

    let error = templates::error_html(errors.map(|_| "Error updating task"));
    let task_id = task.id.to_string();
    let title = html_escape(&task.title);
    let created_at = templates::format_timestamp(Some(task.created_at));
    let completed_at = templates::format_timestamp(task.completed_at);
    let form = templates::task_form_fields(fields, errors, task.is_subtask());
    let subtask_html = templates::subtask_items(task.id, &subtasks);
    let all_done_value = all_done.to_string();

    let content = render(
        templates::TASK_DETAIL_TEMPLATE,
        &[
            ("task_id", task_id.as_str()),
            ("task_title", title.as_str()),
            ("status_badge", status_badge),
            ("status_label", status_label),
            ("created_at", created_at.as_str()),
            ("completed_at", completed_at.as_str()),
            ("error", error.as_str()),
            ("form", form.as_str()),
            ("complete_button", complete_button.as_str()),
            ("all_subtasks_completed", all_done_value.as_str()),
            ("all_subtasks_label", all_subtasks_label),
            ("subtasks", subtask_html.as_str()),
        ],
    );

    Ok(Html(templates::page(
        &task.title,
        Some(&user.user),
        message,
        &content,
    )))
}

/// Task detail with its subtasks.
pub async fn task_detail(
    State(state): State<AppState>,
    user: CurrentUser,
    PagePath(task_id): PagePath<i64>,
    Query(params): Query<PageParams>,
) -> Result<Html<String>, PageError> {
    let task = state.db().get_task(user.id(), task_id)?;
    let fields = TaskFields {
        title: task.title.clone(),
        description: task.description.clone(),
        important: task.important,
    };
    Ok(detail_page(
        &state,
        &user,
        &task,
        &fields,
        None,
        params.message(),
    )?)
}

/// Save edits from the detail page.
pub async fn update_task(
    State(state): State<AppState>,
    user: CurrentUser,
    PagePath(task_id): PagePath<i64>,
    FormOrJson(form): FormOrJson<TaskForm>,
) -> Result<Response, PageError> {
    let fields = form.into_fields();
    match state.db().update_task(user.id(), task_id, &fields) {
        Ok(task) => Ok(redirect_with_message(
            &format!("/tasks/{}/", task.id),
            "Tarea actualizada con éxito.",
        )),
        Err(TaskError::Validation(errors)) => {
            let task = state.db().get_task(user.id(), task_id)?;
            let page = detail_page(&state, &user, &task, &fields, Some(&errors), "")?;
            Ok((StatusCode::BAD_REQUEST, page).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Mark a top-level task complete.
pub async fn complete_task(
    State(state): State<AppState>,
    user: CurrentUser,
    PagePath(task_id): PagePath<i64>,
) -> Result<Response, PageError> {
    state.db().complete_task(user.id(), task_id)?;
    Ok(redirect_with_message("/tasks/", "Tarea completada con éxito."))
}

/// Delete a task and its subtasks.
pub async fn delete_task(
    State(state): State<AppState>,
    user: CurrentUser,
    PagePath(task_id): PagePath<i64>,
) -> Result<Response, PageError> {
    state.db().delete_task(user.id(), task_id)?;
    Ok(redirect_with_message("/tasks/", "Tarea eliminada con éxito."))
}

pub const ACTION_NOT_ALLOWED_MESSAGE: &str = "Método no permitido";

/// Fallback for the POST-only task actions.
pub async fn action_not_allowed() -> JsonError {
    JsonError(TaskError::MethodNotAllowed(
        ACTION_NOT_ALLOWED_MESSAGE.to_string(),
    ))
}
