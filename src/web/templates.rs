//! HTML templates for the web UI.
//!
//! Templates are embedded at compile time using `include_str!` and filled by
//! replacing `{{name}}` placeholders. Values are inserted verbatim, so callers
//! escape anything user-supplied with [`html_escape`].

use crate::error::FieldErrors;
use crate::types::{Task, TaskFields, User};

/// Page layout with navigation and flash message slot.
pub const BASE_TEMPLATE: &str = include_str!("templates/base.html");

pub const HOME_TEMPLATE: &str = include_str!("templates/home.html");

pub const SIGNUP_TEMPLATE: &str = include_str!("templates/signup.html");

pub const SIGNIN_TEMPLATE: &str = include_str!("templates/signin.html");

/// Pending and completed task lists share one template.
pub const TASKS_TEMPLATE: &str = include_str!("templates/tasks.html");

pub const CREATE_TASK_TEMPLATE: &str = include_str!("templates/create_task.html");

/// Task detail with edit form and the subtask panel.
pub const TASK_DETAIL_TEMPLATE: &str = include_str!("templates/task_detail.html");

/// Create and update forms for subtasks.
pub const SUBTASK_FORM_TEMPLATE: &str = include_str!("templates/subtask_form.html");

pub const SUBTASK_DETAIL_TEMPLATE: &str = include_str!("templates/subtask_detail.html");

pub const ERROR_TEMPLATE: &str = include_str!("templates/error.html");

/// Substitute `{{name}}` placeholders in a single pass.
///
/// Unknown placeholders are left as they are. Substituted text is never
/// rescanned, so values cannot inject further placeholders.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let name = after[..end].trim();
                match vars.iter().find(|(k, _)| *k == name) {
                    Some((_, value)) => out.push_str(value),
                    None => out.push_str(&rest[start..start + 2 + end + 2]),
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Wrap page content in the base layout.
pub fn page(title: &str, user: Option<&User>, message: &str, content: &str) -> String {
    let nav = match user {
        Some(user) => format!(
            r#"<a href="/tasks/">Tareas pendientes</a>
            <a href="/tasks_completed/">Tareas completadas</a>
            <a href="/tasks/create/">Crear tarea</a>
            <span class="nav-user">{}</span>
            <a href="/logout/">Cerrar sesión</a>"#,
            html_escape(&user.username)
        ),
        None => r#"<a href="/signin/">Iniciar sesión</a>
            <a href="/signup/">Registrarse</a>"#
            .to_string(),
    };

    let title = html_escape(title);
    let message = flash_html(message);
    render(
        BASE_TEMPLATE,
        &[
            ("title", title.as_str()),
            ("nav", nav.as_str()),
            ("message", message.as_str()),
            ("content", content),
        ],
    )
}

/// Render the flash message carried by a redirect.
pub fn flash_html(message: &str) -> String {
    if message.is_empty() {
        return String::new();
    }
    format!(
        r#"<div class="message message-success">{}</div>"#,
        html_escape(message)
    )
}

/// Inline error block for form-level errors.
pub fn error_html(error: Option<&str>) -> String {
    match error {
        Some(text) if !text.is_empty() => format!(
            r#"<div class="message message-error">{}</div>"#,
            html_escape(text)
        ),
        _ => String::new(),
    }
}

fn field_errors_html(errors: Option<&FieldErrors>, field: &str) -> String {
    let Some(messages) = errors.and_then(|e| e.get(field)) else {
        return String::new();
    };
    let items: String = messages
        .iter()
        .map(|m| format!("<li>{}</li>", html_escape(m)))
        .collect();
    format!(r#"<ul class="errorlist">{}</ul>"#, items)
}

/// Title, description and importance inputs for a task or subtask.
pub fn task_form_fields(
    fields: &TaskFields,
    errors: Option<&FieldErrors>,
    subtask: bool,
) -> String {
    let (title_placeholder, description_placeholder) = if subtask {
        (
            "Escribe un título de subtarea",
            "Escribe una descripción de subtarea",
        )
    } else {
        ("Escribe un título", "Escribe una descripción")
    };

    format!(
        r#"{title_errors}<input type="text" name="title" class="form-control" maxlength="100" placeholder="{title_placeholder}" value="{title}" required>
        {description_errors}<textarea name="description" class="form-control" placeholder="{description_placeholder}">{description}</textarea>
        <label class="form-check"><input type="checkbox" name="important" class="form-check-input m-auto"{checked}> Importante</label>
        {parent_errors}"#,
        title_errors = field_errors_html(errors, "title"),
        title_placeholder = title_placeholder,
        title = html_escape(&fields.title),
        description_errors = field_errors_html(errors, "description"),
        description_placeholder = description_placeholder,
        description = html_escape(&fields.description),
        checked = if fields.important { " checked" } else { "" },
        parent_errors = field_errors_html(errors, "parent"),
    )
}

/// Format a timestamp in milliseconds as a UTC date string.
pub fn format_timestamp(ms: Option<i64>) -> String {
    ms.and_then(chrono::DateTime::from_timestamp_millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Table rows for a task list.
pub fn task_rows(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return r#"<tr><td colspan="4" class="empty-state">No hay tareas</td></tr>"#.to_string();
    }

    tasks
        .iter()
        .map(|task| {
            format!(
                r#"<tr class="{class}">
                    <td><a href="/tasks/{id}/">{title}</a></td>
                    <td>{important}</td>
                    <td>{created}</td>
                    <td>{completed}</td>
                </tr>"#,
                class = if task.important { "task-important" } else { "" },
                id = task.id,
                title = html_escape(&task.title),
                important = if task.important { "&#9733;" } else { "" },
                created = format_timestamp(Some(task.created_at)),
                completed = format_timestamp(task.completed_at),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// List items for the subtask panel on the detail page.
pub fn subtask_items(parent_id: i64, subtasks: &[Task]) -> String {
    if subtasks.is_empty() {
        return r#"<li class="empty-state">Sin subtareas</li>"#.to_string();
    }

    subtasks
        .iter()
        .map(|sub| {
            format!(
                r#"<li class="subtask{done_class}" data-subtask-id="{sid}">
                    <input type="checkbox" class="subtask-toggle" data-url="/tasks/{pid}/subtasks/{sid}/toggle_completion/"{checked}>
                    <a href="/tasks/{pid}/subtasks/{sid}/">{title}</a>{important}
                    <a href="/tasks/{pid}/subtasks/{sid}/update/" class="btn btn-sm">Editar</a>
                    <button type="button" class="btn btn-sm btn-danger subtask-delete" data-url="/tasks/{pid}/subtasks/{sid}/delete/">Eliminar</button>
                </li>"#,
                done_class = if sub.completed() { " subtask-done" } else { "" },
                pid = parent_id,
                sid = sub.id,
                checked = if sub.completed() { " checked" } else { "" },
                title = html_escape(&sub.title),
                important = if sub.important { " &#9733;" } else { "" },
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Escape HTML special characters.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
