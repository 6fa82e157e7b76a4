//! HTTP server: shared state, routing and the listener loop.

use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Json},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::auth::MaybeUser;
use super::response::error_page;
use super::templates::{self, render};
use super::{accounts, subtasks, tasks};
use crate::config::Config;
use crate::db::Database;

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    db: Arc<Database>,
    session_ttl: chrono::Duration,
}

impl AppState {
    pub fn new(db: Arc<Database>, session_ttl: chrono::Duration) -> Self {
        Self { db, session_ttl }
    }

    /// Get the database reference.
    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    /// Lifetime of newly created login sessions.
    pub fn session_ttl(&self) -> chrono::Duration {
        self.session_ttl
    }
}

/// Health check response.
#[derive(Debug, serde::Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Landing page.
async fn home(user: MaybeUser) -> Html<String> {
    let actions = match &user.0 {
        Some(_) => r#"<a class="btn" href="/tasks/">Ver mis tareas</a>
    <a class="btn" href="/tasks/create/">Crear tarea</a>"#,
        None => r#"<a class="btn" href="/signup/">Registrarse</a>
    <a class="btn" href="/signin/">Iniciar sesión</a>"#,
    };
    let content = render(templates::HOME_TEMPLATE, &[("actions", actions)]);
    Html(templates::page(
        "Inicio",
        user.0.as_ref().map(|u| &u.user),
        "",
        &content,
    ))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Html(error_page(StatusCode::NOT_FOUND, "Página no encontrada.")),
    )
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        // Accounts
        .route(
            "/signup/",
            get(accounts::signup_form).post(accounts::signup),
        )
        .route(
            "/signin/",
            get(accounts::signin_form).post(accounts::signin),
        )
        .route("/logout/", get(accounts::logout).post(accounts::logout))
        // Tasks
        .route("/tasks/", get(tasks::list_pending))
        .route("/tasks_completed/", get(tasks::list_completed))
        .route(
            "/tasks/create/",
            get(tasks::create_form).post(tasks::create_task),
        )
        .route(
            "/tasks/{task_id}/",
            get(tasks::task_detail).post(tasks::update_task),
        )
        .route(
            "/tasks/{task_id}/complete/",
            post(tasks::complete_task).fallback(tasks::action_not_allowed),
        )
        .route(
            "/tasks/{task_id}/delete/",
            post(tasks::delete_task).fallback(tasks::action_not_allowed),
        )
        // Subtasks
        .route(
            "/tasks/{task_id}/subtasks/create/",
            get(subtasks::create_form).post(subtasks::create_subtask),
        )
        .route(
            "/tasks/{task_id}/subtasks/{subtask_id}/",
            get(subtasks::subtask_detail),
        )
        .route(
            "/tasks/{task_id}/subtasks/{subtask_id}/update/",
            get(subtasks::update_form).post(subtasks::update_subtask),
        )
        .route(
            "/tasks/{task_id}/subtasks/{subtask_id}/toggle_completion/",
            post(subtasks::toggle_completion).fallback(subtasks::toggle_not_allowed),
        )
        .route(
            "/tasks/{task_id}/subtasks/{subtask_id}/delete/",
            post(subtasks::delete_subtask).fallback(subtasks::delete_not_allowed),
        )
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until Ctrl-C.
pub async fn serve(db: Arc<Database>, config: &Config) -> anyhow::Result<()> {
    let state = AppState::new(db, config.session_ttl());
    let app = build_router(state);

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    info!("Task tracker listening on http://{}", bound_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    Ok(())
}
