//! Web front end.
//!
//! Server-rendered HTML pages for the task lists and forms, plus JSON
//! endpoints used by the detail page's scripts for subtask mutations.

mod accounts;
pub mod auth;
pub mod forms;
pub mod response;
mod server;
mod subtasks;
mod tasks;
pub mod templates;

pub use server::{AppState, HealthResponse, build_router, serve};
