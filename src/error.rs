//! Error taxonomy shared by the store and the web layer.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    InvalidForm,

    // Not found errors
    TaskNotFound,
    UserNotFound,

    // Request errors
    MethodNotAllowed,

    // Conflict errors
    AlreadyExists,

    // Internal errors
    DatabaseError,
    InternalError,
}

/// Per-field validation messages, keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against a field.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Convert into a `Result`, failing when any message was recorded.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(TaskError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(field, msgs)| format!("{}: {}", field, msgs.join(" ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Kind of record a lookup failed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Task,
    User,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Task => write!(f, "Task"),
            Entity::User => write!(f, "User"),
        }
    }
}

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("invalid input: {0}")]
    Validation(FieldErrors),

    /// Absent, or owned by someone else. The two cases are indistinguishable.
    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: String },

    #[error("{0}")]
    MethodNotAllowed(String),

    #[error("{0}")]
    Integrity(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("migration error: {0}")]
    Migration(#[from] refinery::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl TaskError {
    pub fn task_not_found(id: i64) -> Self {
        Self::NotFound {
            entity: Entity::Task,
            id: id.to_string(),
        }
    }

    pub fn user_not_found(id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity: Entity::User,
            id: id.to_string(),
        }
    }

    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::Validation(FieldErrors::single(field, message))
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            TaskError::Validation(_) => ErrorCode::InvalidForm,
            TaskError::NotFound {
                entity: Entity::Task,
                ..
            } => ErrorCode::TaskNotFound,
            TaskError::NotFound {
                entity: Entity::User,
                ..
            } => ErrorCode::UserNotFound,
            TaskError::MethodNotAllowed(_) => ErrorCode::MethodNotAllowed,
            TaskError::Integrity(_) => ErrorCode::AlreadyExists,
            TaskError::Database(_) | TaskError::Migration(_) => ErrorCode::DatabaseError,
            TaskError::Internal(_) => ErrorCode::InternalError,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, TaskError::NotFound { .. })
    }

    /// Field messages for validation failures, `None` otherwise.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            TaskError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Result type for store and handler operations.
pub type Result<T> = std::result::Result<T, TaskError>;
