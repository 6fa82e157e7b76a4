//! Core types for the task tracker.

use crate::error::{FieldErrors, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum title length, in characters.
pub const TITLE_MAX_LEN: usize = 100;

/// Maximum username length, in characters.
pub const USERNAME_MAX_LEN: usize = 150;

pub const REQUIRED_MESSAGE: &str = "This field is required.";

/// Identity of the caller. Every store operation on tasks is scoped by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub created_at: i64,
}

/// A task, or a subtask when `parent_id` is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub important: bool,
    pub created_at: i64,
    pub completed_at: Option<i64>,
    pub user_id: UserId,
    pub parent_id: Option<i64>,
}

impl Task {
    /// Completion is derived from the timestamp alone.
    pub fn completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn is_subtask(&self) -> bool {
        self.parent_id.is_some()
    }
}

/// The user-editable fields of a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFields {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub important: bool,
}

impl TaskFields {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn important(mut self, important: bool) -> Self {
        self.important = important;
        self
    }

    /// Check the fields, collecting every problem rather than stopping at the first.
    pub fn validate(&self) -> Result<()> {
        let mut errors = FieldErrors::new();
        check_title(&self.title, &mut errors);
        errors.into_result()
    }
}

/// Length is measured on the trimmed title, which is what gets stored.
fn check_title(title: &str, errors: &mut FieldErrors) {
    let title = title.trim();
    let len = title.chars().count();
    if title.is_empty() {
        errors.add("title", REQUIRED_MESSAGE);
    } else if len > TITLE_MAX_LEN {
        errors.add("title", max_length_message(TITLE_MAX_LEN, len));
    }
}

/// Validate a username for account creation.
pub fn check_username(username: &str, errors: &mut FieldErrors) {
    let username = username.trim();
    let len = username.chars().count();
    if username.is_empty() {
        errors.add("username", REQUIRED_MESSAGE);
    } else if len > USERNAME_MAX_LEN {
        errors.add("username", max_length_message(USERNAME_MAX_LEN, len));
    }
}

pub fn max_length_message(max: usize, actual: usize) -> String {
    format!(
        "Ensure this value has at most {} characters (it has {}).",
        max, actual
    )
}

/// Which level of the hierarchy a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParentFilter {
    /// Only tasks without a parent.
    #[default]
    TopLevel,
    /// Only the subtasks of the given task.
    SubtaskOf(i64),
}

/// Filter for task listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskQuery {
    pub parent: ParentFilter,
    /// `Some(true)` for completed only, `Some(false)` for pending only.
    pub completed: Option<bool>,
}

impl TaskQuery {
    /// Top-level tasks still pending.
    pub fn pending() -> Self {
        Self {
            parent: ParentFilter::TopLevel,
            completed: Some(false),
        }
    }

    /// Top-level tasks already completed, newest completion first.
    pub fn completed() -> Self {
        Self {
            parent: ParentFilter::TopLevel,
            completed: Some(true),
        }
    }

    pub fn subtasks_of(task_id: i64) -> Self {
        Self {
            parent: ParentFilter::SubtaskOf(task_id),
            completed: None,
        }
    }
}

/// Result of flipping a subtask's completion.
#[derive(Debug, Clone, Serialize)]
pub struct ToggleOutcome {
    pub subtask: Task,
    pub completed: bool,
    pub all_subtasks_completed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;

    #[test]
    fn empty_title_is_required() {
        let err = TaskFields::new("   ").validate().unwrap_err();
        let errors = err.field_errors().unwrap();
        assert_eq!(errors.get("title").unwrap(), [REQUIRED_MESSAGE.to_string()]);
    }

    #[test]
    fn title_length_counts_characters() {
        let ok = TaskFields::new("é".repeat(TITLE_MAX_LEN));
        assert!(ok.validate().is_ok());

        let long = TaskFields::new("a".repeat(TITLE_MAX_LEN + 1));
        match long.validate() {
            Err(TaskError::Validation(errors)) => {
                assert_eq!(
                    errors.get("title").unwrap()[0],
                    "Ensure this value has at most 100 characters (it has 101)."
                );
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn surrounding_whitespace_does_not_count_toward_length() {
        let padded = TaskFields::new(format!("  {}  ", "x".repeat(TITLE_MAX_LEN)));
        assert!(padded.validate().is_ok());
    }

    #[test]
    fn completion_is_derived_from_timestamp() {
        let mut task = Task {
            id: 1,
            title: "Buy milk".into(),
            description: String::new(),
            important: false,
            created_at: 1,
            completed_at: None,
            user_id: UserId(1),
            parent_id: None,
        };
        assert!(!task.completed());
        task.completed_at = Some(2);
        assert!(task.completed());
    }
}
