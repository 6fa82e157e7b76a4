//! Task CRUD and completion operations.
//!
//! Every operation takes the caller's [`UserId`] and only ever sees rows owned
//! by that user. A row owned by someone else is reported exactly like a row
//! that does not exist.

use super::{Database, now_ms};
use crate::error::{Result, TaskError};
use crate::types::{ParentFilter, Task, TaskFields, TaskQuery, ToggleOutcome, UserId};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use tracing::{debug, info};

const TASK_COLUMNS: &str =
    "id, title, description, important, created_at, completed_at, user_id, parent_id";

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        important: row.get("important")?,
        created_at: row.get("created_at")?,
        completed_at: row.get("completed_at")?,
        user_id: UserId(row.get("user_id")?),
        parent_id: row.get("parent_id")?,
    })
}

/// Look up a task owned by `user`, using an existing connection.
fn get_task_internal(conn: &Connection, user: UserId, task_id: i64) -> Result<Option<Task>> {
    let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 AND user_id = ?2");
    let task = conn
        .query_row(&sql, params![task_id, user.0], parse_task_row)
        .optional()?;
    Ok(task)
}

fn require_task(conn: &Connection, user: UserId, task_id: i64) -> Result<Task> {
    get_task_internal(conn, user, task_id)?.ok_or_else(|| TaskError::task_not_found(task_id))
}

/// Look up a subtask through its parent. Fails unless both ids line up.
fn require_subtask(conn: &Connection, user: UserId, task_id: i64, subtask_id: i64) -> Result<Task> {
    let sql = format!(
        "SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 AND parent_id = ?2 AND user_id = ?3"
    );
    conn.query_row(&sql, params![subtask_id, task_id, user.0], parse_task_row)
        .optional()?
        .ok_or_else(|| TaskError::task_not_found(subtask_id))
}

fn all_subtasks_completed_internal(conn: &Connection, parent_id: i64) -> Result<bool> {
    let pending: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM tasks WHERE parent_id = ?1 AND completed_at IS NULL)",
        params![parent_id],
        |row| row.get(0),
    )?;
    Ok(!pending)
}

fn apply_fields(conn: &Connection, mut task: Task, fields: &TaskFields) -> Result<Task> {
    let title = fields.title.trim();
    conn.execute(
        "UPDATE tasks SET title = ?1, description = ?2, important = ?3 WHERE id = ?4",
        params![title, fields.description, fields.important, task.id],
    )?;
    task.title = title.to_string();
    task.description = fields.description.clone();
    task.important = fields.important;
    Ok(task)
}

/// Delete `task_id` and everything below it. Returns the number of rows removed.
fn delete_internal(conn: &Connection, user: UserId, task_id: i64) -> Result<usize> {
    let removed: i64 = conn.query_row(
        "WITH RECURSIVE descendants AS (
            SELECT ?1 AS id
            UNION ALL
            SELECT t.id FROM tasks t
            INNER JOIN descendants d ON t.parent_id = d.id
        )
        SELECT COUNT(*) FROM descendants",
        params![task_id],
        |row| row.get(0),
    )?;

    // Descendants go through ON DELETE CASCADE.
    conn.execute(
        "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
        params![task_id, user.0],
    )?;

    Ok(removed as usize)
}

impl Database {
    /// Create a new task, or a subtask of `parent_id`.
    ///
    /// The parent must belong to `user` and must itself be top-level.
    pub fn create_task(
        &self,
        user: UserId,
        fields: &TaskFields,
        parent_id: Option<i64>,
    ) -> Result<Task> {
        fields.validate()?;
        let now = now_ms();
        let title = fields.title.trim().to_string();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if let Some(pid) = parent_id {
                let parent = require_task(&tx, user, pid)?;
                if parent.is_subtask() {
                    return Err(TaskError::invalid(
                        "parent",
                        "Una subtarea no puede tener subtareas propias.",
                    ));
                }
            }

            tx.execute(
                "INSERT INTO tasks (title, description, important, created_at, user_id, parent_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    &title,
                    &fields.description,
                    fields.important,
                    now,
                    user.0,
                    parent_id
                ],
            )?;
            let id = tx.last_insert_rowid();

            tx.commit()?;

            debug!(task_id = id, user_id = user.0, parent_id = ?parent_id, "Task created");

            Ok(Task {
                id,
                title,
                description: fields.description.clone(),
                important: fields.important,
                created_at: now,
                completed_at: None,
                user_id: user,
                parent_id,
            })
        })
    }

    /// Get a task owned by `user`.
    pub fn get_task(&self, user: UserId, task_id: i64) -> Result<Task> {
        self.with_conn(|conn| require_task(conn, user, task_id))
    }

    /// Get a subtask of `task_id` owned by `user`.
    pub fn get_subtask(&self, user: UserId, task_id: i64, subtask_id: i64) -> Result<Task> {
        self.with_conn(|conn| require_subtask(conn, user, task_id, subtask_id))
    }

    /// List tasks owned by `user` matching the query.
    ///
    /// Completed-only listings come back newest completion first; everything
    /// else comes back in creation order.
    pub fn list_tasks(&self, user: UserId, query: &TaskQuery) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            let mut sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ?");
            let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user.0)];

            match query.parent {
                ParentFilter::TopLevel => sql.push_str(" AND parent_id IS NULL"),
                ParentFilter::SubtaskOf(pid) => {
                    sql.push_str(" AND parent_id = ?");
                    params_vec.push(Box::new(pid));
                }
            }

            match query.completed {
                Some(true) => sql.push_str(" AND completed_at IS NOT NULL"),
                Some(false) => sql.push_str(" AND completed_at IS NULL"),
                None => {}
            }

            if query.completed == Some(true) {
                sql.push_str(" ORDER BY completed_at DESC, id DESC");
            } else {
                sql.push_str(" ORDER BY id ASC");
            }

            let params_refs: Vec<&dyn rusqlite::ToSql> =
                params_vec.iter().map(|b| b.as_ref()).collect();

            let mut stmt = conn.prepare(&sql)?;
            let tasks = stmt
                .query_map(params_refs.as_slice(), parse_task_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(tasks)
        })
    }

    /// Subtasks of `task_id` in creation order. Fails if the parent is not visible to `user`.
    pub fn list_subtasks(&self, user: UserId, task_id: i64) -> Result<Vec<Task>> {
        self.get_task(user, task_id)?;
        self.list_tasks(user, &TaskQuery::subtasks_of(task_id))
    }

    /// Edit title, description and importance of a task.
    pub fn update_task(&self, user: UserId, task_id: i64, fields: &TaskFields) -> Result<Task> {
        fields.validate()?;
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let task = require_task(&tx, user, task_id)?;
            let task = apply_fields(&tx, task, fields)?;
            tx.commit()?;
            Ok(task)
        })
    }

    /// Edit a subtask, addressed through its parent.
    pub fn update_subtask(
        &self,
        user: UserId,
        task_id: i64,
        subtask_id: i64,
        fields: &TaskFields,
    ) -> Result<Task> {
        fields.validate()?;
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let subtask = require_subtask(&tx, user, task_id, subtask_id)?;
            let subtask = apply_fields(&tx, subtask, fields)?;
            tx.commit()?;
            Ok(subtask)
        })
    }

    /// Mark a top-level task complete.
    ///
    /// Completing an already completed task keeps its original timestamp.
    /// Subtasks are not reachable here; use [`Database::toggle_subtask_completion`].
    pub fn complete_task(&self, user: UserId, task_id: i64) -> Result<Task> {
        let now = now_ms();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut task = require_task(&tx, user, task_id)?;
            if task.is_subtask() {
                return Err(TaskError::task_not_found(task_id));
            }

            if task.completed_at.is_none() {
                tx.execute(
                    "UPDATE tasks SET completed_at = ?1 WHERE id = ?2",
                    params![now, task.id],
                )?;
                task.completed_at = Some(now);
                info!(task_id, user_id = user.0, "Task completed");
            }

            tx.commit()?;
            Ok(task)
        })
    }

    /// Flip a subtask between complete and incomplete, and recompute whether
    /// every subtask of its parent is now complete.
    pub fn toggle_subtask_completion(
        &self,
        user: UserId,
        task_id: i64,
        subtask_id: i64,
    ) -> Result<ToggleOutcome> {
        let now = now_ms();
        self.with_conn_mut(|conn| {
            // IMMEDIATE takes the write lock before the read, so two toggles
            // of the same row cannot both see the old value.
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let mut subtask = require_subtask(&tx, user, task_id, subtask_id)?;

            subtask.completed_at = match subtask.completed_at {
                Some(_) => None,
                None => Some(now),
            };
            tx.execute(
                "UPDATE tasks SET completed_at = ?1 WHERE id = ?2",
                params![subtask.completed_at, subtask.id],
            )?;

            let all_subtasks_completed = all_subtasks_completed_internal(&tx, task_id)?;
            tx.commit()?;

            let completed = subtask.completed();
            info!(
                task_id,
                subtask_id,
                user_id = user.0,
                completed,
                all_subtasks_completed,
                "Subtask completion toggled"
            );

            Ok(ToggleOutcome {
                subtask,
                completed,
                all_subtasks_completed,
            })
        })
    }

    /// True when `task_id` has no incomplete subtasks, including when it has none at all.
    pub fn all_subtasks_completed(&self, user: UserId, task_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            require_task(conn, user, task_id)?;
            all_subtasks_completed_internal(conn, task_id)
        })
    }

    /// Delete a task and its subtasks. Returns the number of tasks removed.
    pub fn delete_task(&self, user: UserId, task_id: i64) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            require_task(&tx, user, task_id)?;
            let removed = delete_internal(&tx, user, task_id)?;
            tx.commit()?;
            info!(task_id, user_id = user.0, removed, "Task deleted");
            Ok(removed)
        })
    }

    /// Delete a subtask, addressed through its parent.
    pub fn delete_subtask(&self, user: UserId, task_id: i64, subtask_id: i64) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            require_subtask(&tx, user, task_id, subtask_id)?;
            let removed = delete_internal(&tx, user, subtask_id)?;
            tx.commit()?;
            info!(task_id, subtask_id, user_id = user.0, "Subtask deleted");
            Ok(removed)
        })
    }
}
