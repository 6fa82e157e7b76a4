//! User accounts and password verification.

use super::{Database, now_ms};
use crate::error::{FieldErrors, Result, TaskError};
use crate::types::{User, UserId, check_username};
use rusqlite::{Connection, ErrorCode as SqliteErrorCode, OptionalExtension, Row, params};
use sha2::{Digest, Sha256};
use tracing::info;
use uuid::Uuid;

const HASH_SCHEME: &str = "sha256";

fn parse_user_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId(row.get("id")?),
        username: row.get("username")?,
        created_at: row.get("created_at")?,
    })
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b"$");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hash a password as `sha256$<salt>$<hex digest>` with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    format!("{}${}${}", HASH_SCHEME, salt, digest(&salt, password))
}

/// Check a password against a stored hash.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    let (Some(scheme), Some(salt), Some(expected)) = (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    if scheme != HASH_SCHEME {
        return false;
    }
    let actual = digest(salt, password);
    // Compare without short-circuiting on the first differing byte.
    actual.len() == expected.len()
        && actual
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

fn get_user_by_username_internal(conn: &Connection, username: &str) -> Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, username, created_at FROM users WHERE username = ?1",
            params![username],
            parse_user_row,
        )
        .optional()?;
    Ok(user)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == SqliteErrorCode::ConstraintViolation
    )
}

impl Database {
    /// Register a new account.
    ///
    /// Fails with [`TaskError::Integrity`] when the username is taken.
    pub fn create_user(&self, username: &str, password: &str) -> Result<User> {
        let username = username.trim();
        let mut errors = FieldErrors::new();
        check_username(username, &mut errors);
        if password.is_empty() {
            errors.add("password", crate::types::REQUIRED_MESSAGE);
        }
        errors.into_result()?;

        let now = now_ms();
        let password_hash = hash_password(password);

        self.with_conn(|conn| {
            match conn.execute(
                "INSERT INTO users (username, password_hash, created_at) VALUES (?1, ?2, ?3)",
                params![username, password_hash, now],
            ) {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => {
                    return Err(TaskError::Integrity("Username already exists".to_string()));
                }
                Err(e) => return Err(e.into()),
            }

            let id = UserId(conn.last_insert_rowid());
            info!(user_id = id.0, username, "User created");

            Ok(User {
                id,
                username: username.to_string(),
                created_at: now,
            })
        })
    }

    /// Verify credentials. Returns `None` for an unknown user or wrong password.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, username, created_at, password_hash FROM users WHERE username = ?1",
                    params![username],
                    |row| Ok((parse_user_row(row)?, row.get::<_, String>("password_hash")?)),
                )
                .optional()?;

            Ok(match row {
                Some((user, hash)) if verify_password(password, &hash) => Some(user),
                _ => None,
            })
        })
    }

    pub fn get_user(&self, user_id: UserId) -> Result<User> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, username, created_at FROM users WHERE id = ?1",
                params![user_id.0],
                parse_user_row,
            )
            .optional()?
            .ok_or_else(|| TaskError::user_not_found(user_id))
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<User> {
        self.with_conn(|conn| {
            get_user_by_username_internal(conn, username)?
                .ok_or_else(|| TaskError::user_not_found(username))
        })
    }

    /// Delete an account. Its tasks and sessions go with it.
    pub fn delete_user(&self, user_id: UserId) -> Result<()> {
        self.with_conn(|conn| {
            let affected = conn.execute("DELETE FROM users WHERE id = ?1", params![user_id.0])?;
            if affected == 0 {
                return Err(TaskError::user_not_found(user_id));
            }
            info!(user_id = user_id.0, "User deleted");
            Ok(())
        })
    }
}
