//! Login sessions keyed by an opaque token.

use super::{Database, now_ms};
use crate::error::Result;
use crate::types::{User, UserId};
use chrono::Duration;
use rusqlite::{OptionalExtension, params};
use tracing::debug;
use uuid::Uuid;

impl Database {
    /// Start a session for `user_id` lasting `ttl`. Returns the token to hand to the client.
    pub fn create_session(&self, user_id: UserId, ttl: Duration) -> Result<String> {
        let token = Uuid::new_v4().simple().to_string();
        let now = now_ms();
        let expires_at = now + ttl.num_milliseconds();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
                params![token, user_id.0, now, expires_at],
            )?;
            Ok(())
        })?;

        debug!(user_id = user_id.0, "Session created");
        Ok(token)
    }

    /// Resolve a token to its user, ignoring expired sessions.
    pub fn session_user(&self, token: &str) -> Result<Option<User>> {
        let now = now_ms();
        self.with_conn(|conn| {
            let user = conn
                .query_row(
                    "SELECT u.id, u.username, u.created_at FROM sessions s
                     INNER JOIN users u ON u.id = s.user_id
                     WHERE s.token = ?1 AND s.expires_at > ?2",
                    params![token, now],
                    |row| {
                        Ok(User {
                            id: UserId(row.get(0)?),
                            username: row.get(1)?,
                            created_at: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(user)
        })
    }

    pub fn delete_session(&self, token: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
            Ok(())
        })
    }

    /// Drop every expired session. Returns how many were removed.
    pub fn purge_expired_sessions(&self) -> Result<usize> {
        let now = now_ms();
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", params![now])?;
            Ok(removed)
        })
    }
}
