use std::sync::Arc;

use chrono::Utc;
use rusqlite::{params, Connection};
use tokio::sync::Mutex;
use tracing::debug;

use vidgate_core::{Result, User, UserId, UserStatus};

use crate::{parse_timestamp, store_err};

const SELECT_COLUMNS: &str = "user_id, username, display_name, status, created_at, updated_at";

/// Row-level operations on the `users` table.
#[derive(Clone)]
pub struct UserStore {
    conn: Arc<Mutex<Connection>>,
}

type RawUser = (
    i64,
    Option<String>,
    Option<String>,
    String,
    String,
    String,
);

impl UserStore {
    pub(crate) fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Insert a new user. Fails with `DuplicateKey` if the id already exists;
    /// callers treat that as "already there", not as a fault.
    pub async fn insert(
        &self,
        id: UserId,
        username: Option<&str>,
        display_name: Option<&str>,
        status: UserStatus,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO users (user_id, username, display_name, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, username, display_name, status.as_str(), now, now],
        )
        .map_err(store_err)?;
        debug!(user_id = id, status = %status, "User inserted");
        Ok(())
    }

    pub async fn get(&self, id: UserId) -> Result<Option<User>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(&format!("SELECT {SELECT_COLUMNS} FROM users WHERE user_id = ?1"))
            .map_err(store_err)?;
        let raw: Option<RawUser> = stmt
            .query_row(params![id], Self::raw_row)
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(store_err(other)),
            })?;
        raw.map(Self::from_raw).transpose()
    }

    /// Set a user's status and bump `updated_at`. Missing rows are a no-op,
    /// matching single-row last-writer-wins semantics.
    pub async fn update_status(&self, id: UserId, status: UserStatus) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE users SET status = ?1, updated_at = ?2 WHERE user_id = ?3",
            params![status.as_str(), now, id],
        )
        .map_err(store_err)?;
        debug!(user_id = id, status = %status, "User status updated");
        Ok(())
    }

    /// Delete a user row. Returns whether a row was actually removed.
    pub async fn remove(&self, id: UserId) -> Result<bool> {
        let conn = self.conn.lock().await;
        let affected = conn
            .execute("DELETE FROM users WHERE user_id = ?1", params![id])
            .map_err(store_err)?;
        Ok(affected > 0)
    }

    /// All users, newest first.
    pub async fn all(&self) -> Result<Vec<User>> {
        self.scan(&format!(
            "SELECT {SELECT_COLUMNS} FROM users ORDER BY created_at DESC, user_id DESC"
        ), None)
        .await
    }

    /// Users with the given status, newest first.
    pub async fn by_status(&self, status: UserStatus) -> Result<Vec<User>> {
        self.scan(
            &format!(
                "SELECT {SELECT_COLUMNS} FROM users WHERE status = ?1
                 ORDER BY created_at DESC, user_id DESC"
            ),
            Some(status),
        )
        .await
    }

    async fn scan(&self, sql: &str, status: Option<UserStatus>) -> Result<Vec<User>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(sql).map_err(store_err)?;
        let raw: Vec<RawUser> = match status {
            Some(s) => stmt
                .query_map(params![s.as_str()], Self::raw_row)
                .map_err(store_err)?
                .collect::<rusqlite::Result<_>>()
                .map_err(store_err)?,
            None => stmt
                .query_map([], Self::raw_row)
                .map_err(store_err)?
                .collect::<rusqlite::Result<_>>()
                .map_err(store_err)?,
        };
        raw.into_iter().map(Self::from_raw).collect()
    }

    fn raw_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawUser> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
        ))
    }

    fn from_raw(raw: RawUser) -> Result<User> {
        let (id, username, display_name, status, created_at, updated_at) = raw;
        Ok(User {
            id,
            username,
            display_name,
            status: status.parse()?,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use vidgate_core::GateError;

    #[tokio::test]
    async fn insert_and_get() {
        let db = Database::in_memory().unwrap();
        let users = db.users();
        users
            .insert(500, Some("alice"), Some("Alice"), UserStatus::Pending)
            .await
            .unwrap();

        let user = users.get(500).await.unwrap().unwrap();
        assert_eq!(user.id, 500);
        assert_eq!(user.status, UserStatus::Pending);
        assert_eq!(user.label(), "Alice");
        assert!(users.get(501).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_insert_is_duplicate_key() {
        let db = Database::in_memory().unwrap();
        let users = db.users();
        users.insert(1, None, None, UserStatus::Pending).await.unwrap();

        let err = users
            .insert(1, None, None, UserStatus::Approved)
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::DuplicateKey));

        // The original row is untouched.
        let user = users.get(1).await.unwrap().unwrap();
        assert_eq!(user.status, UserStatus::Pending);
    }

    #[tokio::test]
    async fn update_status_bumps_updated_at() {
        let db = Database::in_memory().unwrap();
        let users = db.users();
        users.insert(7, None, None, UserStatus::Pending).await.unwrap();

        users.update_status(7, UserStatus::Approved).await.unwrap();
        let user = users.get(7).await.unwrap().unwrap();
        assert_eq!(user.status, UserStatus::Approved);
        assert!(user.updated_at >= user.created_at);
    }

    #[tokio::test]
    async fn remove_reports_whether_row_existed() {
        let db = Database::in_memory().unwrap();
        let users = db.users();
        users.insert(3, None, None, UserStatus::Approved).await.unwrap();

        assert!(users.remove(3).await.unwrap());
        assert!(!users.remove(3).await.unwrap());
    }

    #[tokio::test]
    async fn scans_filter_by_status() {
        let db = Database::in_memory().unwrap();
        let users = db.users();
        users.insert(1, None, None, UserStatus::Pending).await.unwrap();
        users.insert(2, None, None, UserStatus::Approved).await.unwrap();
        users.insert(3, None, None, UserStatus::Pending).await.unwrap();

        assert_eq!(users.all().await.unwrap().len(), 3);
        let pending = users.by_status(UserStatus::Pending).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert!(pending.iter().all(|u| u.status == UserStatus::Pending));
    }
}
