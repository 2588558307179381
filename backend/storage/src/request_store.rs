use std::sync::Arc;

use chrono::Utc;
use rusqlite::{params, Connection};
use tokio::sync::Mutex;
use tracing::debug;

use vidgate_core::{AccessRequest, RequestId, RequestStatus, Result, UserId};

use crate::{parse_timestamp, store_err};

const SELECT_COLUMNS: &str =
    "id, user_id, username, display_name, message, status, created_at, updated_at";

/// Row-level operations on the `access_requests` table. Append-only history;
/// rows are resolved in place but never deleted.
#[derive(Clone)]
pub struct RequestStore {
    conn: Arc<Mutex<Connection>>,
}

type RawRequest = (
    i64,
    i64,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
    String,
    String,
);

impl RequestStore {
    pub(crate) fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Append a new pending request and return its id.
    pub async fn insert(
        &self,
        user_id: UserId,
        username: Option<&str>,
        display_name: Option<&str>,
        message: Option<&str>,
    ) -> Result<RequestId> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO access_requests
                 (user_id, username, display_name, message, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                user_id,
                username,
                display_name,
                message,
                RequestStatus::Pending.as_str(),
                now,
                now
            ],
        )
        .map_err(store_err)?;
        let id = conn.last_insert_rowid();
        debug!(request_id = id, user_id, "Access request created");
        Ok(id)
    }

    pub async fn get(&self, id: RequestId) -> Result<Option<AccessRequest>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM access_requests WHERE id = ?1"
            ))
            .map_err(store_err)?;
        let raw: Option<RawRequest> = stmt
            .query_row(params![id], Self::raw_row)
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(store_err(other)),
            })?;
        raw.map(Self::from_raw).transpose()
    }

    pub async fn update_status(&self, id: RequestId, status: RequestStatus) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE access_requests SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), now, id],
        )
        .map_err(store_err)?;
        debug!(request_id = id, status = %status, "Request status updated");
        Ok(())
    }

    /// All still-pending requests, newest first.
    pub async fn pending(&self) -> Result<Vec<AccessRequest>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM access_requests
                 WHERE status = ?1 ORDER BY created_at DESC, id DESC"
            ))
            .map_err(store_err)?;
        let raw: Vec<RawRequest> = stmt
            .query_map(params![RequestStatus::Pending.as_str()], Self::raw_row)
            .map_err(store_err)?
            .collect::<rusqlite::Result<_>>()
            .map_err(store_err)?;
        raw.into_iter().map(Self::from_raw).collect()
    }

    fn raw_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRequest> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
            row.get(7)?,
        ))
    }

    fn from_raw(raw: RawRequest) -> Result<AccessRequest> {
        let (id, user_id, username, display_name, message, status, created_at, updated_at) = raw;
        Ok(AccessRequest {
            id,
            user_id,
            username,
            display_name,
            message,
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

    #[tokio::test]
    async fn insert_returns_monotonic_ids() {
        let db = Database::in_memory().unwrap();
        let requests = db.requests();
        let a = requests.insert(1, None, None, None).await.unwrap();
        let b = requests.insert(1, None, None, Some("please")).await.unwrap();
        assert!(b > a);

        let stored = requests.get(b).await.unwrap().unwrap();
        assert_eq!(stored.user_id, 1);
        assert_eq!(stored.message.as_deref(), Some("please"));
        assert_eq!(stored.status, RequestStatus::Pending);
    }

    #[tokio::test]
    async fn resolving_removes_from_pending_but_keeps_row() {
        let db = Database::in_memory().unwrap();
        let requests = db.requests();
        let id = requests.insert(9, Some("bob"), None, None).await.unwrap();
        assert_eq!(requests.pending().await.unwrap().len(), 1);

        requests.update_status(id, RequestStatus::Approved).await.unwrap();
        assert!(requests.pending().await.unwrap().is_empty());

        // History is retained.
        let row = requests.get(id).await.unwrap().unwrap();
        assert_eq!(row.status, RequestStatus::Approved);
    }

    #[tokio::test]
    async fn multiple_requests_per_user_are_all_retained() {
        let db = Database::in_memory().unwrap();
        let requests = db.requests();
        for _ in 0..3 {
            requests.insert(42, None, None, None).await.unwrap();
        }
        let pending = requests.pending().await.unwrap();
        assert_eq!(pending.len(), 3);
        assert!(pending.iter().all(|r| r.user_id == 42));
    }
}
