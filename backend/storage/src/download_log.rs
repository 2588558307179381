use std::sync::Arc;

use chrono::Utc;
use rusqlite::{params, Connection};
use tokio::sync::Mutex;
use tracing::debug;

use vidgate_core::{DownloadRecord, MediaType, Result, UserId};

use crate::{parse_timestamp, store_err};

/// Write-only audit log of delivered downloads.
#[derive(Clone)]
pub struct DownloadLog {
    conn: Arc<Mutex<Connection>>,
}

impl DownloadLog {
    pub(crate) fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub async fn record(
        &self,
        user_id: UserId,
        url: &str,
        title: &str,
        media_type: MediaType,
        file_size_bytes: u64,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO downloads (user_id, url, title, media_type, file_size_bytes, downloaded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![user_id, url, title, media_type.as_str(), file_size_bytes as i64, now],
        )
        .map_err(store_err)?;
        debug!(user_id, media_type = %media_type, "Download recorded");
        Ok(())
    }

    /// A user's delivery history, newest first.
    pub async fn for_user(&self, user_id: UserId) -> Result<Vec<DownloadRecord>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, url, title, media_type, file_size_bytes, downloaded_at
                 FROM downloads WHERE user_id = ?1 ORDER BY downloaded_at DESC, id DESC",
            )
            .map_err(store_err)?;
        let raw: Vec<(i64, i64, String, String, String, i64, String)> = stmt
            .query_map(params![user_id], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                ))
            })
            .map_err(store_err)?
            .collect::<rusqlite::Result<_>>()
            .map_err(store_err)?;

        raw.into_iter()
            .map(|(id, user_id, url, title, media_type, size, at)| {
                Ok(DownloadRecord {
                    id,
                    user_id,
                    url,
                    title,
                    media_type: media_type.parse::<MediaType>()?,
                    file_size_bytes: size as u64,
                    downloaded_at: parse_timestamp(&at)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    #[tokio::test]
    async fn record_and_read_back() {
        let db = Database::in_memory().unwrap();
        let log = db.downloads();
        log.record(10, "https://example.com/v", "A Video", MediaType::Video, 1024)
            .await
            .unwrap();
        log.record(10, "https://example.com/a", "A Track", MediaType::Audio, 2048)
            .await
            .unwrap();
        log.record(11, "https://example.com/x", "Other", MediaType::Video, 1)
            .await
            .unwrap();

        let history = log.for_user(10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|r| r.user_id == 10));
    }
}
