use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tokio::sync::Mutex;
use tracing::info;

use crate::{DownloadLog, RequestStore, UserStore};

/// Owns the SQLite connection and hands out per-table store handles.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create the database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).context("Failed to open SQLite database")?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .context("Failed to enable WAL")?;
        Self::init_schema(&conn)?;
        info!(path = %path.as_ref().display(), "Database opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for tests).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory SQLite")?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                user_id      INTEGER PRIMARY KEY,
                username     TEXT,
                display_name TEXT,
                status       TEXT NOT NULL,
                created_at   TEXT NOT NULL,
                updated_at   TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS access_requests (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id      INTEGER NOT NULL,
                username     TEXT,
                display_name TEXT,
                message      TEXT,
                status       TEXT NOT NULL,
                created_at   TEXT NOT NULL,
                updated_at   TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS downloads (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id         INTEGER NOT NULL,
                url             TEXT NOT NULL,
                title           TEXT NOT NULL,
                media_type      TEXT NOT NULL,
                file_size_bytes INTEGER NOT NULL,
                downloaded_at   TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_requests_user ON access_requests(user_id);
            CREATE INDEX IF NOT EXISTS idx_requests_status ON access_requests(status);
            CREATE INDEX IF NOT EXISTS idx_users_status ON users(status);",
        )
        .context("Failed to initialize schema")?;
        Ok(())
    }

    pub fn users(&self) -> UserStore {
        UserStore::new(Arc::clone(&self.conn))
    }

    pub fn requests(&self) -> RequestStore {
        RequestStore::new(Arc::clone(&self.conn))
    }

    pub fn downloads(&self) -> DownloadLog {
        DownloadLog::new(Arc::clone(&self.conn))
    }
}
