//! Durable SQLite storage for users, access requests, and the download log.
//!
//! One `rusqlite::Connection` shared behind a `tokio::sync::Mutex`; the three
//! store handles (`UserStore`, `RequestStore`, `DownloadLog`) clone the same
//! connection, which serializes concurrent writers at the row level.

mod db;
mod download_log;
mod request_store;
mod user_store;

pub use db::Database;
pub use download_log::DownloadLog;
pub use request_store::RequestStore;
pub use user_store::UserStore;

use vidgate_core::GateError;

/// Map a SQLite failure to the domain taxonomy. Primary-key collisions
/// become `DuplicateKey` so callers can treat them as "already exists".
pub(crate) fn store_err(err: rusqlite::Error) -> GateError {
    if let rusqlite::Error::SqliteFailure(ffi_err, _) = &err {
        if ffi_err.code == rusqlite::ErrorCode::ConstraintViolation {
            return GateError::DuplicateKey;
        }
    }
    GateError::Storage(err.to_string())
}

pub(crate) fn parse_timestamp(raw: &str) -> vidgate_core::Result<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| GateError::Storage(format!("bad timestamp in store ({raw}): {e}")))
}
