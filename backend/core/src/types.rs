use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Telegram-assigned user identity. Stable for the lifetime of the account.
pub type UserId = i64;

/// Monotonic access-request identity (SQLite rowid).
pub type RequestId = i64;

/// Authorization state of a user.
///
/// Exactly one user holds `Admin` at steady state (the configured operator);
/// startup self-heals that invariant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Pending,
    Approved,
    Rejected,
    Admin,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Admin => "admin",
        }
    }

    /// True iff this status grants use of the download features.
    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Approved | Self::Admin)
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserStatus {
    type Err = crate::GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "admin" => Ok(Self::Admin),
            other => Err(crate::GateError::Storage(format!(
                "unknown user status in store: {other}"
            ))),
        }
    }
}

/// Disposition of an access request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = crate::GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(crate::GateError::Storage(format!(
                "unknown request status in store: {other}"
            ))),
        }
    }
}

/// A known user and their current authorization state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Best label for rendering in lists and buttons.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or("Unknown")
    }
}

/// A discrete, timestamped ask for authorization. Append-only history:
/// a user may have many of these, only the newest pending one matters
/// operationally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessRequest {
    pub id: RequestId,
    pub user_id: UserId,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub message: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Kind of media delivered to a requester.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Video,
    Audio,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = crate::GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            other => Err(crate::GateError::Storage(format!(
                "unknown media type in store: {other}"
            ))),
        }
    }
}

/// One completed delivery, written to the audit log and read by nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadRecord {
    pub id: i64,
    pub user_id: UserId,
    pub url: String,
    pub title: String,
    pub media_type: MediaType,
    pub file_size_bytes: u64,
    pub downloaded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorized_statuses() {
        assert!(UserStatus::Approved.is_authorized());
        assert!(UserStatus::Admin.is_authorized());
        assert!(!UserStatus::Pending.is_authorized());
        assert!(!UserStatus::Rejected.is_authorized());
    }

    #[test]
    fn status_round_trips_through_store_text() {
        for status in [
            UserStatus::Pending,
            UserStatus::Approved,
            UserStatus::Rejected,
            UserStatus::Admin,
        ] {
            assert_eq!(status.as_str().parse::<UserStatus>().unwrap(), status);
        }
        assert!("banned".parse::<UserStatus>().is_err());
    }

    #[test]
    fn user_label_prefers_display_name() {
        let mut user = User {
            id: 1,
            username: Some("alice_a".into()),
            display_name: Some("Alice".into()),
            status: UserStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(user.label(), "Alice");
        user.display_name = None;
        assert_eq!(user.label(), "alice_a");
        user.username = None;
        assert_eq!(user.label(), "Unknown");
    }
}
