use thiserror::Error;

use crate::types::{RequestId, UserId};

/// Top-level error type for the VidGate runtime.
///
/// Business short-circuits (`AlreadyAuthorized`, `RequestAlreadyPending`,
/// `CannotRemoveAdmin`, ...) are surfaced to the chat as informational text;
/// only `Storage` and `Other` indicate something genuinely unexpected.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("insert hit an existing row")]
    DuplicateKey,

    #[error("You are already authorized! You can use the bot.")]
    AlreadyAuthorized,

    #[error("Your request is already pending. Please wait for admin approval.")]
    RequestAlreadyPending,

    #[error("Request #{0} not found.")]
    RequestNotFound(RequestId),

    #[error("User {0} not found.")]
    UserNotFound(UserId),

    #[error("Cannot remove admin user.")]
    CannotRemoveAdmin,

    #[error("No users selected.")]
    EmptySelection,

    #[error("delivery to {user_id} failed: {reason}")]
    Delivery { user_id: UserId, reason: String },

    #[error("media operation failed: {0}")]
    Media(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GateError {
    /// True for business-rule short-circuits whose `Display` text is meant
    /// for the end user, as opposed to faults worth operator attention.
    pub fn is_informational(&self) -> bool {
        matches!(
            self,
            Self::AlreadyAuthorized
                | Self::RequestAlreadyPending
                | Self::RequestNotFound(_)
                | Self::UserNotFound(_)
                | Self::CannotRemoveAdmin
                | Self::EmptySelection
        )
    }
}

pub type Result<T> = std::result::Result<T, GateError>;
