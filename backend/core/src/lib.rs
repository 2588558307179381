pub mod error;
pub mod types;

pub use error::{GateError, Result};
pub use types::{
    AccessRequest, DownloadRecord, MediaType, RequestId, RequestStatus, User, UserId, UserStatus,
};
