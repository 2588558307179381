//! Media probe/fetch capabilities consumed by the bot.
//!
//! The bot only sees the two traits below; the concrete backend is a yt-dlp
//! child process. Long-running fetches happen in the subprocess, off the
//! event-handling path.

pub mod ytdlp;

pub use ytdlp::YtDlp;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use vidgate_core::Result;

/// Metadata about a link, fetched without downloading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaInfo {
    pub title: String,
    pub duration_seconds: u64,
}

/// A retrieved file ready to be sent back to the requester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMedia {
    pub file_path: PathBuf,
    pub file_size_bytes: u64,
    pub title: String,
}

/// Metadata lookup. Fails for invalid, private, or unsupported URLs.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn get_info(&self, url: &str) -> Result<MediaInfo>;
}

/// Retrieval and transcoding. May take long; callers run it in a spawned
/// task so other chat events keep flowing.
#[async_trait]
pub trait MediaFetch: Send + Sync {
    async fn download_video(&self, url: &str) -> Result<FetchedMedia>;
    async fn download_audio(&self, url: &str) -> Result<FetchedMedia>;
}

/// Best-effort removal of a delivered file. Failure is logged, never fatal.
pub async fn cleanup_file(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Cleaned up delivered file"),
        Err(err) => warn!(path = %path.display(), %err, "Failed to clean up file"),
    }
}
