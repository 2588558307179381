use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use vidgate_core::{GateError, Result};

use crate::{FetchedMedia, MediaInfo, MediaFetch, MediaProbe};

/// yt-dlp subprocess backend for probe and fetch.
pub struct YtDlp {
    binary: String,
    download_dir: PathBuf,
}

impl YtDlp {
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: "yt-dlp".to_string(),
            download_dir: download_dir.into(),
        }
    }

    /// Override the binary name/path (e.g. a pinned vendored copy).
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    fn output_template(&self) -> String {
        self.download_dir
            .join("%(title)s.%(ext)s")
            .to_string_lossy()
            .into_owned()
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        debug!(binary = %self.binary, ?args, "Spawning yt-dlp");
        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    GateError::Media(format!("downloader binary '{}' not found", self.binary))
                } else {
                    GateError::Media(format!("failed to spawn '{}': {e}", self.binary))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GateError::Media(tail(&stderr, 400)));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn fetch(&self, url: &str, extra: &[&str]) -> Result<FetchedMedia> {
        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|e| GateError::Media(format!("cannot create download dir: {e}")))?;

        let template = self.output_template();
        let mut args = vec!["--no-warnings", "--no-playlist"];
        args.extend_from_slice(extra);
        args.extend_from_slice(&[
            "-o",
            &template,
            // Emit the final on-disk path (post-move, post-transcode) so we
            // don't have to guess the extension.
            "--print",
            "after_move:filepath",
            "--print",
            "title",
            "--no-simulate",
            url,
        ]);

        let stdout = self.run(&args).await?;
        let (file_path, title) = parse_fetch_output(&stdout)?;

        let metadata = tokio::fs::metadata(&file_path)
            .await
            .map_err(|e| GateError::Media(format!("downloaded file missing: {e}")))?;
        info!(path = %file_path.display(), size = metadata.len(), "Fetch complete");

        Ok(FetchedMedia {
            file_path,
            file_size_bytes: metadata.len(),
            title,
        })
    }
}

#[async_trait]
impl MediaProbe for YtDlp {
    async fn get_info(&self, url: &str) -> Result<MediaInfo> {
        let stdout = self.run(&["-J", "--no-warnings", "--no-playlist", url]).await?;
        parse_probe_output(&stdout)
    }
}

#[async_trait]
impl MediaFetch for YtDlp {
    async fn download_video(&self, url: &str) -> Result<FetchedMedia> {
        self.fetch(url, &["--format", "best[ext=mp4]/best"]).await
    }

    async fn download_audio(&self, url: &str) -> Result<FetchedMedia> {
        self.fetch(url, &["-x", "--audio-format", "mp3", "--audio-quality", "192K"])
            .await
    }
}

/// Parse the `-J` JSON dump into the metadata the bot shows.
fn parse_probe_output(json: &str) -> Result<MediaInfo> {
    let value: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| GateError::Media(format!("unreadable probe output: {e}")))?;
    let title = value
        .get("title")
        .and_then(|t| t.as_str())
        .unwrap_or("Unknown")
        .to_string();
    let duration_seconds = value
        .get("duration")
        .and_then(|d| d.as_f64())
        .unwrap_or(0.0) as u64;
    Ok(MediaInfo {
        title,
        duration_seconds,
    })
}

/// The fetch prints one line per `--print` arg: filepath, then title.
fn parse_fetch_output(stdout: &str) -> Result<(PathBuf, String)> {
    let mut lines = stdout.lines().filter(|l| !l.trim().is_empty());
    let path = lines
        .next()
        .ok_or_else(|| GateError::Media("downloader reported no output file".into()))?;
    let title = lines.next().unwrap_or("Unknown").to_string();
    Ok((PathBuf::from(path.trim()), title))
}

fn tail(text: &str, max: usize) -> String {
    let trimmed = text.trim();
    if trimmed.len() <= max {
        trimmed.to_string()
    } else {
        let start = trimmed.len() - max;
        // Avoid splitting a UTF-8 sequence.
        let start = (start..trimmed.len())
            .find(|&i| trimmed.is_char_boundary(i))
            .unwrap_or(start);
        format!("...{}", &trimmed[start..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_output_extracts_title_and_duration() {
        let json = r#"{"title": "A Video", "duration": 725.4, "uploader": "someone"}"#;
        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.title, "A Video");
        assert_eq!(info.duration_seconds, 725);
    }

    #[test]
    fn probe_output_defaults_for_missing_fields() {
        let info = parse_probe_output("{}").unwrap();
        assert_eq!(info.title, "Unknown");
        assert_eq!(info.duration_seconds, 0);

        assert!(parse_probe_output("not json").is_err());
    }

    #[test]
    fn fetch_output_yields_path_then_title() {
        let (path, title) =
            parse_fetch_output("/tmp/downloads/A Video.mp4\nA Video\n").unwrap();
        assert_eq!(path, PathBuf::from("/tmp/downloads/A Video.mp4"));
        assert_eq!(title, "A Video");

        assert!(parse_fetch_output("\n\n").is_err());
    }

    #[test]
    fn stderr_tail_is_bounded() {
        let long = "x".repeat(1000);
        assert!(tail(&long, 400).len() <= 403);
        assert_eq!(tail("short error", 400), "short error");
    }
}
