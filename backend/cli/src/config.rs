/// VidGate runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Telegram bot token
    pub bot_token: Option<String>,
    /// Telegram user id of the operator (0 = not configured)
    pub admin_id: i64,
    /// SQLite database path
    pub db_path: String,
    /// Directory downloads are staged in before delivery
    pub download_dir: String,
    /// Largest file the bot will send, in megabytes
    pub max_file_mb: u64,
    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot_token: None,
            admin_id: 0,
            db_path: "vidgate.db".to_string(),
            download_dir: "downloads".to_string(),
            max_file_mb: 2000,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        Self {
            bot_token: std::env::var("BOT_TOKEN").ok(),
            admin_id: std::env::var("VIDGATE_ADMIN_ID")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            db_path: std::env::var("VIDGATE_DB").unwrap_or_else(|_| "vidgate.db".to_string()),
            download_dir: std::env::var("VIDGATE_DOWNLOAD_DIR")
                .unwrap_or_else(|_| "downloads".to_string()),
            max_file_mb: std::env::var("VIDGATE_MAX_FILE_MB")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2000),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }

    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_mb * 1024 * 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = Config::default();
        assert_eq!(config.db_path, "vidgate.db");
        assert_eq!(config.max_file_bytes(), 2000 * 1024 * 1024);
        assert_eq!(config.admin_id, 0);
    }
}
