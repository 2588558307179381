mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use teloxide::Bot;
use tracing::{info, warn};

use vidgate_bot::BotState;
use vidgate_media::YtDlp;
use vidgate_storage::Database;

use config::Config;

#[derive(Parser)]
#[command(name = "vidgate")]
#[command(about = "VidGate — access-gated media download bot")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot (long polling)
    Run {
        /// SQLite database path (overrides VIDGATE_DB)
        #[arg(long)]
        db: Option<String>,
    },
    /// Check local prerequisites: downloader binary, database, credentials
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();

    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { db } => {
            let config = Config {
                db_path: db.unwrap_or(config.db_path),
                ..config
            };
            run_bot(config).await
        }
        Commands::Doctor => doctor(&config).await,
    }
}

async fn run_bot(config: Config) -> Result<()> {
    let token = config
        .bot_token
        .clone()
        .context("BOT_TOKEN is not set")?;
    if config.admin_id == 0 {
        warn!("VIDGATE_ADMIN_ID is not set; admin features will be unreachable");
    }

    let db = Database::open(&config.db_path)?;

    let ytdlp = Arc::new(YtDlp::new(&config.download_dir));
    let state = BotState::new(
        &db,
        ytdlp.clone(),
        ytdlp,
        config.admin_id,
        config.max_file_bytes(),
    );
    state.controller.ensure_admin_exists(config.admin_id).await?;

    info!(
        db = %config.db_path,
        download_dir = %config.download_dir,
        admin_id = config.admin_id,
        "VidGate starting"
    );

    let bot = Bot::new(token);
    vidgate_bot::run(bot, state).await;
    Ok(())
}

async fn doctor(config: &Config) -> Result<()> {
    let ytdlp = tokio::process::Command::new("yt-dlp")
        .arg("--version")
        .output()
        .await;
    match ytdlp {
        Ok(out) if out.status.success() => {
            println!("yt-dlp:    {}", String::from_utf8_lossy(&out.stdout).trim());
        }
        _ => println!("yt-dlp:    NOT FOUND (install it and ensure it is on PATH)"),
    }

    match Database::open(&config.db_path) {
        Ok(_) => println!("database:  ok ({})", config.db_path),
        Err(err) => println!("database:  FAILED ({err:#})"),
    }

    if config.admin_id == 0 {
        println!("admin id:  not configured (set VIDGATE_ADMIN_ID)");
    } else {
        println!("admin id:  {}", config.admin_id);
    }
    println!(
        "bot token: {}",
        if config.bot_token.is_some() { "set" } else { "MISSING (set BOT_TOKEN)" }
    );
    Ok(())
}
