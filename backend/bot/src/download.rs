//! The spawned download-and-deliver task. Progress is reported by editing
//! the message the media-choice keyboard lived on.

use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageId, ParseMode};
use tracing::{error, info, warn};

use vidgate_core::{GateError, MediaType, UserId};
use vidgate_media::{cleanup_file, FetchedMedia};

use crate::state::BotState;

pub async fn run_download(
    bot: Bot,
    state: BotState,
    chat: ChatId,
    msg_id: MessageId,
    user_id: UserId,
    media: MediaType,
    url: String,
) {
    if let Err(err) = deliver(&bot, &state, chat, msg_id, user_id, media, &url).await {
        error!(user_id, %url, %err, "Download task failed");
        let result = bot
            .edit_message_text(chat, msg_id, "❌ Download failed. Please try again later.")
            .await;
        if let Err(edit_err) = result {
            warn!(%edit_err, "Could not report download failure");
        }
    }
}

async fn deliver(
    bot: &Bot,
    state: &BotState,
    chat: ChatId,
    msg_id: MessageId,
    user_id: UserId,
    media: MediaType,
    url: &str,
) -> anyhow::Result<()> {
    bot.edit_message_text(chat, msg_id, "⏳ Downloading... This may take a while.")
        .await?;

    let fetched = match fetch(state, media, url).await {
        Ok(fetched) => fetched,
        Err(GateError::Media(reason)) => {
            bot.edit_message_text(
                chat,
                msg_id,
                format!("❌ Download failed.\n\n<code>{reason}</code>"),
            )
            .parse_mode(ParseMode::Html)
            .await?;
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    if fetched.file_size_bytes > state.max_file_bytes {
        bot.edit_message_text(
            chat,
            msg_id,
            format!(
                "❌ File is too large to send ({} MB, limit {} MB).",
                to_mb(fetched.file_size_bytes),
                to_mb(state.max_file_bytes),
            ),
        )
        .await?;
        cleanup_file(&fetched.file_path).await;
        return Ok(());
    }

    bot.edit_message_text(chat, msg_id, "📤 Uploading...").await?;

    let file = InputFile::file(fetched.file_path.clone());
    let sent = match media {
        MediaType::Video => bot.send_video(chat, file).caption(fetched.title.clone()).await,
        MediaType::Audio => bot.send_audio(chat, file).caption(fetched.title.clone()).await,
    };
    if let Err(err) = sent {
        warn!(user_id, %err, "Upload to chat failed");
        bot.edit_message_text(chat, msg_id, "❌ Could not send the file. Please try again.")
            .await?;
        cleanup_file(&fetched.file_path).await;
        return Ok(());
    }

    // Audit trail; a logging failure must not undo a successful delivery.
    if let Err(err) = state
        .downloads
        .record(user_id, url, &fetched.title, media, fetched.file_size_bytes)
        .await
    {
        warn!(user_id, %err, "Failed to record download");
    }

    bot.edit_message_text(chat, msg_id, format!("✅ <b>{}</b> delivered!", fetched.title))
        .parse_mode(ParseMode::Html)
        .await?;
    info!(user_id, media = %media, size = fetched.file_size_bytes, "Download delivered");

    cleanup_file(&fetched.file_path).await;
    Ok(())
}

async fn fetch(state: &BotState, media: MediaType, url: &str) -> vidgate_core::Result<FetchedMedia> {
    match media {
        MediaType::Video => state.fetch.download_video(url).await,
        MediaType::Audio => state.fetch.download_audio(url).await,
    }
}

fn to_mb(bytes: u64) -> u64 {
    bytes / (1024 * 1024)
}
