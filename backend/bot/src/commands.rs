//! Message-side update handling: slash commands, reply-keyboard buttons,
//! broadcast composition, and bare links.

use once_cell::sync::Lazy;
use regex::Regex;
use teloxide::prelude::*;
use teloxide::types::{Me, ParseMode};
use teloxide::utils::command::BotCommands;
use tracing::{debug, warn};

use vidgate_access::SelectionPurpose;
use vidgate_core::{GateError, RequestId, UserId};

use crate::action::BroadcastScope;
use crate::keyboards;
use crate::sink::TelegramSink;
use crate::state::BotState;
use crate::text;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    Start,
    Help,
    Request(String),
    ListUsers,
    Pending,
    AddUser(String),
    RemoveUser(String),
    Cancel,
}

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").unwrap());

/// `/approve_12`-style resolutions typed from the pending list.
static RESOLVE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/(approve|reject|approveuser|rejectuser)_(\d+)$").unwrap());

pub async fn handle_message(bot: Bot, msg: Message, me: Me, state: BotState) -> anyhow::Result<()> {
    let Some(from) = msg.from.clone() else {
        return Ok(());
    };
    let Some(message_text) = msg.text() else {
        return Ok(());
    };
    let user_id = from.id.0 as i64;
    let chat = msg.chat.id;

    // An admin mid-composition: the next message is the broadcast payload,
    // unless it's /cancel (handled below as a command).
    if message_text != "/cancel" {
        if let Some(scope) = state.take_compose(user_id).await {
            return run_broadcast(&bot, &state, user_id, chat, scope, message_text).await;
        }
    }

    if let Ok(command) = Command::parse(message_text, me.username()) {
        return handle_command(&bot, &state, &msg, &from, command).await;
    }

    if let Some(captures) = RESOLVE_RE.captures(message_text) {
        let id: i64 = captures[2].parse()?;
        return handle_resolution(&bot, &state, chat, user_id, &captures[1], id).await;
    }

    match message_text {
        "🏠 Main Menu" => return send_welcome(&bot, &state, chat, user_id, &from).await,
        "❓ Help" => {
            send_html(&bot, chat, text::HELP).await?;
            return Ok(());
        }
        "📝 Request Access" => {
            send_html(&bot, chat, text::REQUEST_INFO).await?;
            return Ok(());
        }
        "👑 Admin Panel" => {
            if state.controller.is_admin(user_id).await? {
                bot.send_message(chat, "👑 <b>Admin Panel</b>")
                    .parse_mode(ParseMode::Html)
                    .reply_markup(keyboards::admin_panel())
                    .await?;
            } else {
                send_html(&bot, chat, text::ADMIN_ONLY).await?;
            }
            return Ok(());
        }
        _ => {}
    }

    if let Some(url) = URL_RE.find(message_text) {
        return handle_link(&bot, &state, chat, user_id, url.as_str()).await;
    }

    debug!(user_id, "Ignoring unrecognized message");
    Ok(())
}

async fn handle_command(
    bot: &Bot,
    state: &BotState,
    msg: &Message,
    from: &teloxide::types::User,
    command: Command,
) -> anyhow::Result<()> {
    let user_id = from.id.0 as i64;
    let chat = msg.chat.id;

    match command {
        Command::Start => send_welcome(bot, state, chat, user_id, from).await,
        Command::Help => {
            send_html(bot, chat, text::HELP).await?;
            Ok(())
        }
        Command::Cancel => {
            if state.compose.write().await.remove(&user_id).is_some() {
                send_html(bot, chat, "❌ Broadcast cancelled.").await?;
            }
            Ok(())
        }
        Command::Request(message) => {
            let message = message.trim();
            let message = (!message.is_empty()).then_some(message);
            let display_name = from.full_name();
            match state
                .controller
                .request_access(
                    user_id,
                    from.username.as_deref(),
                    Some(display_name.as_str()),
                    message,
                )
                .await
            {
                Ok(request) => {
                    send_html(bot, chat, text::REQUEST_SENT).await?;
                    // The admin gets an alert with one-tap resolution buttons.
                    if state.admin_id != 0 {
                        let alert = bot
                            .send_message(ChatId(state.admin_id), text::new_request_alert(&request))
                            .parse_mode(ParseMode::Html)
                            .reply_markup(keyboards::approve_reject(request.id))
                            .await;
                        if let Err(err) = alert {
                            warn!(%err, "Failed to alert admin about new request");
                        }
                    }
                    Ok(())
                }
                Err(err) if err.is_informational() => {
                    send_html(bot, chat, &err.to_string()).await?;
                    Ok(())
                }
                Err(err) => Err(err.into()),
            }
        }
        Command::ListUsers => {
            if !state.controller.is_admin(user_id).await? {
                send_html(bot, chat, text::ADMIN_ONLY).await?;
                return Ok(());
            }
            let users = state.controller.all_users().await?;
            send_html(bot, chat, &text::clamp_message(text::format_users(&users))).await?;
            Ok(())
        }
        Command::Pending => {
            if !state.controller.is_admin(user_id).await? {
                send_html(bot, chat, text::ADMIN_ONLY).await?;
                return Ok(());
            }
            let requests = state.controller.pending_requests().await?;
            let pending = state.controller.pending_users().await?;
            send_html(
                bot,
                chat,
                &text::clamp_message(text::format_pending(&requests, &pending)),
            )
            .await?;
            Ok(())
        }
        Command::AddUser(arg) => {
            admin_user_command(bot, state, chat, user_id, &arg, true).await
        }
        Command::RemoveUser(arg) => {
            admin_user_command(bot, state, chat, user_id, &arg, false).await
        }
    }
}

async fn admin_user_command(
    bot: &Bot,
    state: &BotState,
    chat: ChatId,
    admin: UserId,
    arg: &str,
    add: bool,
) -> anyhow::Result<()> {
    if !state.controller.is_admin(admin).await? {
        send_html(bot, chat, text::ADMIN_ONLY).await?;
        return Ok(());
    }
    let Ok(target) = arg.trim().parse::<UserId>() else {
        let usage = if add {
            "Usage: <code>/adduser user_id</code>"
        } else {
            "Usage: <code>/removeuser user_id</code>"
        };
        send_html(bot, chat, usage).await?;
        return Ok(());
    };

    let result = if add {
        state.controller.add_user_directly(target).await
    } else {
        state.controller.remove_user(target).await
    };
    match result {
        Ok(()) => {
            let confirmation = if add {
                notify_user(bot, target, text::APPROVED_NOTICE).await;
                format!("✅ User {target} added and approved.")
            } else {
                format!("✅ User {target} removed.")
            };
            send_html(bot, chat, &confirmation).await?;
        }
        Err(err) if err.is_informational() => {
            send_html(bot, chat, &err.to_string()).await?;
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

/// Typed resolution shortcuts from the pending list: `/approve_N` and
/// `/reject_N` act on a request id, the `user` forms on a bare user id.
async fn handle_resolution(
    bot: &Bot,
    state: &BotState,
    chat: ChatId,
    admin: UserId,
    verb: &str,
    id: i64,
) -> anyhow::Result<()> {
    if !state.controller.is_admin(admin).await? {
        send_html(bot, chat, text::ADMIN_ONLY).await?;
        return Ok(());
    }

    let result: vidgate_core::Result<String> = match verb {
        "approve" => resolve_approve(state, bot, id).await,
        "reject" => resolve_reject(state, bot, id).await,
        "approveuser" => state.controller.add_user_directly(id).await.map(|()| {
            format!("✅ User {id} approved.")
        }),
        "rejectuser" => state
            .controller
            .remove_user(id)
            .await
            .map(|()| format!("✅ User {id} rejected and removed.")),
        _ => return Ok(()),
    };

    match result {
        Ok(confirmation) => {
            if verb == "approveuser" {
                notify_user(bot, id, text::APPROVED_NOTICE).await;
            }
            send_html(bot, chat, &confirmation).await?;
        }
        Err(err) if err.is_informational() => {
            send_html(bot, chat, &err.to_string()).await?;
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

async fn resolve_approve(
    state: &BotState,
    bot: &Bot,
    request_id: RequestId,
) -> vidgate_core::Result<String> {
    let user_id = state.controller.approve_request(request_id).await?;
    notify_user(bot, user_id, text::APPROVED_NOTICE).await;
    Ok(format!("✅ Request #{request_id} approved (user {user_id})."))
}

async fn resolve_reject(
    state: &BotState,
    bot: &Bot,
    request_id: RequestId,
) -> vidgate_core::Result<String> {
    let user_id = state.controller.reject_request(request_id).await?;
    notify_user(bot, user_id, text::REJECTED_NOTICE).await;
    Ok(format!("❌ Request #{request_id} rejected (user {user_id})."))
}

async fn send_welcome(
    bot: &Bot,
    state: &BotState,
    chat: ChatId,
    user_id: UserId,
    from: &teloxide::types::User,
) -> anyhow::Result<()> {
    let display_name = from.full_name();
    state
        .controller
        .ensure_known(user_id, from.username.as_deref(), Some(display_name.as_str()))
        .await?;

    let authorized = state.controller.is_authorized(user_id).await?;
    let admin = state.controller.is_admin(user_id).await?;

    bot.send_message(chat, text::welcome(&display_name, authorized, admin))
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboards::reply_menu(authorized, admin))
        .await?;
    bot.send_message(chat, "⬇️ Choose an option:")
        .reply_markup(keyboards::main_menu(authorized, admin))
        .await?;
    Ok(())
}

async fn handle_link(
    bot: &Bot,
    state: &BotState,
    chat: ChatId,
    user_id: UserId,
    url: &str,
) -> anyhow::Result<()> {
    if !state.controller.is_authorized(user_id).await? {
        send_html(bot, chat, text::NOT_AUTHORIZED).await?;
        return Ok(());
    }

    let status = send_html(bot, chat, "🔍 Analyzing link...").await?;
    match state.probe.get_info(url).await {
        Ok(info) => {
            bot.edit_message_text(chat, status.id, text::media_summary(&info.title, info.duration_seconds))
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboards::media_choice(url))
                .await?;
        }
        Err(GateError::Media(reason)) => {
            bot.edit_message_text(chat, status.id, format!("❌ Could not read this link.\n\n<code>{reason}</code>"))
                .parse_mode(ParseMode::Html)
                .await?;
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

async fn run_broadcast(
    bot: &Bot,
    state: &BotState,
    admin: UserId,
    chat: ChatId,
    scope: BroadcastScope,
    message: &str,
) -> anyhow::Result<()> {
    let targets: Vec<UserId> = match scope {
        BroadcastScope::All => state
            .controller
            .all_users()
            .await?
            .iter()
            .map(|u| u.id)
            .collect(),
        BroadcastScope::Selected => {
            let mut ids: Vec<UserId> = state
                .sessions
                .snapshot(admin, SelectionPurpose::BroadcastTargets)
                .await
                .into_iter()
                .collect();
            ids.sort_unstable();
            ids
        }
    };

    let payload = format!("📢 <b>Message from Admin</b>\n\n{message}");
    let sink = TelegramSink::new(bot.clone());
    let report = vidgate_access::broadcast(&sink, &targets, &payload).await;
    state
        .sessions
        .clear(admin, SelectionPurpose::BroadcastTargets)
        .await;

    send_html(bot, chat, &text::broadcast_done(report.delivered, report.failed)).await?;
    Ok(())
}

/// Courtesy notification to an affected user; their chat may be closed, so
/// failure is logged and swallowed.
pub async fn notify_user(bot: &Bot, user_id: UserId, notice: &str) {
    let result = bot
        .send_message(ChatId(user_id), notice)
        .parse_mode(ParseMode::Html)
        .await;
    if let Err(err) = result {
        warn!(user_id, %err, "Could not notify user");
    }
}

pub async fn send_html(bot: &Bot, chat: ChatId, text: &str) -> anyhow::Result<Message> {
    Ok(bot
        .send_message(chat, text)
        .parse_mode(ParseMode::Html)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_shortcuts_parse() {
        let captures = RESOLVE_RE.captures("/approve_12").unwrap();
        assert_eq!(&captures[1], "approve");
        assert_eq!(&captures[2], "12");

        let captures = RESOLVE_RE.captures("/rejectuser_987654321").unwrap();
        assert_eq!(&captures[1], "rejectuser");

        assert!(RESOLVE_RE.captures("/approve_").is_none());
        assert!(RESOLVE_RE.captures("/approve_12 extra").is_none());
    }

    #[test]
    fn urls_are_detected_inside_messages() {
        assert!(URL_RE.is_match("check https://youtu.be/abc out"));
        assert!(URL_RE.is_match("http://example.com/v?id=1"));
        assert!(!URL_RE.is_match("no link here"));
    }
}
