//! Inline-button click handling. Every click is acknowledged exactly once;
//! unknown tokens (stale keyboards from older bot versions) are acked and
//! dropped.

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, MessageId, ParseMode};
use tracing::debug;

use vidgate_access::{render_page, SelectionPurpose};
use vidgate_core::{GateError, UserId};

use crate::action::{Action, BroadcastScope};
use crate::commands::notify_user;
use crate::download;
use crate::keyboards;
use crate::state::BotState;
use crate::text;

pub async fn handle_callback(bot: Bot, q: CallbackQuery, state: BotState) -> anyhow::Result<()> {
    let user_id = q.from.id.0 as i64;

    let action = q.data.as_deref().and_then(Action::parse);
    let Some(action) = action else {
        debug!(user_id, data = ?q.data, "Dropping unrecognized callback");
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };

    // Clicks on messages Telegram no longer lets us edit are just acked.
    let Some(message) = q.message.as_ref().and_then(|m| m.regular_message()) else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };
    let chat = message.chat.id;
    let msg_id = message.id;

    if action_is_admin_only(&action) && !state.controller.is_admin(user_id).await? {
        bot.answer_callback_query(q.id.clone())
            .text(text::ACCESS_DENIED)
            .show_alert(true)
            .await?;
        return Ok(());
    }

    match action {
        Action::Start => {
            let authorized = state.controller.is_authorized(user_id).await?;
            let admin = state.controller.is_admin(user_id).await?;
            let name = q.from.full_name();
            edit(
                &bot,
                chat,
                msg_id,
                &text::welcome(&name, authorized, admin),
                keyboards::main_menu(authorized, admin),
            )
            .await?;
        }
        Action::Help => {
            edit(&bot, chat, msg_id, text::HELP, keyboards::back_to(Action::Start)).await?;
        }
        Action::RequestInfo => {
            edit(
                &bot,
                chat,
                msg_id,
                text::REQUEST_INFO,
                keyboards::back_to(Action::Start),
            )
            .await?;
        }
        Action::AdminPanel => {
            edit(&bot, chat, msg_id, "👑 <b>Admin Panel</b>", keyboards::admin_panel()).await?;
        }
        Action::ListUsers => {
            let users = state.controller.all_users().await?;
            edit(
                &bot,
                chat,
                msg_id,
                &text::clamp_message(text::format_users(&users)),
                keyboards::back_to(Action::AdminPanel),
            )
            .await?;
        }
        Action::PendingList => {
            let requests = state.controller.pending_requests().await?;
            let pending = state.controller.pending_users().await?;
            edit(
                &bot,
                chat,
                msg_id,
                &text::clamp_message(text::format_pending(&requests, &pending)),
                keyboards::pending_overview(),
            )
            .await?;
        }
        Action::BroadcastMenu => {
            // Entering the menu abandons any half-finished composition.
            state.compose.write().await.remove(&user_id);
            edit(
                &bot,
                chat,
                msg_id,
                "📢 <b>Broadcast Message</b>\n\nSend to everyone, or pick specific users.",
                keyboards::broadcast_menu(),
            )
            .await?;
        }
        Action::BroadcastSelect { page } => {
            show_selection(&bot, &state, chat, msg_id, user_id, SelectionPurpose::BroadcastTargets, page)
                .await?;
        }
        Action::BroadcastToggle { user_id: target, page } => {
            state
                .sessions
                .toggle(user_id, SelectionPurpose::BroadcastTargets, target)
                .await;
            show_selection(&bot, &state, chat, msg_id, user_id, SelectionPurpose::BroadcastTargets, page)
                .await?;
        }
        Action::BroadcastInput { scope } => {
            if scope == BroadcastScope::Selected
                && state
                    .sessions
                    .selected_count(user_id, SelectionPurpose::BroadcastTargets)
                    .await
                    == 0
            {
                bot.answer_callback_query(q.id.clone())
                    .text("No users selected.")
                    .show_alert(true)
                    .await?;
                return Ok(());
            }
            state.compose.write().await.insert(user_id, scope);
            edit(
                &bot,
                chat,
                msg_id,
                "✍️ Send the broadcast message now, or /cancel to abort.",
                keyboards::back_to(Action::BroadcastMenu),
            )
            .await?;
        }
        Action::PendingSelect { page } => {
            show_selection(&bot, &state, chat, msg_id, user_id, SelectionPurpose::PendingBulkAction, page)
                .await?;
        }
        Action::PendingToggle { user_id: target, page } => {
            state
                .sessions
                .toggle(user_id, SelectionPurpose::PendingBulkAction, target)
                .await;
            show_selection(&bot, &state, chat, msg_id, user_id, SelectionPurpose::PendingBulkAction, page)
                .await?;
        }
        Action::PendingConfirm => {
            let count = state
                .sessions
                .selected_count(user_id, SelectionPurpose::PendingBulkAction)
                .await;
            if count == 0 {
                bot.answer_callback_query(q.id.clone())
                    .text("No users selected.")
                    .show_alert(true)
                    .await?;
                return Ok(());
            }
            edit(
                &bot,
                chat,
                msg_id,
                &format!("⚡ Apply an action to <b>{count}</b> selected user(s):"),
                keyboards::bulk_confirm(),
            )
            .await?;
        }
        Action::PendingExecute { action } => {
            let selected = state
                .sessions
                .snapshot(user_id, SelectionPurpose::PendingBulkAction)
                .await;
            let report = match state.executor.execute(&selected, action).await {
                Ok(report) => report,
                Err(GateError::EmptySelection) => {
                    bot.answer_callback_query(q.id.clone())
                        .text("No users selected.")
                        .show_alert(true)
                        .await?;
                    return Ok(());
                }
                Err(err) => return Err(err.into()),
            };
            state
                .sessions
                .clear(user_id, SelectionPurpose::PendingBulkAction)
                .await;

            let notice = match action {
                vidgate_access::BulkAction::Approve => text::APPROVED_NOTICE,
                vidgate_access::BulkAction::Reject => text::REJECTED_NOTICE,
            };
            for target in report.succeeded_users() {
                notify_user(&bot, target, notice).await;
            }
            edit(
                &bot,
                chat,
                msg_id,
                &text::batch_done(action.as_str(), report.succeeded, report.attempted),
                keyboards::back_to(Action::AdminPanel),
            )
            .await?;
        }
        Action::Approve { request_id } => {
            return resolve_single(&bot, &state, chat, msg_id, &q, request_id, true).await;
        }
        Action::Reject { request_id } => {
            return resolve_single(&bot, &state, chat, msg_id, &q, request_id, false).await;
        }
        Action::Download { media, url } => {
            if !state.controller.is_authorized(user_id).await? {
                bot.answer_callback_query(q.id.clone())
                    .text(text::ACCESS_DENIED)
                    .show_alert(true)
                    .await?;
                return Ok(());
            }
            bot.answer_callback_query(q.id.clone()).await?;
            // The fetch can run for minutes; keep handling other updates.
            tokio::spawn(download::run_download(
                bot.clone(),
                state.clone(),
                chat,
                msg_id,
                user_id,
                media,
                url,
            ));
            return Ok(());
        }
    }

    bot.answer_callback_query(q.id.clone()).await?;
    Ok(())
}

fn action_is_admin_only(action: &Action) -> bool {
    !matches!(
        action,
        Action::Start | Action::Help | Action::RequestInfo | Action::Download { .. }
    )
}

/// Render (or re-render after a toggle) one selection page. Both flows go
/// through the same renderer; only the source list and keyboard differ.
async fn show_selection(
    bot: &Bot,
    state: &BotState,
    chat: ChatId,
    msg_id: MessageId,
    admin: UserId,
    purpose: SelectionPurpose,
    page: usize,
) -> anyhow::Result<()> {
    state.sessions.set_page(admin, purpose, page).await;
    let source = match purpose {
        SelectionPurpose::BroadcastTargets => state.controller.all_users().await?,
        SelectionPurpose::PendingBulkAction => state.controller.pending_users().await?,
    };
    let selected = state.sessions.snapshot(admin, purpose).await;
    let view = render_page(&source, &selected, page);

    let (title, keyboard) = match purpose {
        SelectionPurpose::BroadcastTargets => (
            "👤 <b>Select Broadcast Targets</b>\n\nTap a user to toggle.",
            keyboards::broadcast_selection(&view),
        ),
        SelectionPurpose::PendingBulkAction => (
            "✅ <b>Bulk Manage Pending Users</b>\n\nTap a user to toggle.",
            keyboards::pending_selection(&view),
        ),
    };
    edit(bot, chat, msg_id, title, keyboard).await
}

async fn resolve_single(
    bot: &Bot,
    state: &BotState,
    chat: ChatId,
    msg_id: MessageId,
    q: &CallbackQuery,
    request_id: i64,
    approve: bool,
) -> anyhow::Result<()> {
    let result = if approve {
        state.controller.approve_request(request_id).await
    } else {
        state.controller.reject_request(request_id).await
    };
    match result {
        Ok(target) => {
            let notice = if approve {
                text::APPROVED_NOTICE
            } else {
                text::REJECTED_NOTICE
            };
            notify_user(bot, target, notice).await;
            let verdict = if approve { "approved" } else { "rejected" };
            bot.edit_message_text(
                chat,
                msg_id,
                format!("✅ Request #{request_id} {verdict} (user {target})."),
            )
            .await?;
            bot.answer_callback_query(q.id.clone()).await?;
        }
        // Usually a double-click on an already-resolved alert.
        Err(err) if err.is_informational() => {
            bot.answer_callback_query(q.id.clone())
                .text(err.to_string())
                .show_alert(true)
                .await?;
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

async fn edit(
    bot: &Bot,
    chat: ChatId,
    msg_id: MessageId,
    body: &str,
    keyboard: InlineKeyboardMarkup,
) -> anyhow::Result<()> {
    let result = bot
        .edit_message_text(chat, msg_id, body)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await;
    match result {
        Ok(_) => Ok(()),
        // Re-rendering an identical page is a no-op, not an error.
        Err(err) if err.to_string().contains("message is not modified") => Ok(()),
        Err(err) => Err(err.into()),
    }
}
