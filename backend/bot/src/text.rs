//! User-facing message texts (Telegram HTML).

use vidgate_core::{AccessRequest, User, UserId, UserStatus};

pub fn welcome(display_name: &str, authorized: bool, admin: bool) -> String {
    let mut text = format!(
        "🎬 <b>Video/Audio Downloader Bot</b>\n\n\
         Welcome, {display_name}!\n\n\
         You can download video and audio from various platforms using this bot.\n\n\
         <b>📝 How to use:</b>\n\
         1. Just send any video link\n\
         2. The bot will ask if you want Video or Audio\n\
         3. Select your choice and download will start\n\n\
         <b>📋 Commands:</b>\n\
         /start - Restart bot\n\
         /help - Help and instructions\n\
         /request - Request access\n"
    );
    if authorized {
        text.push_str("\n✅ You are authorized! Send a link now.\n");
    } else {
        text.push_str("\n⚠️ You are not authorized yet. Click 'Request Access'.\n");
    }
    if admin {
        text.push_str(
            "\n<b>👑 Admin Commands:</b>\n\
             <code>/adduser user_id</code>\n\
             <code>/removeuser user_id</code>\n",
        );
    }
    text
}

pub const HELP: &str = "<b>📖 Help Guide</b>\n\n\
    <b>To Download:</b>\n\
    Just send any video link. The bot will ask if you want Video or Audio.\n\n\
    <b>Example Links:</b>\n\
    <code>https://www.youtube.com/watch?v=xxxxx</code>\n\
    <code>https://www.instagram.com/p/xxxxx</code>\n\n\
    <b>📋 Commands:</b>\n\
    /start - Return to Main Menu\n\
    /help - Show this help message\n\
    /request - Request access\n\n\
    <b>❓ Having trouble?</b>\n\
    Ensure the link is correct and the video is public.";

pub const REQUEST_INFO: &str = "📝 <b>Request Access</b>\n\n\
    To use this bot, you need to request access.\n\
    Use the following command to send a polite request:\n\n\
    <code>/request Your message here</code>\n\n\
    Example:\n\
    <code>/request I am a subscriber, please grant me access.</code>";

/// Uniform denial: never reveals whether an id or request exists.
pub const NOT_AUTHORIZED: &str =
    "⚠️ You are not authorized to use this bot.\n\nClick 'Request Access' or send /request.";

pub const ADMIN_ONLY: &str = "❌ This command is for admins only.";
pub const ACCESS_DENIED: &str = "❌ Access Denied";

pub const APPROVED_NOTICE: &str = "🎉 <b>Congratulations!</b>\n\n\
    Your access request has been approved. You can now use the bot!";

pub const REJECTED_NOTICE: &str = "😔 <b>Sorry!</b>\n\nYour access request has been rejected.";

pub const REQUEST_SENT: &str =
    "✅ Your access request has been sent! An admin will review it shortly.";

pub fn status_emoji(status: UserStatus) -> &'static str {
    match status {
        UserStatus::Admin => "👑",
        UserStatus::Approved => "✅",
        UserStatus::Pending => "⏳",
        UserStatus::Rejected => "❌",
    }
}

pub fn format_users(users: &[User]) -> String {
    if users.is_empty() {
        return "No users found.".to_string();
    }
    let mut text = String::from("📋 <b>All Users List:</b>\n\n");
    for user in users {
        text.push_str(&format!(
            "{} <b>ID:</b> {}\n   <b>Name:</b> {}\n   <b>Username:</b> @{}\n   <b>Status:</b> {}\n\n",
            status_emoji(user.status),
            user.id,
            user.display_name.as_deref().unwrap_or("Unknown"),
            user.username.as_deref().unwrap_or("N/A"),
            user.status,
        ));
    }
    text
}

/// Pending overview: formal requests first, then pending users who never
/// sent a request message (deduplicated against the requests above).
pub fn format_pending(requests: &[AccessRequest], pending_users: &[User]) -> String {
    if requests.is_empty() && pending_users.is_empty() {
        return "No pending requests.".to_string();
    }

    let mut text = String::from("⏳ <b>Pending Access Requests:</b>\n\n");
    for request in requests {
        text.push_str(&format!(
            "🆔 <b>Request #{}</b>\n   <b>User ID:</b> {}\n   <b>Name:</b> {}\n   <b>Username:</b> @{}\n",
            request.id,
            request.user_id,
            request.display_name.as_deref().unwrap_or("Unknown"),
            request.username.as_deref().unwrap_or("N/A"),
        ));
        if let Some(message) = request.message.as_deref().filter(|m| !m.is_empty()) {
            text.push_str(&format!("   <b>Message:</b> {message}\n"));
        }
        text.push_str(&format!(
            "   <b>Date:</b> {}\n\n   /approve_{} | /reject_{}\n\n",
            request.created_at.format("%Y-%m-%d %H:%M:%S"),
            request.id,
            request.id,
        ));
    }

    let request_user_ids: Vec<UserId> = requests.iter().map(|r| r.user_id).collect();
    let implicit: Vec<&User> = pending_users
        .iter()
        .filter(|u| !request_user_ids.contains(&u.id))
        .collect();

    if !implicit.is_empty() {
        if !requests.is_empty() {
            text.push_str("---------\n");
        }
        for user in implicit {
            text.push_str(&format!(
                "👤 <b>New User (No Request Message)</b>\n   <b>User ID:</b> {}\n   <b>Name:</b> {}\n   <b>Username:</b> @{}\n   <b>Date:</b> {}\n\n   /approveuser_{} | /rejectuser_{}\n\n",
                user.id,
                user.display_name.as_deref().unwrap_or("Unknown"),
                user.username.as_deref().unwrap_or("N/A"),
                user.created_at.format("%Y-%m-%d %H:%M:%S"),
                user.id,
                user.id,
            ));
        }
    }
    text
}

pub fn new_request_alert(request: &AccessRequest) -> String {
    let mut text = format!(
        "🔔 <b>New Access Request</b>\n\n<b>User ID:</b> {}\n<b>Name:</b> {}\n<b>Username:</b> @{}\n",
        request.user_id,
        request.display_name.as_deref().unwrap_or("Unknown"),
        request.username.as_deref().unwrap_or("N/A"),
    );
    if let Some(message) = request.message.as_deref().filter(|m| !m.is_empty()) {
        text.push_str(&format!("<b>Message:</b> {message}\n"));
    }
    text
}

pub fn media_summary(title: &str, duration_seconds: u64) -> String {
    let hours = duration_seconds / 3600;
    let minutes = (duration_seconds % 3600) / 60;
    format!(
        "📹 <b>{title}</b>\n\n⏱ Duration: {hours}h {minutes}m\n\nWhat would you like to download?"
    )
}

pub fn broadcast_done(delivered: usize, failed: usize) -> String {
    format!("✅ <b>Broadcast Complete</b>\n\n🟢 Success: {delivered}\n🔴 Failed: {failed}")
}

pub fn batch_done(action: &str, succeeded: usize, attempted: usize) -> String {
    format!(
        "✅ <b>Batch Complete</b>\n\nAction: {action}\nProcessed: {succeeded}/{attempted}"
    )
}

/// Telegram caps a message at 4096 chars; long lists are truncated with a
/// marker rather than split.
pub fn clamp_message(text: String) -> String {
    const LIMIT: usize = 4000;
    if text.len() <= LIMIT {
        return text;
    }
    let cut = (0..=LIMIT).rev().find(|&i| text.is_char_boundary(i)).unwrap_or(0);
    format!("{}\n... (more)", &text[..cut])
}
