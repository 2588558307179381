//! Inline/reply keyboard builders. Selection keyboards are rendered from a
//! `PageView` so every path shows the same window and navigation state.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup};

use vidgate_access::{BulkAction, PageView};
use vidgate_core::{RequestId, UserId};

use crate::action::{Action, BroadcastScope};

fn button(label: &str, action: Action) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(label.to_string(), action.encode())
}

pub fn main_menu(authorized: bool, admin: bool) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    if !authorized {
        rows.push(vec![button("📝 Request Access", Action::RequestInfo)]);
    }
    rows.push(vec![button("❓ Help", Action::Help)]);
    if admin {
        rows.push(vec![button("👑 Admin Panel", Action::AdminPanel)]);
    }
    InlineKeyboardMarkup::new(rows)
}

/// Persistent reply keyboard mirroring the main menu.
pub fn reply_menu(authorized: bool, admin: bool) -> KeyboardMarkup {
    let mut rows = Vec::new();
    if !authorized {
        rows.push(vec![KeyboardButton::new("📝 Request Access")]);
    }
    rows.push(vec![
        KeyboardButton::new("🏠 Main Menu"),
        KeyboardButton::new("❓ Help"),
    ]);
    if admin {
        rows.push(vec![KeyboardButton::new("👑 Admin Panel")]);
    }
    KeyboardMarkup::new(rows).resize_keyboard()
}

pub fn back_to(action: Action) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![button("🔙 Back", action)]])
}

pub fn admin_panel() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button("📢 Broadcast Message", Action::BroadcastMenu)],
        vec![button("👥 Users List", Action::ListUsers)],
        vec![button("⏳ Pending Requests", Action::PendingList)],
        vec![button("🔙 Main Menu", Action::Start)],
    ])
}

pub fn broadcast_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button(
            "📢 Send to ALL Users",
            Action::BroadcastInput {
                scope: BroadcastScope::All,
            },
        )],
        vec![button("👤 Select Users", Action::BroadcastSelect { page: 0 })],
        vec![button("🔙 Back", Action::AdminPanel)],
    ])
}

pub fn pending_overview() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button("✅ Bulk Manage", Action::PendingSelect { page: 0 })],
        vec![button("🔙 Back", Action::AdminPanel)],
    ])
}

pub fn approve_reject(request_id: RequestId) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        button("✅ Approve", Action::Approve { request_id }),
        button("❌ Reject", Action::Reject { request_id }),
    ]])
}

pub fn media_choice(url: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        button(
            "🎬 Video",
            Action::Download {
                media: vidgate_core::MediaType::Video,
                url: url.to_string(),
            },
        ),
        button(
            "🎵 Audio",
            Action::Download {
                media: vidgate_core::MediaType::Audio,
                url: url.to_string(),
            },
        ),
    ]])
}

/// Broadcast target selection page.
pub fn broadcast_selection(view: &PageView) -> InlineKeyboardMarkup {
    selection_keyboard(
        view,
        |user_id, page| Action::BroadcastToggle { user_id, page },
        |page| Action::BroadcastSelect { page },
        button(
            &format!("✅ Done ({} selected)", view.selected_count),
            Action::BroadcastInput {
                scope: BroadcastScope::Selected,
            },
        ),
        Action::BroadcastMenu,
    )
}

/// Pending bulk-management selection page.
pub fn pending_selection(view: &PageView) -> InlineKeyboardMarkup {
    selection_keyboard(
        view,
        |user_id, page| Action::PendingToggle { user_id, page },
        |page| Action::PendingSelect { page },
        button(
            &format!("✅ Process ({})", view.selected_count),
            Action::PendingConfirm,
        ),
        Action::PendingList,
    )
}

fn selection_keyboard(
    view: &PageView,
    toggle: impl Fn(UserId, usize) -> Action,
    navigate: impl Fn(usize) -> Action,
    done: InlineKeyboardButton,
    back: Action,
) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    for row in &view.rows {
        let mark = if row.selected { "✅" } else { "⬜" };
        rows.push(vec![button(
            &format!("{mark} {} ({})", row.label, row.user_id),
            toggle(row.user_id, view.page),
        )]);
    }

    let mut nav = Vec::new();
    if view.has_prev {
        nav.push(button("⬅️ Prev", navigate(view.page - 1)));
    }
    if view.has_next {
        nav.push(button("Next ➡️", navigate(view.page + 1)));
    }
    if !nav.is_empty() {
        rows.push(nav);
    }

    rows.push(vec![done]);
    rows.push(vec![button("🔙 Back", back)]);
    InlineKeyboardMarkup::new(rows)
}

pub fn bulk_confirm() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![button(
            "✅ Approve Selected",
            Action::PendingExecute {
                action: BulkAction::Approve,
            },
        )],
        vec![button(
            "❌ Reject Selected",
            Action::PendingExecute {
                action: BulkAction::Reject,
            },
        )],
        vec![button("🔙 Back", Action::PendingSelect { page: 0 })],
    ])
}
