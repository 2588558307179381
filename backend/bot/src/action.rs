//! Opaque action tokens carried in inline-button callback data.
//!
//! Every button click arrives as one of these strings; the enum is the only
//! place that knows the wire format, so encode and parse can never drift.

use vidgate_access::BulkAction;
use vidgate_core::{MediaType, RequestId, UserId};

/// Who a broadcast goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastScope {
    /// Every known user, whatever their status.
    All,
    /// The admin's current broadcast selection.
    Selected,
}

impl BroadcastScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Selected => "selected",
        }
    }
}

/// A decoded button click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Start,
    Help,
    RequestInfo,
    AdminPanel,
    ListUsers,
    PendingList,
    BroadcastMenu,
    BroadcastSelect { page: usize },
    BroadcastToggle { user_id: UserId, page: usize },
    BroadcastInput { scope: BroadcastScope },
    PendingSelect { page: usize },
    PendingToggle { user_id: UserId, page: usize },
    PendingConfirm,
    PendingExecute { action: BulkAction },
    Approve { request_id: RequestId },
    Reject { request_id: RequestId },
    Download { media: MediaType, url: String },
}

impl Action {
    pub fn encode(&self) -> String {
        match self {
            Self::Start => "start".into(),
            Self::Help => "help".into(),
            Self::RequestInfo => "request_info".into(),
            Self::AdminPanel => "admin_panel".into(),
            Self::ListUsers => "admin_list_users".into(),
            Self::PendingList => "admin_pending".into(),
            Self::BroadcastMenu => "admin_broadcast_menu".into(),
            Self::BroadcastSelect { page } => format!("admin_broadcast_select:{page}"),
            Self::BroadcastToggle { user_id, page } => {
                format!("admin_broadcast_toggle:{user_id}:{page}")
            }
            Self::BroadcastInput { scope } => format!("admin_broadcast_input:{}", scope.as_str()),
            Self::PendingSelect { page } => format!("admin_pending_select:{page}"),
            Self::PendingToggle { user_id, page } => {
                format!("admin_pending_toggle:{user_id}:{page}")
            }
            Self::PendingConfirm => "admin_pending_confirm".into(),
            Self::PendingExecute { action } => format!("admin_pending_execute:{}", action.as_str()),
            Self::Approve { request_id } => format!("admin_approve:{request_id}"),
            Self::Reject { request_id } => format!("admin_reject:{request_id}"),
            Self::Download { media, url } => format!("download_{media}:{url}"),
        }
    }

    /// Decode callback data. Unknown or malformed tokens yield `None`; the
    /// caller acknowledges and ignores them (stale keyboards from older
    /// bot versions).
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "start" => return Some(Self::Start),
            "help" => return Some(Self::Help),
            "request_info" => return Some(Self::RequestInfo),
            "admin_panel" => return Some(Self::AdminPanel),
            "admin_list_users" => return Some(Self::ListUsers),
            "admin_pending" => return Some(Self::PendingList),
            "admin_broadcast_menu" => return Some(Self::BroadcastMenu),
            "admin_pending_confirm" => return Some(Self::PendingConfirm),
            _ => {}
        }

        if let Some(rest) = data.strip_prefix("admin_broadcast_select:") {
            return Some(Self::BroadcastSelect {
                page: rest.parse().ok()?,
            });
        }
        if let Some(rest) = data.strip_prefix("admin_broadcast_toggle:") {
            let (user_id, page) = parse_id_page(rest)?;
            return Some(Self::BroadcastToggle { user_id, page });
        }
        if let Some(rest) = data.strip_prefix("admin_broadcast_input:") {
            let scope = match rest {
                "all" => BroadcastScope::All,
                "selected" => BroadcastScope::Selected,
                _ => return None,
            };
            return Some(Self::BroadcastInput { scope });
        }
        if let Some(rest) = data.strip_prefix("admin_pending_select:") {
            return Some(Self::PendingSelect {
                page: rest.parse().ok()?,
            });
        }
        if let Some(rest) = data.strip_prefix("admin_pending_toggle:") {
            let (user_id, page) = parse_id_page(rest)?;
            return Some(Self::PendingToggle { user_id, page });
        }
        if let Some(rest) = data.strip_prefix("admin_pending_execute:") {
            return Some(Self::PendingExecute {
                action: rest.parse().ok()?,
            });
        }
        if let Some(rest) = data.strip_prefix("admin_approve:") {
            return Some(Self::Approve {
                request_id: rest.parse().ok()?,
            });
        }
        if let Some(rest) = data.strip_prefix("admin_reject:") {
            return Some(Self::Reject {
                request_id: rest.parse().ok()?,
            });
        }
        if let Some(url) = data.strip_prefix("download_video:") {
            return Some(Self::Download {
                media: MediaType::Video,
                url: url.to_string(),
            });
        }
        if let Some(url) = data.strip_prefix("download_audio:") {
            return Some(Self::Download {
                media: MediaType::Audio,
                url: url.to_string(),
            });
        }
        None
    }
}

fn parse_id_page(rest: &str) -> Option<(UserId, usize)> {
    let (id, page) = rest.split_once(':')?;
    Some((id.parse().ok()?, page.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_tokens_carry_target_and_page() {
        let action = Action::parse("admin_broadcast_toggle:42:3").unwrap();
        assert_eq!(
            action,
            Action::BroadcastToggle {
                user_id: 42,
                page: 3
            }
        );
        assert_eq!(action.encode(), "admin_broadcast_toggle:42:3");
    }

    #[test]
    fn download_tokens_keep_the_whole_url() {
        // URLs may contain ':' themselves; only the first separator counts.
        let action = Action::parse("download_video:https://youtu.be/abc?t=1").unwrap();
        assert_eq!(
            action,
            Action::Download {
                media: vidgate_core::MediaType::Video,
                url: "https://youtu.be/abc?t=1".into()
            }
        );
    }

    #[test]
    fn execute_tokens_map_to_bulk_actions() {
        assert_eq!(
            Action::parse("admin_pending_execute:approve").unwrap(),
            Action::PendingExecute {
                action: BulkAction::Approve
            }
        );
        assert_eq!(
            Action::parse("admin_pending_execute:reject").unwrap(),
            Action::PendingExecute {
                action: BulkAction::Reject
            }
        );
    }

    #[test]
    fn malformed_tokens_are_ignored() {
        for bad in [
            "",
            "admin_broadcast_toggle:notanumber:0",
            "admin_pending_select:",
            "admin_pending_execute:ban",
            "something_else",
        ] {
            assert_eq!(Action::parse(bad), None, "{bad:?} should not parse");
        }
    }
}
