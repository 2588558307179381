use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use vidgate_core::{User, UserId};

/// Fixed window of users shown per page (five rows fit a button column).
pub const PAGE_SIZE: usize = 5;

/// Which multi-select flow a session belongs to. The two purposes are keyed
/// independently so broadcast targeting and pending bulk management never
/// share state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionPurpose {
    BroadcastTargets,
    PendingBulkAction,
}

/// Transient multi-select state for one admin and one purpose.
#[derive(Debug, Default, Clone)]
struct SelectionSession {
    selected: HashSet<UserId>,
    page: usize,
}

/// One rendered row of a selection page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRow {
    pub user_id: UserId,
    pub label: String,
    pub selected: bool,
}

/// A rendered selection page: the visible window plus navigation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView {
    pub rows: Vec<PageRow>,
    pub page: usize,
    pub has_prev: bool,
    pub has_next: bool,
    /// Live cardinality of the selection, recomputed on every render.
    pub selected_count: usize,
}

/// Render page `page` of `source` with the current selection.
///
/// The single rendering path for both "show page" and "show page after
/// toggle". The window is `[page*5, page*5+5)`; an out-of-range page yields
/// an empty window with navigation computed from the current source length,
/// which self-corrects on the next navigation.
pub fn render_page(source: &[User], selected: &HashSet<UserId>, page: usize) -> PageView {
    let start = page.saturating_mul(PAGE_SIZE);
    let end = start.saturating_add(PAGE_SIZE).min(source.len());

    let rows = if start < source.len() {
        source[start..end]
            .iter()
            .map(|user| PageRow {
                user_id: user.id,
                label: user.label().to_string(),
                selected: selected.contains(&user.id),
            })
            .collect()
    } else {
        Vec::new()
    };

    PageView {
        rows,
        page,
        has_prev: page > 0,
        has_next: start.saturating_add(PAGE_SIZE) < source.len(),
        selected_count: selected.len(),
    }
}

/// Registry of live selection sessions, keyed by `(admin, purpose)`.
///
/// Sessions are created lazily on the first interaction and cleared when a
/// bulk action consumes them. Each key is owned by exactly one admin's
/// interaction flow; the write lock serializes that admin's toggles in
/// arrival order.
#[derive(Clone, Default)]
pub struct SelectionRegistry {
    sessions: Arc<RwLock<HashMap<(UserId, SelectionPurpose), SelectionSession>>>,
}

impl SelectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip membership of `target` in the admin's selection. Returns whether
    /// the target is selected afterwards. Never changes the page.
    pub async fn toggle(
        &self,
        admin: UserId,
        purpose: SelectionPurpose,
        target: UserId,
    ) -> bool {
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry((admin, purpose)).or_default();
        let now_selected = if session.selected.remove(&target) {
            false
        } else {
            session.selected.insert(target);
            true
        };
        debug!(admin, ?purpose, target, now_selected, "Selection toggled");
        now_selected
    }

    /// Record the page the admin navigated to.
    pub async fn set_page(&self, admin: UserId, purpose: SelectionPurpose, page: usize) {
        let mut sessions = self.sessions.write().await;
        sessions.entry((admin, purpose)).or_default().page = page;
    }

    pub async fn page(&self, admin: UserId, purpose: SelectionPurpose) -> usize {
        let sessions = self.sessions.read().await;
        sessions.get(&(admin, purpose)).map_or(0, |s| s.page)
    }

    /// Current selection contents.
    pub async fn snapshot(&self, admin: UserId, purpose: SelectionPurpose) -> HashSet<UserId> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&(admin, purpose))
            .map(|s| s.selected.clone())
            .unwrap_or_default()
    }

    pub async fn selected_count(&self, admin: UserId, purpose: SelectionPurpose) -> usize {
        let sessions = self.sessions.read().await;
        sessions.get(&(admin, purpose)).map_or(0, |s| s.selected.len())
    }

    /// Drop the session entirely; processed selections are consumed.
    pub async fn clear(&self, admin: UserId, purpose: SelectionPurpose) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(&(admin, purpose));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use vidgate_core::UserStatus;

    fn users(n: usize) -> Vec<User> {
        (0..n as i64)
            .map(|i| User {
                id: i + 1,
                username: None,
                display_name: Some(format!("User {}", i + 1)),
                status: UserStatus::Pending,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .collect()
    }

    #[test]
    fn window_and_navigation() {
        let source = users(12);
        let selected = HashSet::new();

        let first = render_page(&source, &selected, 0);
        assert_eq!(first.rows.len(), 5);
        assert!(!first.has_prev);
        assert!(first.has_next);

        let last = render_page(&source, &selected, 2);
        assert_eq!(last.rows.len(), 2);
        assert!(last.has_prev);
        assert!(!last.has_next);
    }

    #[test]
    fn exact_multiple_has_no_phantom_page() {
        let source = users(10);
        let view = render_page(&source, &HashSet::new(), 1);
        assert_eq!(view.rows.len(), 5);
        assert!(!view.has_next);
    }

    #[test]
    fn empty_source_shows_nothing() {
        let view = render_page(&[], &HashSet::new(), 0);
        assert!(view.rows.is_empty());
        assert!(!view.has_prev);
        assert!(!view.has_next);
    }

    #[test]
    fn out_of_range_page_is_self_correcting() {
        // A concurrent removal shrank the list between renders.
        let source = users(3);
        let view = render_page(&source, &HashSet::new(), 4);
        assert!(view.rows.is_empty());
        assert!(view.has_prev);
        assert!(!view.has_next);
    }

    #[test]
    fn render_is_stable_without_writes() {
        let source = users(8);
        let selected: HashSet<UserId> = [2, 7].into_iter().collect();
        assert_eq!(
            render_page(&source, &selected, 1),
            render_page(&source, &selected, 1)
        );
    }

    #[test]
    fn selected_count_is_live() {
        let source = users(2);
        let selected: HashSet<UserId> = [1, 2].into_iter().collect();
        let view = render_page(&source, &selected, 0);
        assert_eq!(view.selected_count, 2);
        assert!(view.rows.iter().all(|r| r.selected));
    }

    #[tokio::test]
    async fn toggle_is_its_own_inverse() {
        let registry = SelectionRegistry::new();
        assert!(registry.toggle(1, SelectionPurpose::BroadcastTargets, 42).await);
        assert!(!registry.toggle(1, SelectionPurpose::BroadcastTargets, 42).await);
        assert!(registry
            .snapshot(1, SelectionPurpose::BroadcastTargets)
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn purposes_and_admins_are_isolated() {
        let registry = SelectionRegistry::new();
        registry.toggle(1, SelectionPurpose::BroadcastTargets, 10).await;
        registry.toggle(1, SelectionPurpose::PendingBulkAction, 20).await;
        registry.toggle(2, SelectionPurpose::BroadcastTargets, 30).await;

        let broadcast = registry.snapshot(1, SelectionPurpose::BroadcastTargets).await;
        assert_eq!(broadcast, [10].into_iter().collect());
        let pending = registry.snapshot(1, SelectionPurpose::PendingBulkAction).await;
        assert_eq!(pending, [20].into_iter().collect());
        let other_admin = registry.snapshot(2, SelectionPurpose::BroadcastTargets).await;
        assert_eq!(other_admin, [30].into_iter().collect());
    }

    #[tokio::test]
    async fn clear_consumes_the_session() {
        let registry = SelectionRegistry::new();
        registry.toggle(1, SelectionPurpose::PendingBulkAction, 5).await;
        registry.set_page(1, SelectionPurpose::PendingBulkAction, 3).await;

        registry.clear(1, SelectionPurpose::PendingBulkAction).await;
        assert_eq!(
            registry.selected_count(1, SelectionPurpose::PendingBulkAction).await,
            0
        );
        assert_eq!(registry.page(1, SelectionPurpose::PendingBulkAction).await, 0);
    }
}
