use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use vidgate_access::{AccessController, BulkActionExecutor, SelectionRegistry};
use vidgate_core::UserId;
use vidgate_media::{MediaFetch, MediaProbe};
use vidgate_storage::{Database, DownloadLog};

use crate::action::BroadcastScope;

/// Shared handler state, injected into every update handler by the
/// dispatcher. Cheap to clone; everything inside is a handle.
#[derive(Clone)]
pub struct BotState {
    pub controller: AccessController,
    pub sessions: SelectionRegistry,
    pub executor: BulkActionExecutor,
    pub downloads: DownloadLog,
    pub probe: Arc<dyn MediaProbe>,
    pub fetch: Arc<dyn MediaFetch>,
    pub admin_id: UserId,
    pub max_file_bytes: u64,
    /// Admins mid-broadcast: their next message is the broadcast payload.
    pub compose: Arc<RwLock<HashMap<UserId, BroadcastScope>>>,
}

impl BotState {
    pub fn new(
        db: &Database,
        probe: Arc<dyn MediaProbe>,
        fetch: Arc<dyn MediaFetch>,
        admin_id: UserId,
        max_file_bytes: u64,
    ) -> Self {
        let controller = AccessController::new(db);
        Self {
            executor: BulkActionExecutor::new(controller.clone()),
            sessions: SelectionRegistry::new(),
            downloads: db.downloads(),
            controller,
            probe,
            fetch,
            admin_id,
            max_file_bytes,
            compose: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Claim a pending broadcast composition, if any. Lookup and removal
    /// happen under one write acquisition; holding a read guard while
    /// waiting for the write lock would deadlock the handler task.
    pub async fn take_compose(&self, user_id: UserId) -> Option<BroadcastScope> {
        self.compose.write().await.remove(&user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;

    use vidgate_core::{GateError, Result};
    use vidgate_media::{FetchedMedia, MediaInfo};

    struct NoMedia;

    #[async_trait]
    impl MediaProbe for NoMedia {
        async fn get_info(&self, _url: &str) -> Result<MediaInfo> {
            Err(GateError::Media("unavailable".into()))
        }
    }

    #[async_trait]
    impl MediaFetch for NoMedia {
        async fn download_video(&self, _url: &str) -> Result<FetchedMedia> {
            Err(GateError::Media("unavailable".into()))
        }
        async fn download_audio(&self, _url: &str) -> Result<FetchedMedia> {
            Err(GateError::Media("unavailable".into()))
        }
    }

    fn state() -> BotState {
        let db = Database::in_memory().unwrap();
        BotState::new(&db, Arc::new(NoMedia), Arc::new(NoMedia), 1, 1024)
    }

    #[tokio::test]
    async fn compose_claim_never_holds_a_read_guard() {
        let state = state();
        state.compose.write().await.insert(7, BroadcastScope::All);

        let claimed = tokio::time::timeout(Duration::from_secs(2), state.take_compose(7))
            .await
            .expect("claiming a composition must not block on its own lock");
        assert_eq!(claimed, Some(BroadcastScope::All));

        // Consumed: a second claim finds nothing.
        assert_eq!(state.take_compose(7).await, None);
    }
}
