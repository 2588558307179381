use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use vidgate_core::{GateError, Result, UserId};

use crate::AccessController;

/// Courtesy pause between broadcast sends so large batches stay under the
/// platform rate limits. Not a correctness requirement.
const SEND_PACING: Duration = Duration::from_millis(50);

/// The action applied to every member of a pending-bulk selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    Approve,
    Reject,
}

impl BulkAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}

impl FromStr for BulkAction {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            other => Err(GateError::Storage(format!("unknown bulk action: {other}"))),
        }
    }
}

/// Per-target result of a bulk run. `error` is `None` on success.
#[derive(Debug)]
pub struct BulkItem {
    pub user_id: UserId,
    pub error: Option<GateError>,
}

/// Aggregate outcome of a bulk run: "N/M succeeded" plus the per-target
/// detail so the caller can notify the affected users.
#[derive(Debug, Default)]
pub struct BulkReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub items: Vec<BulkItem>,
}

impl BulkReport {
    /// Users the action succeeded for, in processing order.
    pub fn succeeded_users(&self) -> impl Iterator<Item = UserId> + '_ {
        self.items
            .iter()
            .filter(|i| i.error.is_none())
            .map(|i| i.user_id)
    }
}

/// Applies one action to every member of a selection snapshot, isolating
/// per-target failures.
#[derive(Clone)]
pub struct BulkActionExecutor {
    controller: AccessController,
}

impl BulkActionExecutor {
    pub fn new(controller: AccessController) -> Self {
        Self { controller }
    }

    /// Run `action` against every selected user.
    ///
    /// Targets with an open request are resolved through it; targets without
    /// one are acted on directly (`add_user_directly` / `remove_user`). A
    /// failure on one target never aborts the rest.
    pub async fn execute(
        &self,
        selected: &HashSet<UserId>,
        action: BulkAction,
    ) -> Result<BulkReport> {
        if selected.is_empty() {
            return Err(GateError::EmptySelection);
        }

        let pending = self.controller.pending_request_ids().await?;
        let mut targets: Vec<UserId> = selected.iter().copied().collect();
        targets.sort_unstable();

        let mut report = BulkReport::default();
        for user_id in targets {
            report.attempted += 1;
            let result = match (action, pending.get(&user_id)) {
                (BulkAction::Approve, Some(&request_id)) => self
                    .controller
                    .approve_request(request_id)
                    .await
                    .map(|_| ()),
                (BulkAction::Approve, None) => self.controller.add_user_directly(user_id).await,
                (BulkAction::Reject, Some(&request_id)) => {
                    self.controller.reject_request(request_id).await.map(|_| ())
                }
                (BulkAction::Reject, None) => self.controller.remove_user(user_id).await,
            };

            match result {
                Ok(()) => {
                    report.succeeded += 1;
                    report.items.push(BulkItem { user_id, error: None });
                }
                Err(err) => {
                    warn!(user_id, action = action.as_str(), %err, "Bulk target failed");
                    report.items.push(BulkItem {
                        user_id,
                        error: Some(err),
                    });
                }
            }
        }

        info!(
            action = action.as_str(),
            succeeded = report.succeeded,
            attempted = report.attempted,
            "Bulk action complete"
        );
        Ok(report)
    }
}

/// Outbound delivery capability, implemented by the bot layer and mocked in
/// tests.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn deliver(&self, user_id: UserId, text: &str) -> Result<()>;
}

/// Tally of a broadcast fan-out.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Fan `text` out to every target, tolerating per-recipient delivery
/// failures (blocked bot, deleted account) without aborting the batch.
pub async fn broadcast(
    sink: &dyn MessageSink,
    targets: &[UserId],
    text: &str,
) -> BroadcastReport {
    let mut report = BroadcastReport::default();
    for &user_id in targets {
        match sink.deliver(user_id, text).await {
            Ok(()) => report.delivered += 1,
            Err(err) => {
                warn!(user_id, %err, "Broadcast delivery failed");
                report.failed += 1;
            }
        }
        tokio::time::sleep(SEND_PACING).await;
    }
    info!(
        delivered = report.delivered,
        failed = report.failed,
        "Broadcast complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use vidgate_storage::Database;

    async fn executor() -> (AccessController, BulkActionExecutor) {
        let ctl = AccessController::new(&Database::in_memory().unwrap());
        (ctl.clone(), BulkActionExecutor::new(ctl))
    }

    #[tokio::test]
    async fn empty_selection_is_rejected_up_front() {
        let (_, exec) = executor().await;
        let err = exec
            .execute(&HashSet::new(), BulkAction::Approve)
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::EmptySelection));
    }

    #[tokio::test]
    async fn mixed_request_and_direct_targets_all_approve() {
        let (ctl, exec) = executor().await;
        // 10 has an open request; 20 and 30 have never been seen.
        let request = ctl.request_access(10, None, None, None).await.unwrap();

        let selected: HashSet<UserId> = [10, 20, 30].into_iter().collect();
        let report = exec.execute(&selected, BulkAction::Approve).await.unwrap();

        assert_eq!(report.attempted, 3);
        assert_eq!(report.succeeded, 3);
        for id in [10, 20, 30] {
            assert!(ctl.is_authorized(id).await.unwrap());
        }
        // The open request was resolved, not bypassed.
        assert!(ctl
            .pending_request_ids()
            .await
            .unwrap()
            .get(&10)
            .is_none());
        let _ = request;
    }

    #[tokio::test]
    async fn one_failing_target_does_not_abort_the_batch() {
        let (ctl, exec) = executor().await;
        ctl.add_user_directly(1).await.unwrap();
        // 2 is unknown: Reject falls through to remove_user, which fails.
        let selected: HashSet<UserId> = [1, 2].into_iter().collect();

        let report = exec.execute(&selected, BulkAction::Reject).await.unwrap();
        assert_eq!(report.attempted, 2);
        assert_eq!(report.succeeded, 1);

        let failed: Vec<_> = report
            .items
            .iter()
            .filter(|i| i.error.is_some())
            .map(|i| i.user_id)
            .collect();
        assert_eq!(failed, vec![2]);
    }

    #[tokio::test]
    async fn reject_resolves_requests_and_removes_direct_targets() {
        let (ctl, exec) = executor().await;
        let request = ctl.request_access(5, None, None, None).await.unwrap();
        ctl.add_user_directly(6).await.unwrap();

        let selected: HashSet<UserId> = [5, 6].into_iter().collect();
        let report = exec.execute(&selected, BulkAction::Reject).await.unwrap();
        assert_eq!(report.succeeded, 2);

        // 5 stays on file as rejected; 6 is gone entirely.
        assert!(!ctl.is_authorized(5).await.unwrap());
        assert!(ctl.all_users().await.unwrap().iter().any(|u| u.id == 5));
        assert!(ctl.all_users().await.unwrap().iter().all(|u| u.id != 6));
        let _ = request;
    }

    #[tokio::test]
    async fn processed_selection_is_consumed() {
        use crate::{SelectionPurpose, SelectionRegistry};

        let (ctl, exec) = executor().await;
        ctl.request_access(70, None, None, None).await.unwrap();
        ctl.request_access(71, None, None, None).await.unwrap();

        let registry = SelectionRegistry::new();
        registry.toggle(1, SelectionPurpose::PendingBulkAction, 70).await;
        registry.toggle(1, SelectionPurpose::PendingBulkAction, 71).await;

        let selected = registry.snapshot(1, SelectionPurpose::PendingBulkAction).await;
        let report = exec.execute(&selected, BulkAction::Approve).await.unwrap();
        assert_eq!(report.succeeded, 2);
        registry.clear(1, SelectionPurpose::PendingBulkAction).await;

        // The session is gone; re-running without a fresh selection is an
        // empty-selection error, not a silent re-apply.
        assert_eq!(
            registry
                .selected_count(1, SelectionPurpose::PendingBulkAction)
                .await,
            0
        );
        let stale = registry.snapshot(1, SelectionPurpose::PendingBulkAction).await;
        let err = exec.execute(&stale, BulkAction::Approve).await.unwrap_err();
        assert!(matches!(err, GateError::EmptySelection));
    }

    struct FlakySink {
        failing: HashSet<UserId>,
        seen: Mutex<Vec<UserId>>,
    }

    #[async_trait]
    impl MessageSink for FlakySink {
        async fn deliver(&self, user_id: UserId, _text: &str) -> Result<()> {
            self.seen.lock().unwrap().push(user_id);
            if self.failing.contains(&user_id) {
                Err(GateError::Delivery {
                    user_id,
                    reason: "blocked the bot".into(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn broadcast_continues_past_delivery_failures() {
        let sink = FlakySink {
            failing: [2].into_iter().collect(),
            seen: Mutex::new(Vec::new()),
        };

        let report = broadcast(&sink, &[1, 2, 3], "hello").await;
        assert_eq!(
            report,
            BroadcastReport {
                delivered: 2,
                failed: 1
            }
        );
        // Every target was attempted, in order.
        assert_eq!(*sink.seen.lock().unwrap(), vec![1, 2, 3]);
    }
}
