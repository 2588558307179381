use std::collections::HashMap;

use tracing::{info, warn};

use vidgate_core::{
    AccessRequest, GateError, RequestId, RequestStatus, Result, User, UserId, UserStatus,
};
use vidgate_storage::{Database, RequestStore, UserStore};

/// State machine governing user authorization.
///
/// Every operation touches at most one user row and one request row, so
/// single-row atomicity from the store is all the transactionality needed.
/// Business short-circuits come back as `GateError` variants; callers decide
/// what to surface.
#[derive(Clone)]
pub struct AccessController {
    users: UserStore,
    requests: RequestStore,
}

impl AccessController {
    pub fn new(db: &Database) -> Self {
        Self {
            users: db.users(),
            requests: db.requests(),
        }
    }

    /// A user asks for authorization.
    ///
    /// Already-authorized and already-pending users are short-circuited.
    /// Rejected users may ask again. Every successful call appends a fresh
    /// request row; history is never deduplicated.
    pub async fn request_access(
        &self,
        user_id: UserId,
        username: Option<&str>,
        display_name: Option<&str>,
        message: Option<&str>,
    ) -> Result<AccessRequest> {
        match self.users.get(user_id).await? {
            Some(user) if user.status.is_authorized() => {
                return Err(GateError::AlreadyAuthorized);
            }
            Some(user) if user.status == UserStatus::Pending => {
                return Err(GateError::RequestAlreadyPending);
            }
            Some(_) => {
                // Rejected: leave the status alone, a new request goes in.
            }
            None => {
                match self
                    .users
                    .insert(user_id, username, display_name, UserStatus::Pending)
                    .await
                {
                    Ok(()) | Err(GateError::DuplicateKey) => {}
                    Err(other) => return Err(other),
                }
            }
        }

        let id = self
            .requests
            .insert(user_id, username, display_name, message)
            .await?;
        info!(user_id, request_id = id, "Access requested");
        self.requests
            .get(id)
            .await?
            .ok_or(GateError::RequestNotFound(id))
    }

    /// First-contact registration: record an unseen user as `Pending` without
    /// opening a request. Known users are left untouched so repeated /start
    /// never clobbers a status.
    pub async fn ensure_known(
        &self,
        user_id: UserId,
        username: Option<&str>,
        display_name: Option<&str>,
    ) -> Result<()> {
        if self.users.get(user_id).await?.is_none() {
            match self
                .users
                .insert(user_id, username, display_name, UserStatus::Pending)
                .await
            {
                Ok(()) => info!(user_id, "User first seen"),
                Err(GateError::DuplicateKey) => {}
                Err(other) => return Err(other),
            }
        }
        Ok(())
    }

    /// Approve a request: the referenced user becomes `Approved` and the
    /// request is resolved. Returns the affected user so the caller can
    /// notify them.
    pub async fn approve_request(&self, request_id: RequestId) -> Result<UserId> {
        self.resolve_request(request_id, UserStatus::Approved, RequestStatus::Approved)
            .await
    }

    /// Reject a request: user becomes `Rejected`, request is resolved.
    pub async fn reject_request(&self, request_id: RequestId) -> Result<UserId> {
        self.resolve_request(request_id, UserStatus::Rejected, RequestStatus::Rejected)
            .await
    }

    async fn resolve_request(
        &self,
        request_id: RequestId,
        user_status: UserStatus,
        request_status: RequestStatus,
    ) -> Result<UserId> {
        let request = self
            .requests
            .get(request_id)
            .await?
            .ok_or(GateError::RequestNotFound(request_id))?;

        self.users.update_status(request.user_id, user_status).await?;
        self.requests.update_status(request_id, request_status).await?;
        info!(
            request_id,
            user_id = request.user_id,
            status = %user_status,
            "Request resolved"
        );
        Ok(request.user_id)
    }

    /// Idempotent upsert to `Approved`, bypassing the request flow. Inserts
    /// with placeholder names when the user has never been seen.
    pub async fn add_user_directly(&self, user_id: UserId) -> Result<()> {
        if self.users.get(user_id).await?.is_some() {
            self.users.update_status(user_id, UserStatus::Approved).await?;
        } else {
            match self
                .users
                .insert(user_id, Some("Unknown"), Some("Unknown"), UserStatus::Approved)
                .await
            {
                Ok(()) => {}
                // Lost an insert race: the row exists now, force the status.
                Err(GateError::DuplicateKey) => {
                    self.users.update_status(user_id, UserStatus::Approved).await?;
                }
                Err(other) => return Err(other),
            }
        }
        info!(user_id, "User added directly");
        Ok(())
    }

    /// Delete a user. The admin row is never removable through this path.
    pub async fn remove_user(&self, user_id: UserId) -> Result<()> {
        let user = self
            .users
            .get(user_id)
            .await?
            .ok_or(GateError::UserNotFound(user_id))?;
        if user.status == UserStatus::Admin {
            return Err(GateError::CannotRemoveAdmin);
        }
        self.users.remove(user_id).await?;
        info!(user_id, "User removed");
        Ok(())
    }

    pub async fn is_authorized(&self, user_id: UserId) -> Result<bool> {
        Ok(self
            .users
            .get(user_id)
            .await?
            .is_some_and(|u| u.status.is_authorized()))
    }

    pub async fn is_admin(&self, user_id: UserId) -> Result<bool> {
        Ok(self
            .users
            .get(user_id)
            .await?
            .is_some_and(|u| u.status == UserStatus::Admin))
    }

    /// Startup self-healing: the configured operator always ends up with
    /// `Admin` status, whatever state the store was left in. An id of 0
    /// means "not configured" and is a no-op.
    pub async fn ensure_admin_exists(&self, admin_id: UserId) -> Result<()> {
        if admin_id == 0 {
            warn!("No admin id configured; admin commands will be unreachable");
            return Ok(());
        }
        match self.users.get(admin_id).await? {
            None => {
                match self
                    .users
                    .insert(admin_id, Some("Admin"), Some("Admin"), UserStatus::Admin)
                    .await
                {
                    Ok(()) | Err(GateError::DuplicateKey) => {}
                    Err(other) => return Err(other),
                }
                info!(admin_id, "Admin user created");
            }
            Some(user) if user.status != UserStatus::Admin => {
                self.users.update_status(admin_id, UserStatus::Admin).await?;
                info!(admin_id, "Admin status restored");
            }
            Some(_) => {}
        }
        Ok(())
    }

    /// All known users, newest first.
    pub async fn all_users(&self) -> Result<Vec<User>> {
        self.users.all().await
    }

    /// Users whose status is `Pending`, newest first.
    pub async fn pending_users(&self) -> Result<Vec<User>> {
        self.users.by_status(UserStatus::Pending).await
    }

    /// Open requests, newest first.
    pub async fn pending_requests(&self) -> Result<Vec<AccessRequest>> {
        self.requests.pending().await
    }

    /// Lookup from user id to their most recent pending request.
    ///
    /// A user is not supposed to have two simultaneously-pending requests,
    /// but nothing prevents it; the highest request id wins, which is also
    /// newest-by-insertion since rowids are monotonic.
    pub async fn pending_request_ids(&self) -> Result<HashMap<UserId, RequestId>> {
        let mut map = HashMap::new();
        for request in self.requests.pending().await? {
            map.entry(request.user_id)
                .and_modify(|id: &mut RequestId| *id = (*id).max(request.id))
                .or_insert(request.id);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn controller() -> AccessController {
        AccessController::new(&Database::in_memory().unwrap())
    }

    #[tokio::test]
    async fn request_then_approve_flow() {
        let ctl = controller().await;

        let request = ctl
            .request_access(500, Some("alice"), Some("Alice"), Some("please"))
            .await
            .unwrap();
        assert_eq!(request.user_id, 500);
        assert_eq!(request.status, RequestStatus::Pending);
        assert!(!ctl.is_authorized(500).await.unwrap());

        let user_id = ctl.approve_request(request.id).await.unwrap();
        assert_eq!(user_id, 500);
        assert!(ctl.is_authorized(500).await.unwrap());
        assert!(ctl.pending_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_request_before_admin_action_short_circuits() {
        let ctl = controller().await;
        ctl.request_access(500, Some("alice"), Some("Alice"), None)
            .await
            .unwrap();

        let err = ctl
            .request_access(500, Some("alice"), Some("Alice"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::RequestAlreadyPending));
        assert_eq!(ctl.pending_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn authorized_user_cannot_request_again() {
        let ctl = controller().await;
        ctl.add_user_directly(7).await.unwrap();

        let err = ctl.request_access(7, None, None, None).await.unwrap_err();
        assert!(matches!(err, GateError::AlreadyAuthorized));
    }

    #[tokio::test]
    async fn rejected_user_may_request_again() {
        let ctl = controller().await;
        let request = ctl.request_access(9, None, None, None).await.unwrap();
        ctl.reject_request(request.id).await.unwrap();
        assert!(!ctl.is_authorized(9).await.unwrap());

        // A fresh request goes in; history keeps both rows.
        let second = ctl.request_access(9, None, None, None).await.unwrap();
        assert!(second.id > request.id);
    }

    #[tokio::test]
    async fn approve_unknown_request_fails() {
        let ctl = controller().await;
        let err = ctl.approve_request(999).await.unwrap_err();
        assert!(matches!(err, GateError::RequestNotFound(999)));
    }

    #[tokio::test]
    async fn add_user_directly_is_idempotent_upsert() {
        let ctl = controller().await;
        ctl.add_user_directly(30).await.unwrap();
        ctl.add_user_directly(30).await.unwrap();
        assert!(ctl.is_authorized(30).await.unwrap());

        // Also forces a pending user straight to approved.
        ctl.request_access(31, None, None, None).await.unwrap();
        ctl.add_user_directly(31).await.unwrap();
        assert!(ctl.is_authorized(31).await.unwrap());
    }

    #[tokio::test]
    async fn admin_row_is_never_removable() {
        let ctl = controller().await;
        ctl.ensure_admin_exists(1000).await.unwrap();

        let err = ctl.remove_user(1000).await.unwrap_err();
        assert!(matches!(err, GateError::CannotRemoveAdmin));
        assert!(ctl.is_admin(1000).await.unwrap());
    }

    #[tokio::test]
    async fn remove_missing_user_fails() {
        let ctl = controller().await;
        let err = ctl.remove_user(404).await.unwrap_err();
        assert!(matches!(err, GateError::UserNotFound(404)));
    }

    #[tokio::test]
    async fn ensure_admin_exists_is_idempotent_and_self_healing() {
        let ctl = controller().await;

        ctl.ensure_admin_exists(1000).await.unwrap();
        ctl.ensure_admin_exists(1000).await.unwrap();
        assert!(ctl.is_admin(1000).await.unwrap());

        // Recovers from an out-of-band demotion.
        ctl.users.update_status(1000, UserStatus::Pending).await.unwrap();
        ctl.ensure_admin_exists(1000).await.unwrap();
        assert!(ctl.is_admin(1000).await.unwrap());

        // Unset admin id is a no-op.
        ctl.ensure_admin_exists(0).await.unwrap();
        assert!(ctl.all_users().await.unwrap().iter().all(|u| u.id != 0));
    }

    #[tokio::test]
    async fn authorization_matches_status_set() {
        let ctl = controller().await;
        ctl.ensure_admin_exists(1).await.unwrap();
        ctl.add_user_directly(2).await.unwrap();
        ctl.request_access(3, None, None, None).await.unwrap();
        let rejected = ctl.request_access(4, None, None, None).await.unwrap();
        ctl.reject_request(rejected.id).await.unwrap();

        for user in ctl.all_users().await.unwrap() {
            assert_eq!(
                ctl.is_authorized(user.id).await.unwrap(),
                matches!(user.status, UserStatus::Approved | UserStatus::Admin),
            );
        }
    }

    #[tokio::test]
    async fn ensure_known_registers_once_and_never_demotes() {
        let ctl = controller().await;
        ctl.ensure_known(60, Some("bob"), Some("Bob")).await.unwrap();
        assert!(!ctl.is_authorized(60).await.unwrap());

        ctl.add_user_directly(60).await.unwrap();
        // A later first-contact call must not reset the approved status.
        ctl.ensure_known(60, Some("bob"), Some("Bob")).await.unwrap();
        assert!(ctl.is_authorized(60).await.unwrap());
    }

    #[tokio::test]
    async fn pending_lookup_breaks_ties_by_highest_id() {
        let ctl = controller().await;
        // Two simultaneously-pending rows for the same user, forced through
        // the store directly since the controller prevents this itself.
        let first = ctl.requests.insert(50, None, None, None).await.unwrap();
        let second = ctl.requests.insert(50, None, None, None).await.unwrap();
        assert!(second > first);

        let map = ctl.pending_request_ids().await.unwrap();
        assert_eq!(map.get(&50), Some(&second));
    }
}
