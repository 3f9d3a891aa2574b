use serde::Serialize;

use placement_core::types::Notification;
use placement_core::Actor;

use super::{PlacementService, WorkflowError};

/// Notifications as they were before the listing marked them read.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationFeed {
    pub unread: i64,
    pub notifications: Vec<Notification>,
}

impl PlacementService {
    /// Lists the caller's notifications newest first, then marks them all read.
    pub async fn notifications(&self, actor: Actor) -> Result<NotificationFeed, WorkflowError> {
        let repo = self.database.notifications();
        let account_id = actor.account_id();
        let notifications = repo.list_for_account(account_id).await?;
        let unread = notifications.iter().filter(|n| !n.read).count() as i64;
        if unread > 0 {
            repo.mark_all_read(account_id).await?;
        }
        Ok(NotificationFeed {
            unread,
            notifications,
        })
    }

    pub async fn mark_notification_read(
        &self,
        actor: Actor,
        notification_id: i64,
    ) -> Result<Notification, WorkflowError> {
        self.database
            .notifications()
            .mark_read(actor.account_id(), notification_id)
            .await?
            .ok_or(WorkflowError::NotFound("notification"))
    }
}
