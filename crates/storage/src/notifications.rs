use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};

use placement_core::types::{Notification, NotificationDraft};

use crate::{map_write_error, to_rfc3339, StorageError};

/// Repository for per-account notifications.
#[derive(Clone)]
pub struct NotificationRepository {
    pub(crate) pool: SqlitePool,
}

impl NotificationRepository {
    /// Appends an unread notification for `account_id`.
    pub async fn append(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        account_id: i64,
        draft: &NotificationDraft,
        created_at: DateTime<Utc>,
    ) -> Result<Notification, StorageError> {
        let row = sqlx::query_as::<_, NotificationRow>(
            "INSERT INTO notifications (account_id, title, message, is_read, created_at) \
             VALUES (?, ?, ?, 0, ?) \
             RETURNING id, account_id, title, message, is_read, created_at",
        )
        .bind(account_id)
        .bind(&draft.title)
        .bind(&draft.message)
        .bind(to_rfc3339(created_at))
        .fetch_one(&mut **tx)
        .await
        .map_err(map_write_error)?;

        Ok(row.into_domain())
    }

    /// Newest first; ties on the timestamp fall back to insertion order.
    pub async fn list_for_account(&self, account_id: i64) -> Result<Vec<Notification>, StorageError> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            "SELECT id, account_id, title, message, is_read, created_at \
             FROM notifications \
             WHERE account_id = ? \
             ORDER BY created_at DESC, id DESC",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(NotificationRow::into_domain).collect())
    }

    /// Marks every notification of the account as read, returning how many changed.
    pub async fn mark_all_read(&self, account_id: i64) -> Result<u64, StorageError> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = 1 WHERE account_id = ? AND is_read = 0")
                .bind(account_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    /// Marks one notification as read. Returns `None` when it does not belong to the account.
    pub async fn mark_read(
        &self,
        account_id: i64,
        notification_id: i64,
    ) -> Result<Option<Notification>, StorageError> {
        let row = sqlx::query_as::<_, NotificationRow>(
            "UPDATE notifications SET is_read = 1 \
             WHERE id = ? AND account_id = ? \
             RETURNING id, account_id, title, message, is_read, created_at",
        )
        .bind(notification_id)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(NotificationRow::into_domain))
    }

    pub async fn count_unread(&self, account_id: i64) -> Result<i64, StorageError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE account_id = ? AND is_read = 0",
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: i64,
    account_id: i64,
    title: String,
    message: String,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl NotificationRow {
    fn into_domain(self) -> Notification {
        Notification {
            id: self.id,
            account_id: self.account_id,
            title: self.title,
            message: self.message,
            read: self.is_read,
            created_at: self.created_at,
        }
    }
}
