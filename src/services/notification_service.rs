use serde_json::{json, Value};
use sqlx::PgPool;

use crate::database::models::Notification;
use crate::database::{query_builder, DatabaseError, Resource};
use crate::error::ApiError;
use crate::filter::{ListFilter, ListPage, ListQuery};

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    /// Absent, or owned by another administrator
    #[error("Notification not found")]
    NotFound,
    #[error("Notification is already read")]
    AlreadyRead,
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for NotificationError {
    fn from(err: sqlx::Error) -> Self {
        NotificationError::Database(err.into())
    }
}

impl From<NotificationError> for ApiError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::NotFound => ApiError::not_found("Notification not found"),
            NotificationError::AlreadyRead => {
                ApiError::conflict("ALREADY_READ", "Notification is already read")
            }
            NotificationError::Database(e) => e.into(),
        }
    }
}

/// Per-recipient notification inbox. Every query is pinned to `recipient_id`.
pub struct NotificationService {
    pool: PgPool,
}

impl NotificationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, recipient_id: i64, query: ListQuery) -> Result<ListPage<Value>, DatabaseError> {
        let filter = ListFilter::new(Resource::Notifications, query).restrict("recipient_id", json!(recipient_id));
        query_builder::fetch_page(&self.pool, &filter).await
    }

    pub async fn unread_count(&self, recipient_id: i64) -> Result<i64, DatabaseError> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND is_read = FALSE",
        )
        .bind(recipient_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// `unread -> read`. The conditional update is the transition; the
    /// follow-up read only decides which error to report when it did not apply.
    pub async fn mark_read(&self, recipient_id: i64, id: i64) -> Result<Notification, NotificationError> {
        let updated = sqlx::query_as::<_, Notification>(
            "UPDATE notifications
             SET is_read = TRUE, read_at = now(), updated_at = now()
             WHERE id = $1 AND recipient_id = $2 AND is_read = FALSE
             RETURNING id, recipient_id, audit_log_id, title, body, is_read, read_at, created_at, updated_at",
        )
        .bind(id)
        .bind(recipient_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(notification) = updated {
            return Ok(notification);
        }

        let is_read: Option<bool> = sqlx::query_scalar(
            "SELECT is_read FROM notifications WHERE id = $1 AND recipient_id = $2",
        )
        .bind(id)
        .bind(recipient_id)
        .fetch_optional(&self.pool)
        .await?;

        match is_read {
            Some(true) => Err(NotificationError::AlreadyRead),
            _ => Err(NotificationError::NotFound),
        }
    }

    /// Idempotent; returns how many rows flipped (zero is fine)
    pub async fn mark_all_read(&self, recipient_id: i64) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            "UPDATE notifications
             SET is_read = TRUE, read_at = now(), updated_at = now()
             WHERE recipient_id = $1 AND is_read = FALSE",
        )
        .bind(recipient_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Clear the recipient's read notifications. Audit records are untouched.
    pub async fn delete_read(&self, recipient_id: i64) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM notifications WHERE recipient_id = $1 AND is_read = TRUE")
            .bind(recipient_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Retention sweep across all recipients
    pub async fn purge_read(&self, older_than_days: u32) -> Result<u64, DatabaseError> {
        let days = retention_days(older_than_days)?;
        let result = sqlx::query(
            "DELETE FROM notifications
             WHERE is_read = TRUE AND read_at < now() - make_interval(days => $1)",
        )
        .bind(days)
        .execute(&self.pool)
        .await?;

        tracing::info!(
            "Purged {} read notifications older than {} days",
            result.rows_affected(),
            older_than_days
        );
        Ok(result.rows_affected())
    }
}

/// Postgres `make_interval` takes the day count as a 32-bit integer
fn retention_days(older_than_days: u32) -> Result<i32, DatabaseError> {
    i32::try_from(older_than_days).map_err(|_| {
        DatabaseError::InvalidInput(format!("retention of {} days is out of range", older_than_days))
    })
}
