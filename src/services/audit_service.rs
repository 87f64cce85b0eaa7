use serde::Serialize;
use serde_json::Value;
use sqlx::{Postgres, Transaction};

use crate::database::DatabaseError;
use crate::types::Role;

/// One administrative action to be written to the audit trail
#[derive(Debug, Clone)]
pub struct AuditEntry {
    /// `None` for actions from unauthenticated public intake
    pub actor_id: Option<i64>,
    pub action: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub message: String,
    pub metadata: Option<Value>,
    pub title: Option<String>,
    pub body: Option<String>,
}

impl AuditEntry {
    pub fn new(actor_id: Option<i64>, action: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            actor_id,
            action: action.into(),
            entity_type: None,
            entity_id: None,
            message: message.into(),
            metadata: None,
            title: None,
            body: None,
        }
    }

    pub fn entity(mut self, entity_type: impl Into<String>, entity_id: i64) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id);
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Override the notification title/body (default: action/message)
    pub fn notify_as(mut self, title: impl Into<String>, body: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self.body = Some(body.into());
        self
    }

    fn notification_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.action)
    }

    fn notification_body(&self) -> &str {
        self.body.as_deref().unwrap_or(&self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReceipt {
    pub audit_id: i64,
    pub notified: u64,
}

/// Writes audit records and their admin notifications.
///
/// Every function takes the caller's open transaction; nothing here commits
/// or rolls back, and every storage error is returned as is so the caller's
/// `?` drops (and thereby rolls back) the whole transaction.
pub struct AuditWriter;

impl AuditWriter {
    pub async fn record(
        tx: &mut Transaction<'_, Postgres>,
        entry: &AuditEntry,
    ) -> Result<AuditReceipt, DatabaseError> {
        let audit_id = Self::insert_audit(tx, entry).await?;

        let recipients = Self::admin_ids(tx).await?;
        if recipients.is_empty() {
            tracing::debug!("Audit {} ({}) has no admins to notify", audit_id, entry.action);
            return Ok(AuditReceipt { audit_id, notified: 0 });
        }

        let notified = Self::fan_out(
            tx,
            audit_id,
            &recipients,
            entry.notification_title(),
            entry.notification_body(),
        )
        .await?;

        tracing::debug!(
            "Audit {} ({}) notified {} admins",
            audit_id,
            entry.action,
            notified
        );
        Ok(AuditReceipt { audit_id, notified })
    }

    pub async fn insert_audit(
        tx: &mut Transaction<'_, Postgres>,
        entry: &AuditEntry,
    ) -> Result<i64, DatabaseError> {
        let audit_id: i64 = sqlx::query_scalar(
            "INSERT INTO audit_logs (actor_id, action, entity_type, entity_id, message, metadata)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id",
        )
        .bind(entry.actor_id)
        .bind(&entry.action)
        .bind(entry.entity_type.as_deref())
        .bind(entry.entity_id)
        .bind(&entry.message)
        .bind(entry.metadata.as_ref())
        .fetch_one(&mut **tx)
        .await?;

        Ok(audit_id)
    }

    /// Every live administrator, as of this transaction's snapshot
    pub async fn admin_ids(tx: &mut Transaction<'_, Postgres>) -> Result<Vec<i64>, DatabaseError> {
        let roles: Vec<String> = Role::ADMIN_VALUES.iter().map(|r| r.to_string()).collect();
        let ids = sqlx::query_scalar(
            "SELECT id FROM users
             WHERE role = ANY($1) AND deleted_at IS NULL
             ORDER BY id",
        )
        .bind(roles)
        .fetch_all(&mut **tx)
        .await?;

        Ok(ids)
    }

    /// One multi-row insert of a notification per recipient, all pointing at `audit_id`
    pub async fn fan_out(
        tx: &mut Transaction<'_, Postgres>,
        audit_id: i64,
        recipients: &[i64],
        title: &str,
        body: &str,
    ) -> Result<u64, DatabaseError> {
        let result = sqlx::query(
            "INSERT INTO notifications (recipient_id, audit_log_id, title, body)
             SELECT recipient, $2, $3, $4 FROM unnest($1::bigint[]) AS recipient",
        )
        .bind(recipients)
        .bind(audit_id)
        .bind(title)
        .bind(body)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected())
    }
}
