use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;

use super::audit_service::{AuditEntry, AuditWriter};
use crate::database::models::Announcement;
use crate::error::ApiError;
use crate::types::Principal;
use crate::validation::FieldErrors;

const AUDIENCES: &[&str] = &["public", "admins"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAnnouncement {
    pub title: Option<String>,
    pub body: Option<String>,
    pub audience: Option<String>,
    #[serde(default)]
    pub is_published: bool,
}

pub struct AnnouncementService {
    pool: PgPool,
}

impl AnnouncementService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, actor: &Principal, input: NewAnnouncement) -> Result<Announcement, ApiError> {
        let mut errors = FieldErrors::new();
        let title = errors.required("title", input.title.as_deref(), 200);
        let body = errors.required("body", input.body.as_deref(), 10_000);
        let audience = input.audience.unwrap_or_else(|| "public".to_string());
        errors.one_of("audience", &audience, AUDIENCES);
        errors.into_result()?;

        let mut tx = self.pool.begin().await?;

        let announcement = sqlx::query_as::<_, Announcement>(
            "INSERT INTO announcements (title, body, audience, is_published, published_at, created_by)
             VALUES ($1, $2, $3, $4, CASE WHEN $4 THEN now() END, $5)
             RETURNING id, title, body, audience, is_published, published_at, created_by, created_at, updated_at",
        )
        .bind(&title)
        .bind(&body)
        .bind(&audience)
        .bind(input.is_published)
        .bind(actor.id)
        .fetch_one(&mut *tx)
        .await?;

        let entry = AuditEntry::new(
            Some(actor.id),
            "announcement.created",
            format!("Announcement \"{}\" created", announcement.title),
        )
        .entity("announcement", announcement.id)
        .metadata(json!({ "audience": announcement.audience, "isPublished": announcement.is_published }))
        .notify_as("New announcement", announcement.title.clone());
        AuditWriter::record(&mut tx, &entry).await?;

        tx.commit().await?;
        Ok(announcement)
    }

    /// Soft delete; the row disappears from every list but stays in storage
    pub async fn delete(&self, actor: &Principal, id: i64) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await?;

        let title: String = sqlx::query_scalar(
            "UPDATE announcements SET deleted_at = now(), updated_at = now()
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING title",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::not_found("Announcement not found"))?;

        let entry = AuditEntry::new(
            Some(actor.id),
            "announcement.deleted",
            format!("Announcement \"{}\" deleted", title),
        )
        .entity("announcement", id);
        AuditWriter::record(&mut tx, &entry).await?;

        tx.commit().await?;
        Ok(())
    }
}
