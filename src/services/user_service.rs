use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;

use super::audit_service::{AuditEntry, AuditWriter};
use crate::database::models::User;
use crate::error::ApiError;
use crate::types::Principal;
use crate::validation::FieldErrors;

const USER_COLUMNS: &str =
    "id, email, full_name, role, is_active, last_login_at, created_at, updated_at, deleted_at";

pub const USER_ROLES: &[&str] = &["user", "admin", "super_admin"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct RoleChange {
    pub role: Option<String>,
}

/// Account administration. Each change commits together with its audit trail.
pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn set_status(&self, actor: &Principal, user_id: i64, change: StatusChange) -> Result<User, ApiError> {
        let Some(is_active) = change.is_active else {
            return Err(ApiError::invalid_field("isActive", "isActive must be a boolean"));
        };
        if actor.id == user_id && !is_active {
            return Err(ApiError::invalid_field("isActive", "You cannot deactivate your own account"));
        }

        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET is_active = $2, updated_at = now()
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(is_active)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

        let (action, verb) = if is_active {
            ("user.activated", "activated")
        } else {
            ("user.deactivated", "deactivated")
        };
        let entry = AuditEntry::new(
            Some(actor.id),
            action,
            format!("{} was {} by admin #{}", user.email, verb, actor.id),
        )
        .entity("user", user.id)
        .metadata(json!({ "isActive": is_active }));
        AuditWriter::record(&mut tx, &entry).await?;

        tx.commit().await?;
        tracing::info!("User {} {} by {}", user.id, verb, actor.id);
        Ok(user)
    }

    pub async fn set_role(&self, actor: &Principal, user_id: i64, change: RoleChange) -> Result<User, ApiError> {
        let mut errors = FieldErrors::new();
        let role = errors.required("role", change.role.as_deref(), 32);
        if !role.is_empty() {
            errors.one_of("role", &role, USER_ROLES);
        }
        if actor.id == user_id {
            errors.add("role", "You cannot change your own role");
        }
        errors.into_result()?;

        let mut tx = self.pool.begin().await?;

        let previous: String = sqlx::query_scalar(
            "SELECT role FROM users WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET role = $2, updated_at = now()
             WHERE id = $1
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(&role)
        .fetch_one(&mut *tx)
        .await?;

        let entry = AuditEntry::new(
            Some(actor.id),
            "user.role_changed",
            format!("{} changed from {} to {}", user.email, previous, role),
        )
        .entity("user", user.id)
        .metadata(json!({ "from": previous, "to": role }))
        .notify_as("Role changed", format!("{} is now {}", user.email, role));
        AuditWriter::record(&mut tx, &entry).await?;

        tx.commit().await?;
        tracing::info!("User {} role {} -> {} by {}", user.id, previous, role, actor.id);
        Ok(user)
    }
}
