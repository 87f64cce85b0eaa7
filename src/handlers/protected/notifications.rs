use axum::extract::{Path, Query, State};
use axum::Extension;
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::app::AppState;
use crate::database::models::Notification;
use crate::database::Resource;
use crate::error::ApiError;
use crate::filter::params::parse_list_query;
use crate::handlers::path_id;
use crate::middleware::{ApiResponse, ApiResult, ListResponse};
use crate::services::NotificationService;
use crate::types::Principal;

/// GET /api/admin/notifications - the caller's own notifications
pub async fn list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<ListResponse<Value>, ApiError> {
    let query = parse_list_query(&raw, Resource::Notifications.spec(), &state.config.list)?;
    let page = NotificationService::new(state.pool.clone())
        .list(principal.id, query)
        .await?;

    Ok(ListResponse::from(page))
}

/// GET /api/admin/notifications/unread-count
pub async fn unread_count(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Value> {
    let count = NotificationService::new(state.pool.clone())
        .unread_count(principal.id)
        .await?;

    Ok(ApiResponse::success(json!({ "count": count })))
}

/// PATCH /api/admin/notifications/:id/read
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Notification> {
    let id = path_id(&id)?;
    let notification = NotificationService::new(state.pool.clone())
        .mark_read(principal.id, id)
        .await?;

    Ok(ApiResponse::success(notification).with_message("Notification marked as read"))
}

/// PATCH /api/admin/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Value> {
    let updated = NotificationService::new(state.pool.clone())
        .mark_all_read(principal.id)
        .await?;

    Ok(ApiResponse::success(json!({ "updated": updated })))
}

/// DELETE /api/admin/notifications/read
pub async fn delete_read(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Value> {
    let deleted = NotificationService::new(state.pool.clone())
        .delete_read(principal.id)
        .await?;

    Ok(ApiResponse::success(json!({ "deleted": deleted })))
}
