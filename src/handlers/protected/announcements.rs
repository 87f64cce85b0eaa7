use axum::extract::{rejection::JsonRejection, Path, State};
use axum::{Extension, Json};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::models::Announcement;
use crate::handlers::{json_body, path_id};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{AnnouncementService, NewAnnouncement};
use crate::types::Principal;

/// POST /api/admin/announcements
pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    body: Result<Json<NewAnnouncement>, JsonRejection>,
) -> ApiResult<Announcement> {
    let input = json_body(body)?;
    let announcement = AnnouncementService::new(state.pool.clone())
        .create(&principal, input)
        .await?;

    Ok(ApiResponse::created(announcement).with_message("Announcement created"))
}

/// DELETE /api/admin/announcements/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let id = path_id(&id)?;
    AnnouncementService::new(state.pool.clone())
        .delete(&principal, id)
        .await?;

    Ok(ApiResponse::success(json!({ "id": id })).with_message("Announcement deleted"))
}
