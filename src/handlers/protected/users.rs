use axum::extract::{rejection::JsonRejection, Path, State};
use axum::{Extension, Json};

use crate::app::AppState;
use crate::database::models::User;
use crate::handlers::{json_body, path_id};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{StatusChange, UserService};
use crate::types::Principal;

/// PATCH /api/admin/users/:id/status - activate or deactivate an account
pub async fn set_status(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    body: Result<Json<StatusChange>, JsonRejection>,
) -> ApiResult<User> {
    let user_id = path_id(&id)?;
    let change = json_body(body)?;

    let user = UserService::new(state.pool.clone())
        .set_status(&principal, user_id, change)
        .await?;

    let message = if user.is_active { "User activated" } else { "User deactivated" };
    Ok(ApiResponse::success(user).with_message(message))
}
