use axum::extract::{rejection::JsonRejection, Path, State};
use axum::{Extension, Json};

use crate::app::AppState;
use crate::database::models::User;
use crate::handlers::{json_body, path_id};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{RoleChange, UserService};
use crate::types::Principal;

/// PATCH /api/admin/users/:id/role - privilege changes are super-admin only
pub async fn set_role(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    body: Result<Json<RoleChange>, JsonRejection>,
) -> ApiResult<User> {
    let user_id = path_id(&id)?;
    let change = json_body(body)?;

    let user = UserService::new(state.pool.clone())
        .set_role(&principal, user_id, change)
        .await?;

    Ok(ApiResponse::success(user).with_message("Role updated"))
}
